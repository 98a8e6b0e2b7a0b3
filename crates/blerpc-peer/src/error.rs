use blerpc_frame::FrameError;
use blerpc_link::LinkError;

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Framing error (the message cannot be sent at the current MTU).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A well-formed JSON document that is not a valid JSON-RPC message.
    #[error("invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    /// No message arrived in time.
    #[error("receive timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The session was closed locally or the link went away.
    #[error("peer closed")]
    Closed,
}

impl PeerError {
    /// Lift link closure and timeouts out of the frame layer so callers can
    /// match on them directly.
    pub(crate) fn from_frame(err: FrameError) -> Self {
        match err {
            FrameError::Link(LinkError::Closed) => PeerError::Closed,
            FrameError::Link(LinkError::Timeout(after)) => PeerError::Timeout(after),
            FrameError::Link(other) => PeerError::Link(other),
            other => PeerError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
