use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur on a packet link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The peer end of the link is gone.
    #[error("link closed")]
    Closed,

    /// A packet exceeds the largest value the link can carry in one write.
    #[error("packet too large for link ({len} bytes, max {max})")]
    PacketTooLarge { len: usize, max: usize },

    /// No packet arrived before the read timeout elapsed.
    #[error("link read timed out after {0:?}")]
    Timeout(Duration),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// An I/O error occurred on the underlying socket.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
