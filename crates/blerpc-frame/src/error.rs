/// Errors that can occur while sending or receiving framed messages.
///
/// Reassembly anomalies (malformed start, sequence gaps, length mismatch)
/// are not errors: the reassembler drops the in-flight message and reports
/// the reason through tracing and its observer instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload size leaves no room for a start packet's header, length
    /// prefix and at least one data byte.
    #[error("MTU too small (max payload {max_payload} bytes cannot carry a {message_len}-byte message)")]
    MtuTooSmall {
        max_payload: usize,
        message_len: usize,
    },

    /// The message length does not fit the 32-bit length field.
    #[error("message too large ({size} bytes does not fit the 32-bit length field)")]
    MessageTooLarge { size: usize },

    /// The underlying link failed.
    #[error("link error: {0}")]
    Link(#[from] blerpc_link::LinkError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
