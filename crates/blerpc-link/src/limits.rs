//! ATT-level size limits shared by every link.

/// Bytes the ATT protocol consumes from each write before user payload
/// (1-byte opcode + 2-byte attribute handle).
pub const ATT_OVERHEAD: usize = 3;

/// MTU every link starts with before an exchange negotiates a larger one.
pub const DEFAULT_MTU: usize = 23;

/// Hard ceiling on a single attribute value.
pub const MAX_GATT_VALUE_LEN: usize = 512;

/// Floor below which the framing layer will not shrink its payload size.
pub const MIN_PAYLOAD: usize = DEFAULT_MTU - ATT_OVERHEAD;

/// Largest packet a link with the given MTU can carry in one write.
pub fn max_value_len(mtu: usize) -> usize {
    mtu.saturating_sub(ATT_OVERHEAD).min(MAX_GATT_VALUE_LEN)
}
