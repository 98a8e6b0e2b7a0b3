use blerpc_link::{ATT_OVERHEAD, MAX_GATT_VALUE_LEN, MIN_PAYLOAD};

/// What the reassembler does with a `Single` packet that arrives while a
/// multi-packet message is still being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinglePolicy {
    /// Emit the single message and leave the in-flight message untouched.
    /// Wire-compatible with existing peers.
    #[default]
    Passthrough,
    /// Drop the in-flight message before emitting the single message.
    ResetInFlight,
}

/// Size limits and policies for one end of a framed link.
///
/// Both ends of a connection must agree on the header layout; these values
/// only need to describe the local side's limits correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Bytes the link protocol consumes from every write.
    pub att_overhead: usize,
    /// Hard ceiling on a single write.
    pub max_gatt_value_len: usize,
    /// Floor below which the payload size is never shrunk.
    pub min_payload: usize,
    /// Handling of `Single` packets during accumulation.
    pub single_policy: SinglePolicy,
}

impl FrameConfig {
    /// Payload size for one packet at the given negotiated MTU.
    ///
    /// `mtu - att_overhead`, raised to `min_payload`, then capped at
    /// `max_gatt_value_len`.
    pub fn max_payload(&self, mtu: usize) -> usize {
        clamp_payload(
            mtu.saturating_sub(self.att_overhead),
            self.max_gatt_value_len,
            self.min_payload,
        )
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            att_overhead: ATT_OVERHEAD,
            max_gatt_value_len: MAX_GATT_VALUE_LEN,
            min_payload: MIN_PAYLOAD,
            single_policy: SinglePolicy::Passthrough,
        }
    }
}

pub(crate) fn clamp_payload(raw: usize, max_gatt_value_len: usize, min_payload: usize) -> usize {
    let mut max_payload = raw;
    if max_payload < min_payload {
        max_payload = min_payload;
    }
    if max_payload > max_gatt_value_len {
        max_payload = max_gatt_value_len;
    }
    max_payload
}
