use bytes::BytesMut;
use tracing::{debug, trace};

use crate::config::{FrameConfig, SinglePolicy};
use crate::header::{next_sequence, PacketHeader, PacketType, LENGTH_PREFIX_LEN};

/// Why an in-flight message was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A start packet too short to hold the length prefix.
    MalformedStart { payload_len: usize },
    /// A packet arrived with the wrong sequence number (gap, duplicate or
    /// reorder).
    SequenceMismatch { expected: u8, found: u8 },
    /// The end packet completed a message of the wrong length.
    LengthMismatch { declared: usize, received: usize },
    /// A new start packet replaced an unfinished message.
    Superseded { buffered: usize },
    /// A single packet arrived mid-message under [`SinglePolicy::ResetInFlight`].
    SingleInterrupted { buffered: usize },
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedStart { payload_len } => {
                write!(f, "start packet payload too short ({payload_len} bytes)")
            }
            Self::SequenceMismatch { expected, found } => {
                write!(f, "sequence mismatch (expected {expected}, found {found})")
            }
            Self::LengthMismatch { declared, received } => {
                write!(f, "length mismatch (declared {declared}, received {received})")
            }
            Self::Superseded { buffered } => {
                write!(f, "superseded by new start ({buffered} bytes dropped)")
            }
            Self::SingleInterrupted { buffered } => {
                write!(f, "interrupted by single packet ({buffered} bytes dropped)")
            }
        }
    }
}

type Observer = Box<dyn FnMut(&DiscardReason) + Send>;

enum State {
    Idle,
    Accumulating {
        buffer: BytesMut,
        declared_len: usize,
        expected_sequence: u8,
    },
}

/// Rebuilds messages from packets fed one at a time, in arrival order.
///
/// Malformed or out-of-order input never produces an error: the in-flight
/// message is dropped and the reassembler waits for the next start packet.
/// Attach an observer with [`Reassembler::with_observer`] to see why.
///
/// Not reentrant. One instance per receive direction.
pub struct Reassembler {
    state: State,
    single_policy: SinglePolicy,
    observer: Option<Observer>,
}

impl Reassembler {
    /// Create an idle reassembler with default settings.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create an idle reassembler using the policies in `config`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            state: State::Idle,
            single_policy: config.single_policy,
            observer: None,
        }
    }

    /// Call `observer` every time an in-flight message is dropped.
    pub fn with_observer(mut self, observer: impl FnMut(&DiscardReason) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Consume one packet. Returns the message this packet completes, if any.
    pub fn feed(&mut self, packet: &[u8]) -> Option<String> {
        let (header, payload) = PacketHeader::split(packet)?;
        let PacketHeader {
            packet_type,
            sequence,
        } = header;
        trace!(%packet_type, sequence, len = payload.len(), "feed");

        match packet_type {
            PacketType::Single => {
                if self.single_policy == SinglePolicy::ResetInFlight {
                    if let Some(buffered) = self.buffered_len() {
                        self.discard(DiscardReason::SingleInterrupted { buffered });
                    }
                }
                return Some(decode_utf8(payload.to_vec()));
            }
            PacketType::Start => {
                if let Some(buffered) = self.buffered_len() {
                    self.discard(DiscardReason::Superseded { buffered });
                }
                if payload.len() < LENGTH_PREFIX_LEN {
                    self.discard(DiscardReason::MalformedStart {
                        payload_len: payload.len(),
                    });
                    return None;
                }
                let (prefix, data) = payload.split_at(LENGTH_PREFIX_LEN);
                let declared_len =
                    u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
                self.state = State::Accumulating {
                    buffer: BytesMut::from(data),
                    declared_len,
                    expected_sequence: next_sequence(sequence),
                };
                return None;
            }
            PacketType::Continuation | PacketType::End => {}
        }

        let State::Accumulating {
            buffer,
            declared_len,
            expected_sequence,
        } = &mut self.state
        else {
            trace!(%packet_type, sequence, "orphan packet ignored");
            return None;
        };

        if sequence != *expected_sequence {
            let reason = DiscardReason::SequenceMismatch {
                expected: *expected_sequence,
                found: sequence,
            };
            self.discard(reason);
            return None;
        }
        *expected_sequence = next_sequence(*expected_sequence);
        buffer.extend_from_slice(payload);

        if packet_type == PacketType::Continuation {
            return None;
        }

        let (received, declared) = (buffer.len(), *declared_len);
        if received != declared {
            self.discard(DiscardReason::LengthMismatch { declared, received });
            return None;
        }

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Accumulating { buffer, .. } => {
                debug!(len = buffer.len(), "message reassembled");
                Some(decode_utf8(buffer.to_vec()))
            }
            State::Idle => None,
        }
    }

    /// True when no message is in flight.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Bytes accumulated for the in-flight message, if any.
    pub fn buffered_len(&self) -> Option<usize> {
        match &self.state {
            State::Idle => None,
            State::Accumulating { buffer, .. } => Some(buffer.len()),
        }
    }

    /// Length declared by the in-flight message's start packet.
    pub fn declared_len(&self) -> Option<usize> {
        match &self.state {
            State::Idle => None,
            State::Accumulating { declared_len, .. } => Some(*declared_len),
        }
    }

    /// Sequence number the next packet must carry.
    pub fn expected_sequence(&self) -> Option<u8> {
        match &self.state {
            State::Idle => None,
            State::Accumulating {
                expected_sequence, ..
            } => Some(*expected_sequence),
        }
    }

    /// Drop the in-flight message and return to idle.
    pub(crate) fn discard(&mut self, reason: DiscardReason) {
        debug!(%reason, "discarding in-flight message");
        self.state = State::Idle;
        if let Some(observer) = self.observer.as_mut() {
            observer(&reason);
        }
    }

    /// Return to idle without reporting a reason.
    pub(crate) fn clear(&mut self) {
        self.state = State::Idle;
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("idle", &self.is_idle())
            .field("buffered_len", &self.buffered_len())
            .field("declared_len", &self.declared_len())
            .field("expected_sequence", &self.expected_sequence())
            .field("single_policy", &self.single_policy)
            .finish()
    }
}

// Invalid sequences become U+FFFD rather than dropping the message.
fn decode_utf8(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}
