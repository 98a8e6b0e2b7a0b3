//! One-byte packet header: packet type in the high bits, sequence number in
//! the low bits.
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────┬───────────────────────┐
//! │ type  │       sequence        │
//! └───────┴───────────────────────┘
//! ```

/// Bits of the header holding the packet type.
pub const HEADER_TYPE_MASK: u8 = 0xC0;

/// Bits of the header holding the sequence number.
pub const HEADER_SEQ_MASK: u8 = 0x3F;

/// The whole message is in this packet.
pub const TYPE_SINGLE: u8 = 0x00;
/// First packet of a multi-packet message (carries the length prefix).
pub const TYPE_START: u8 = 0x40;
/// Middle packet of a multi-packet message.
pub const TYPE_CONT: u8 = 0x80;
/// Last packet of a multi-packet message.
pub const TYPE_END: u8 = 0xC0;

/// Size of the header byte.
pub const HEADER_LEN: usize = 1;

/// Size of the big-endian total length carried by a start packet.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Header plus length prefix: the fixed cost of a start packet.
pub const START_OVERHEAD: usize = HEADER_LEN + LENGTH_PREFIX_LEN;

/// Position of a packet within its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Single,
    Start,
    Continuation,
    End,
}

impl PacketType {
    /// Type bits for this variant.
    pub const fn bits(self) -> u8 {
        match self {
            PacketType::Single => TYPE_SINGLE,
            PacketType::Start => TYPE_START,
            PacketType::Continuation => TYPE_CONT,
            PacketType::End => TYPE_END,
        }
    }

    /// Decode the type bits of a header byte. Every byte maps to a variant.
    pub const fn from_header(header: u8) -> Self {
        match header & HEADER_TYPE_MASK {
            TYPE_SINGLE => PacketType::Single,
            TYPE_START => PacketType::Start,
            TYPE_CONT => PacketType::Continuation,
            _ => PacketType::End,
        }
    }

    /// Short label used in logs and CLI output.
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Single => "SINGLE",
            PacketType::Start => "START",
            PacketType::Continuation => "CONT",
            PacketType::End => "END",
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    pub packet_type: PacketType,
    /// Sequence number, already reduced modulo `HEADER_SEQ_MASK + 1`.
    pub sequence: u8,
}

impl PacketHeader {
    /// Create a header, masking `sequence` to the header's width.
    pub const fn new(packet_type: PacketType, sequence: u8) -> Self {
        Self {
            packet_type,
            sequence: sequence & HEADER_SEQ_MASK,
        }
    }

    /// Pack into the wire byte.
    pub const fn encode(self) -> u8 {
        encode_header(self.packet_type, self.sequence)
    }

    /// Unpack a wire byte.
    pub const fn decode(byte: u8) -> Self {
        let (packet_type, sequence) = decode_header(byte);
        Self {
            packet_type,
            sequence,
        }
    }

    /// Split a packet into its header and payload.
    ///
    /// Returns `None` for an empty packet.
    pub fn split(packet: &[u8]) -> Option<(Self, &[u8])> {
        let (&first, payload) = packet.split_first()?;
        Some((Self::decode(first), payload))
    }
}

/// Pack a packet type and sequence number into a header byte.
///
/// The sequence is reduced modulo `HEADER_SEQ_MASK + 1`.
pub const fn encode_header(packet_type: PacketType, sequence: u8) -> u8 {
    packet_type.bits() | (sequence & HEADER_SEQ_MASK)
}

/// Unpack a header byte. Never fails.
pub const fn decode_header(byte: u8) -> (PacketType, u8) {
    (PacketType::from_header(byte), byte & HEADER_SEQ_MASK)
}

/// The sequence number that follows `sequence` on the wire.
pub const fn next_sequence(sequence: u8) -> u8 {
    sequence.wrapping_add(1) & HEADER_SEQ_MASK
}
