use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::config::clamp_payload;
use crate::error::{FrameError, Result};
use crate::header::{encode_header, PacketType, HEADER_LEN, START_OVERHEAD};

/// A message split into wire packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packetized {
    /// Packets in transmission order.
    pub packets: Vec<Bytes>,
    /// Payload size the packets were cut to.
    pub max_payload: usize,
}

impl Packetized {
    /// Number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True when there are no packets (never the case for `packetize` output).
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Total bytes that will go over the link.
    pub fn wire_size(&self) -> usize {
        self.packets.iter().map(Bytes::len).sum()
    }
}

/// Payload size for one packet at the given negotiated MTU, using the
/// standard ATT overhead.
///
/// `mtu - ATT_OVERHEAD`, raised to `min_payload` if below it, then capped
/// at `max_gatt_value_len`. The floor can exceed what a pathologically
/// small link carries; pick the constants accordingly.
pub fn compute_max_payload(mtu: usize, max_gatt_value_len: usize, min_payload: usize) -> usize {
    clamp_payload(
        mtu.saturating_sub(blerpc_link::ATT_OVERHEAD),
        max_gatt_value_len,
        min_payload,
    )
}

/// Split a message into packets of at most `max_payload` bytes.
///
/// Wire format:
/// ```text
/// SINGLE: [hdr][message bytes]
/// START:  [hdr][total len: u32 BE][first max_payload - 5 bytes]
/// CONT:   [hdr][next max_payload - 1 bytes]
/// END:    [hdr][remaining bytes, at least one]
/// ```
///
/// A message that fits next to one header byte goes out as a single packet
/// with sequence 0. Otherwise a start packet (sequence 0) is followed by
/// continuation packets and exactly one end packet, the sequence counting
/// up by one per packet and wrapping at the header's width.
pub fn packetize(message: &str, max_payload: usize) -> Result<Packetized> {
    let data = message.as_bytes();
    let total_len = data.len();

    if total_len + HEADER_LEN <= max_payload {
        let mut packet = BytesMut::with_capacity(HEADER_LEN + total_len);
        packet.put_u8(encode_header(PacketType::Single, 0));
        packet.put_slice(data);
        trace!(total_len, max_payload, "packetized as single");
        return Ok(Packetized {
            packets: vec![packet.freeze()],
            max_payload,
        });
    }

    if max_payload <= START_OVERHEAD {
        return Err(FrameError::MtuTooSmall {
            max_payload,
            message_len: total_len,
        });
    }

    let declared_len =
        u32::try_from(total_len).map_err(|_| FrameError::MessageTooLarge { size: total_len })?;

    let start_chunk = max_payload - START_OVERHEAD;
    let cont_chunk = max_payload - HEADER_LEN;
    let mut packets = Vec::with_capacity(2 + (total_len - start_chunk.min(total_len)) / cont_chunk);
    let mut seq: u8 = 0;

    let first = &data[..start_chunk.min(total_len)];
    let mut start = BytesMut::with_capacity(START_OVERHEAD + first.len());
    start.put_u8(encode_header(PacketType::Start, seq));
    start.put_u32(declared_len);
    start.put_slice(first);
    packets.push(start.freeze());
    seq = seq.wrapping_add(1);

    let mut rest = &data[first.len()..];
    while !rest.is_empty() {
        let (packet_type, take) = if rest.len() > cont_chunk {
            (PacketType::Continuation, cont_chunk)
        } else {
            (PacketType::End, rest.len())
        };
        let (chunk, tail) = rest.split_at(take);

        let mut packet = BytesMut::with_capacity(HEADER_LEN + chunk.len());
        packet.put_u8(encode_header(packet_type, seq));
        packet.put_slice(chunk);
        packets.push(packet.freeze());

        rest = tail;
        seq = seq.wrapping_add(1);
    }

    trace!(total_len, max_payload, packets = packets.len(), "packetized");
    Ok(Packetized {
        packets,
        max_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{decode_header, TYPE_END, TYPE_SINGLE, TYPE_START};
    use blerpc_link::{MAX_GATT_VALUE_LEN, MIN_PAYLOAD};

    fn types(out: &Packetized) -> Vec<PacketType> {
        out.packets.iter().map(|p| decode_header(p[0]).0).collect()
    }

    #[test]
    fn short_message_is_single() {
        let out = packetize("hi", 20).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.max_payload, 20);
        assert_eq!(out.packets[0].as_ref(), &[TYPE_SINGLE, b'h', b'i']);
    }

    #[test]
    fn empty_message_is_bare_header() {
        let out = packetize("", 20).unwrap();
        assert_eq!(out.packets, vec![Bytes::from_static(&[TYPE_SINGLE])]);
    }

    #[test]
    fn exact_fit_stays_single() {
        let message = "a".repeat(19);
        let out = packetize(&message, 20).unwrap();
        assert_eq!(types(&out), vec![PacketType::Single]);
        assert_eq!(out.packets[0].len(), 20);
    }

    #[test]
    fn one_byte_over_switches_to_multi() {
        let message = "a".repeat(20);
        let out = packetize(&message, 21).unwrap();
        assert_eq!(types(&out), vec![PacketType::Single]);

        let out = packetize(&message, 20).unwrap();
        assert_eq!(types(&out), vec![PacketType::Start, PacketType::End]);
    }

    #[test]
    fn start_packet_carries_big_endian_length() {
        let message = "x".repeat(300);
        let out = packetize(&message, 20).unwrap();

        let start = &out.packets[0];
        assert_eq!(start[0], TYPE_START);
        assert_eq!(&start[1..5], &300u32.to_be_bytes());
        assert_eq!(start.len(), 20);
        assert_eq!(&start[5..], "x".repeat(15).as_bytes());
    }

    #[test]
    fn middle_packets_are_full_and_end_takes_remainder() {
        // 15 in start, 19 per continuation: 15 + 19 + 19 + 1 = 54
        let message = "y".repeat(54);
        let out = packetize(&message, 20).unwrap();

        assert_eq!(
            types(&out),
            vec![
                PacketType::Start,
                PacketType::Continuation,
                PacketType::Continuation,
                PacketType::End
            ]
        );
        assert_eq!(out.packets[1].len(), 20);
        assert_eq!(out.packets[2].len(), 20);
        assert_eq!(out.packets[3].as_ref(), &[TYPE_END | 3, b'y']);
        assert_eq!(out.wire_size(), 54 + 4 + 4);
    }

    #[test]
    fn end_may_be_a_full_chunk() {
        // 15 in start, 19 in end
        let message = "z".repeat(34);
        let out = packetize(&message, 20).unwrap();
        assert_eq!(types(&out), vec![PacketType::Start, PacketType::End]);
        assert_eq!(out.packets[1].len(), 20);
    }

    #[test]
    fn sequences_count_up_and_wrap() {
        let message = "s".repeat(15 + 19 * 100);
        let out = packetize(&message, 20).unwrap();
        assert_eq!(out.len(), 101);

        for (i, packet) in out.packets.iter().enumerate() {
            let (_, seq) = decode_header(packet[0]);
            assert_eq!(seq as usize, i % 64);
        }
        assert_eq!(decode_header(out.packets[100][0]).0, PacketType::End);
    }

    #[test]
    fn counts_utf8_bytes_not_chars() {
        // 10 chars, 30 bytes
        let message = "日本語のテキストです";
        assert_eq!(message.len(), 30);

        let out = packetize(message, 20).unwrap();
        assert_eq!(&out.packets[0][1..5], &30u32.to_be_bytes());

        let data: Vec<u8> = std::iter::once(&out.packets[0][5..])
            .chain(out.packets[1..].iter().map(|p| &p[1..]))
            .flatten()
            .copied()
            .collect();
        assert_eq!(data, message.as_bytes());
    }

    #[test]
    fn tiny_payload_cannot_start() {
        for max_payload in 0..=5 {
            let err = packetize("too long for this", max_payload).unwrap_err();
            assert!(matches!(
                err,
                FrameError::MtuTooSmall { max_payload: m, message_len: 17 } if m == max_payload
            ));
        }
    }

    #[test]
    fn tiny_payload_still_sends_what_fits() {
        let out = packetize("abcd", 5).unwrap();
        assert_eq!(types(&out), vec![PacketType::Single]);
        assert!(packetize("", 1).is_ok());
    }

    #[test]
    fn smallest_usable_payload() {
        let out = packetize("abcdef", 6).unwrap();
        // 1 byte in start, 5 in end
        assert_eq!(types(&out), vec![PacketType::Start, PacketType::End]);
        assert_eq!(&out.packets[0][5..], b"a");
        assert_eq!(&out.packets[1][1..], b"bcdef");
    }

    #[test]
    fn compute_max_payload_clamps() {
        assert_eq!(compute_max_payload(23, MAX_GATT_VALUE_LEN, MIN_PAYLOAD), 20);
        assert_eq!(compute_max_payload(23, MAX_GATT_VALUE_LEN, 32), 32);
        assert_eq!(compute_max_payload(5, MAX_GATT_VALUE_LEN, MIN_PAYLOAD), MIN_PAYLOAD);
        assert_eq!(compute_max_payload(185, MAX_GATT_VALUE_LEN, MIN_PAYLOAD), 182);
        assert_eq!(
            compute_max_payload(65_535, MAX_GATT_VALUE_LEN, MIN_PAYLOAD),
            MAX_GATT_VALUE_LEN
        );
    }
}
