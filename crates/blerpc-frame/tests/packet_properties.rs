//! Generated checks for `packetize` and `Reassembler::feed`.

use blerpc_frame::{packetize, PacketHeader, PacketType, Reassembler, HEADER_SEQ_MASK};
use proptest::prelude::*;

fn message_strategy() -> impl Strategy<Value = String> {
    prop_oneof![any::<String>(), "\\PC{0,1500}", "[a-z]{0,2000}"]
}

fn headers(packets: &[bytes::Bytes]) -> Vec<PacketHeader> {
    packets
        .iter()
        .map(|packet| PacketHeader::decode(packet[0]))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_message_round_trips(message in message_strategy(), max_payload in 6usize..=600) {
        let out = packetize(&message, max_payload).unwrap();
        let mut reassembler = Reassembler::new();

        let (last, rest) = out.packets.split_last().unwrap();
        for packet in rest {
            prop_assert_eq!(reassembler.feed(packet), None);
        }
        prop_assert_eq!(reassembler.feed(last), Some(message));
        prop_assert!(reassembler.is_idle());
    }

    #[test]
    fn packets_fit_and_count_sequences(
        message in message_strategy(),
        max_payload in 6usize..=600,
    ) {
        let out = packetize(&message, max_payload).unwrap();
        let headers = headers(&out.packets);

        for packet in &out.packets {
            prop_assert!(!packet.is_empty());
            prop_assert!(packet.len() <= max_payload);
        }
        for (index, header) in headers.iter().enumerate() {
            prop_assert_eq!(usize::from(header.sequence), index & usize::from(HEADER_SEQ_MASK));
        }
    }

    #[test]
    fn single_only_when_message_fits_next_to_header(
        message in message_strategy(),
        max_payload in 6usize..=600,
    ) {
        let out = packetize(&message, max_payload).unwrap();
        let headers = headers(&out.packets);

        if message.len() < max_payload {
            prop_assert_eq!(headers.len(), 1);
            prop_assert_eq!(headers[0].packet_type, PacketType::Single);
        } else {
            prop_assert!(headers.len() >= 2);
            prop_assert_eq!(headers[0].packet_type, PacketType::Start);
            prop_assert_eq!(headers[headers.len() - 1].packet_type, PacketType::End);
            for header in &headers[1..headers.len() - 1] {
                prop_assert_eq!(header.packet_type, PacketType::Continuation);
            }
        }
    }

    #[test]
    fn single_multi_boundary(max_payload in 6usize..=600) {
        let fits = "s".repeat(max_payload - 1);
        let out = packetize(&fits, max_payload).unwrap();
        prop_assert_eq!(out.len(), 1);
        prop_assert_eq!(out.packets[0].len(), max_payload);

        let spills = "s".repeat(max_payload);
        let out = packetize(&spills, max_payload).unwrap();
        let types: Vec<_> = headers(&out.packets).iter().map(|h| h.packet_type).collect();
        prop_assert_eq!(types, vec![PacketType::Start, PacketType::End]);
    }

    #[test]
    fn consecutive_messages_share_one_reassembler(
        messages in proptest::collection::vec(message_strategy(), 1..6),
        max_payload in 6usize..=600,
    ) {
        let mut reassembler = Reassembler::new();
        let mut emitted = Vec::new();
        for message in &messages {
            for packet in packetize(message, max_payload).unwrap().packets {
                emitted.extend(reassembler.feed(&packet));
            }
        }
        prop_assert_eq!(emitted, messages);
    }
}
