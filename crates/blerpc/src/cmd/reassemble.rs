use std::io::BufRead;
use std::sync::{Arc, Mutex};

use blerpc_frame::{DiscardReason, Reassembler};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cmd::ReassembleArgs;
use crate::exit::{io_error, CliResult, FAILURE, SUCCESS};
use crate::packet_hex;
use crate::output::{print_json, print_messages, DiscardOutput, MessageOutput, OutputFormat};

#[derive(Serialize, Debug, Default)]
pub struct ReassemblyReport {
    pub messages: Vec<MessageOutput>,
    pub discards: Vec<DiscardOutput>,
    /// Bytes held for an unfinished message after the last packet.
    pub pending: Option<usize>,
}

pub fn run(args: ReassembleArgs, format: OutputFormat) -> CliResult<i32> {
    let inputs = if args.packets.is_empty() {
        read_stdin_lines()?
    } else {
        args.packets
    };

    let mut packets = Vec::with_capacity(inputs.len());
    for input in &inputs {
        packets.push(packet_hex::decode(input)?);
    }

    let report = reassemble(&packets, &args.framing.frame_config());
    for discard in &report.discards {
        warn!(packet = discard.at, reason = %discard.reason, "discarded partial message");
    }
    if let Some(pending) = report.pending {
        debug!(pending, "input ended mid-message");
    }

    match format {
        OutputFormat::Json => print_json(&report),
        other => print_messages(&report.messages, other),
    }

    if report.messages.is_empty() {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

pub fn reassemble(packets: &[Vec<u8>], config: &blerpc_frame::FrameConfig) -> ReassemblyReport {
    let discarded: Arc<Mutex<Vec<DiscardReason>>> = Arc::default();
    let sink = Arc::clone(&discarded);
    let mut reassembler = Reassembler::with_config(config).with_observer(move |reason| {
        if let Ok(mut reasons) = sink.lock() {
            reasons.push(*reason);
        }
    });

    let mut report = ReassemblyReport::default();
    for (index, packet) in packets.iter().enumerate() {
        let message = reassembler.feed(packet);

        if let Ok(mut reasons) = discarded.lock() {
            report
                .discards
                .extend(reasons.drain(..).map(|reason| DiscardOutput {
                    at: index,
                    reason: reason.to_string(),
                }));
        }

        if let Some(text) = message {
            report.messages.push(MessageOutput {
                completed_at: index,
                len: text.len(),
                text,
            });
        }
    }
    report.pending = reassembler.buffered_len();
    report
}

fn read_stdin_lines() -> CliResult<Vec<String>> {
    let stdin = std::io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.map_err(|err| io_error("failed reading stdin", err))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed.to_string());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blerpc_frame::{packetize, FrameConfig, SinglePolicy};

    fn packets_for(message: &str, max_payload: usize) -> Vec<Vec<u8>> {
        packetize(message, max_payload)
            .unwrap()
            .packets
            .iter()
            .map(|p| p.to_vec())
            .collect()
    }

    #[test]
    fn rebuilds_multi_packet_message() {
        let message = r#"{"jsonrpc":"2.0","method":"ping","params":{"n":1},"id":1}"#;
        let packets = packets_for(message, 20);
        let report = reassemble(&packets, &FrameConfig::default());

        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].text, message);
        assert_eq!(report.messages[0].completed_at, packets.len() - 1);
        assert!(report.discards.is_empty());
        assert_eq!(report.pending, None);
    }

    #[test]
    fn reports_sequence_gap() {
        let mut packets = packets_for(&"x".repeat(60), 20);
        packets.remove(1);
        let report = reassemble(&packets, &FrameConfig::default());

        assert!(report.messages.is_empty());
        assert_eq!(report.discards.len(), 1);
        assert_eq!(report.discards[0].at, 1);
        assert!(report.discards[0].reason.contains("sequence mismatch"));
    }

    #[test]
    fn reports_pending_bytes() {
        let mut packets = packets_for(&"y".repeat(60), 20);
        packets.truncate(2);
        let report = reassemble(&packets, &FrameConfig::default());

        assert!(report.messages.is_empty());
        assert_eq!(report.pending, Some(15 + 19));
    }

    #[test]
    fn reset_policy_drops_in_flight_message() {
        let mut packets = packets_for(&"z".repeat(60), 20);
        packets.insert(1, vec![0x00, b'h', b'i']);
        let config = FrameConfig {
            single_policy: SinglePolicy::ResetInFlight,
            ..FrameConfig::default()
        };
        let report = reassemble(&packets, &config);

        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].text, "hi");
        assert!(report.discards[0].reason.contains("interrupted by single packet"));
    }
}
