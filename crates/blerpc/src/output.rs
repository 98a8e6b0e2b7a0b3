use std::io::{IsTerminal, Write};

use blerpc_frame::PacketHeader;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;


#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct PacketOutput {
    pub index: usize,
    #[serde(rename = "type")]
    pub packet_type: &'static str,
    pub sequence: u8,
    pub len: usize,
    pub hex: String,
}

impl PacketOutput {
    pub fn from_packet(index: usize, packet: &[u8]) -> Self {
        let (packet_type, sequence) = match packet.first() {
            Some(&byte) => {
                let header = PacketHeader::decode(byte);
                (header.packet_type.name(), header.sequence)
            }
            None => ("EMPTY", 0),
        };
        Self {
            index,
            packet_type,
            sequence,
            len: packet.len(),
            hex: hex::encode(packet),
        }
    }
}

#[derive(Serialize)]
pub struct MessageOutput {
    /// Index of the packet that completed the message.
    pub completed_at: usize,
    pub len: usize,
    pub text: String,
}

#[derive(Serialize)]
pub struct DiscardOutput {
    /// Index of the packet that triggered the discard.
    pub at: usize,
    pub reason: String,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_packets(packets: &[PacketOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for packet in packets {
                print_json(packet);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "TYPE", "SEQ", "LEN", "HEX"]);
            for packet in packets {
                table.add_row(vec![
                    packet.index.to_string(),
                    packet.packet_type.to_string(),
                    packet.sequence.to_string(),
                    packet.len.to_string(),
                    packet.hex.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for packet in packets {
                println!(
                    "#{} type={} seq={} len={} hex={}",
                    packet.index, packet.packet_type, packet.sequence, packet.len, packet.hex
                );
            }
        }
        OutputFormat::Raw => {
            for packet in packets {
                println!("{}", packet.hex);
            }
        }
    }
}

pub fn print_messages(messages: &[MessageOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for message in messages {
                print_json(message);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["PACKET", "LEN", "MESSAGE"]);
            for message in messages {
                table.add_row(vec![
                    message.completed_at.to_string(),
                    message.len.to_string(),
                    message.text.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for message in messages {
                println!(
                    "packet={} len={} message={}",
                    message.completed_at, message.len, message.text
                );
            }
        }
        OutputFormat::Raw => {
            for message in messages {
                print_raw(message.text.as_bytes());
                print_raw(b"\n");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
