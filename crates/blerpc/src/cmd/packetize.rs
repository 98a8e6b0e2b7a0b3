use blerpc_frame::packetize;
use tracing::debug;

use crate::cmd::PacketizeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_packets, OutputFormat, PacketOutput};

pub fn run(args: PacketizeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = args.payload.resolve()?;
    let max_payload = args.framing.max_payload();

    let packetized =
        packetize(&message, max_payload).map_err(|err| frame_error("packetize failed", err))?;
    debug!(
        mtu = args.framing.mtu,
        max_payload,
        message_len = message.len(),
        packets = packetized.len(),
        wire_size = packetized.wire_size(),
        "packetized message"
    );

    let packets: Vec<PacketOutput> = packetized
        .packets
        .iter()
        .enumerate()
        .map(|(index, packet)| PacketOutput::from_packet(index, packet))
        .collect();
    print_packets(&packets, format);

    Ok(SUCCESS)
}
