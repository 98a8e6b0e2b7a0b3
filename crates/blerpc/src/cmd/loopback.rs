use std::time::{Duration, Instant};

use blerpc_link::MemoryLink;
use blerpc_peer::{Peer, PeerConfig};
use serde::Serialize;
use tracing::info;

use crate::cmd::LoopbackArgs;
use crate::exit::{peer_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize, Debug)]
pub struct LoopbackOutput {
    pub mtu: usize,
    pub max_payload: usize,
    pub message_len: usize,
    /// Packets sent in each direction.
    pub packets: usize,
    pub echoed: bool,
    pub elapsed_us: u128,
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let message = args.payload.resolve()?;
    let config = PeerConfig {
        frame: args.framing.frame_config(),
        validate_json: args.payload.is_json(),
    };

    let (mut client_link, mut server_link) = MemoryLink::pair(args.framing.mtu);
    client_link.set_read_timeout(Some(timeout));
    server_link.set_read_timeout(Some(timeout));

    let output = exchange(client_link, server_link, config, &message)?;
    info!(
        packets = output.packets,
        echoed = output.echoed,
        "loopback finished"
    );

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "MTU",
                "MAX PAYLOAD",
                "LEN",
                "PACKETS",
                "ECHOED",
                "TIME (us)",
            ]);
            table.add_row(vec![
                output.mtu.to_string(),
                output.max_payload.to_string(),
                output.message_len.to_string(),
                output.packets.to_string(),
                output.echoed.to_string(),
                output.elapsed_us.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "mtu={} max_payload={} len={} packets={} echoed={} elapsed_us={}",
                output.mtu,
                output.max_payload,
                output.message_len,
                output.packets,
                output.echoed,
                output.elapsed_us
            );
        }
    }

    if output.echoed {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Send `message` from client to server, echo it back and compare.
fn exchange(
    client_link: MemoryLink,
    server_link: MemoryLink,
    config: PeerConfig,
    message: &str,
) -> CliResult<LoopbackOutput> {
    let mut client = Peer::with_config(client_link, config);
    let mut server = Peer::with_config(server_link, config);
    let started = Instant::now();

    let packets = client
        .send(message)
        .map_err(|err| peer_error("client send failed", err))?;
    let received = server
        .recv()
        .map_err(|err| peer_error("server receive failed", err))?;
    server
        .send(&received)
        .map_err(|err| peer_error("server send failed", err))?;
    let echoed = client
        .recv()
        .map_err(|err| peer_error("client receive failed", err))?;

    let output = LoopbackOutput {
        mtu: client.mtu(),
        max_payload: client.max_payload(),
        message_len: message.len(),
        packets,
        echoed: echoed == message,
        elapsed_us: started.elapsed().as_micros(),
    };
    client.close();
    server.close();
    Ok(output)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
