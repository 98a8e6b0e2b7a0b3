use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use blerpc_frame::{FrameConfig, SinglePolicy};
use blerpc_link::{ATT_OVERHEAD, DEFAULT_MTU, MAX_GATT_VALUE_LEN, MIN_PAYLOAD};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod limits;
pub mod loopback;
pub mod packetize;
pub mod reassemble;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the payload budget for an MTU.
    Limits(LimitsArgs),
    /// Split a message into wire packets and print them as hex.
    Packetize(PacketizeArgs),
    /// Feed hex packets through a reassembler and print completed messages.
    Reassemble(ReassembleArgs),
    /// Send a message between two in-memory peers and report the exchange.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Limits(args) => limits::run(args, format),
        Command::Packetize(args) => packetize::run(args, format),
        Command::Reassemble(args) => reassemble::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum SinglePolicyArg {
    /// Emit single packets and keep the in-flight message.
    #[default]
    Passthrough,
    /// Drop the in-flight message when a single packet arrives.
    Reset,
}

impl From<SinglePolicyArg> for SinglePolicy {
    fn from(value: SinglePolicyArg) -> Self {
        match value {
            SinglePolicyArg::Passthrough => SinglePolicy::Passthrough,
            SinglePolicyArg::Reset => SinglePolicy::ResetInFlight,
        }
    }
}

/// Framing limits shared by every command that cuts or rebuilds packets.
#[derive(Args, Debug, Clone)]
pub struct FramingArgs {
    /// Negotiated ATT MTU.
    #[arg(long, default_value_t = DEFAULT_MTU)]
    pub mtu: usize,
    /// Bytes of protocol overhead per write.
    #[arg(long, default_value_t = ATT_OVERHEAD)]
    pub att_overhead: usize,
    /// Hard ceiling on a single write.
    #[arg(long, default_value_t = MAX_GATT_VALUE_LEN)]
    pub max_gatt_value_len: usize,
    /// Payload floor.
    #[arg(long, default_value_t = MIN_PAYLOAD)]
    pub min_payload: usize,
    /// Handling of single packets that interrupt a multi-packet message.
    #[arg(long, value_enum, default_value_t = SinglePolicyArg::Passthrough)]
    pub single_policy: SinglePolicyArg,
}

impl FramingArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            att_overhead: self.att_overhead,
            max_gatt_value_len: self.max_gatt_value_len,
            min_payload: self.min_payload,
            single_policy: self.single_policy.into(),
        }
    }

    pub fn max_payload(&self) -> usize {
        self.frame_config().max_payload(self.mtu)
    }
}

/// Message text given inline or read from a file.
#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    /// JSON message (validated before sending).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw text message.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read the message from a UTF-8 file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn is_json(&self) -> bool {
        self.json.is_some()
    }

    pub fn resolve(&self) -> CliResult<String> {
        if let Some(json) = &self.json {
            serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            return Ok(json.clone());
        }
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        if let Some(path) = &self.file {
            let bytes = std::fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            return String::from_utf8(bytes).map_err(|err| {
                CliError::new(
                    DATA_INVALID,
                    format!("{} is not valid UTF-8: {err}", path.display()),
                )
            });
        }
        Err(CliError::new(USAGE, "one of --json, --data or --file is required"))
    }
}

#[derive(Args, Debug)]
pub struct LimitsArgs {
    #[command(flatten)]
    pub framing: FramingArgs,
}

#[derive(Args, Debug)]
pub struct PacketizeArgs {
    #[command(flatten)]
    pub framing: FramingArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct ReassembleArgs {
    /// Packets as hex strings. Read one per line from stdin when omitted.
    pub packets: Vec<String>,
    #[command(flatten)]
    pub framing: FramingArgs,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    #[command(flatten)]
    pub framing: FramingArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Receive timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: Option<&str>, data: Option<&str>) -> PayloadArgs {
        PayloadArgs {
            json: json.map(str::to_string),
            data: data.map(str::to_string),
            file: None,
        }
    }

    #[test]
    fn resolve_payload_prefers_given_source() {
        assert_eq!(payload(Some("{\"a\":1}"), None).resolve().unwrap(), "{\"a\":1}");
        assert_eq!(payload(None, Some("plain")).resolve().unwrap(), "plain");
    }

    #[test]
    fn resolve_payload_rejects_invalid_json() {
        let err = payload(Some("{nope"), None).resolve().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn resolve_payload_requires_a_source() {
        let err = payload(None, None).resolve().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn framing_args_build_config() {
        let framing = FramingArgs {
            mtu: 247,
            att_overhead: ATT_OVERHEAD,
            max_gatt_value_len: MAX_GATT_VALUE_LEN,
            min_payload: MIN_PAYLOAD,
            single_policy: SinglePolicyArg::Reset,
        };
        let config = framing.frame_config();
        assert_eq!(config.single_policy, SinglePolicy::ResetInFlight);
        assert_eq!(framing.max_payload(), 244);
    }
}
