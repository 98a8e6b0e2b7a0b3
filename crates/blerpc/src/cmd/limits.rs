use blerpc_frame::{HEADER_LEN, START_OVERHEAD};
use serde::Serialize;

use crate::cmd::{FramingArgs, LimitsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct LimitsOutput {
    pub mtu: usize,
    pub att_overhead: usize,
    pub max_gatt_value_len: usize,
    pub min_payload: usize,
    pub max_payload: usize,
    /// Largest message that fits in one `SINGLE` packet.
    pub single_capacity: usize,
    /// Message bytes carried by a `START` packet.
    pub start_capacity: usize,
    /// Message bytes carried by each `CONT` or `END` packet.
    pub continuation_capacity: usize,
    /// True when the payload floor exceeds what the link can carry.
    pub exceeds_link: bool,
}

impl LimitsOutput {
    pub fn compute(framing: &FramingArgs) -> Self {
        let max_payload = framing.max_payload();
        Self {
            mtu: framing.mtu,
            att_overhead: framing.att_overhead,
            max_gatt_value_len: framing.max_gatt_value_len,
            min_payload: framing.min_payload,
            max_payload,
            single_capacity: max_payload.saturating_sub(HEADER_LEN),
            start_capacity: max_payload.saturating_sub(START_OVERHEAD),
            continuation_capacity: max_payload.saturating_sub(HEADER_LEN),
            exceeds_link: max_payload > blerpc_link::max_value_len(framing.mtu),
        }
    }
}

pub fn run(args: LimitsArgs, format: OutputFormat) -> CliResult<i32> {
    let limits = LimitsOutput::compute(&args.framing);
    if limits.exceeds_link {
        tracing::warn!(
            mtu = limits.mtu,
            max_payload = limits.max_payload,
            "payload floor exceeds link capacity"
        );
    }

    match format {
        OutputFormat::Json => print_json(&limits),
        OutputFormat::Table => {
            let mut table = new_table(vec!["LIMIT", "VALUE"]);
            for (name, value) in rows(&limits) {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (name, value) in rows(&limits) {
                println!("{name}: {value}");
            }
        }
    }

    Ok(SUCCESS)
}

fn rows(limits: &LimitsOutput) -> Vec<(&'static str, String)> {
    vec![
        ("mtu", limits.mtu.to_string()),
        ("att_overhead", limits.att_overhead.to_string()),
        ("max_gatt_value_len", limits.max_gatt_value_len.to_string()),
        ("min_payload", limits.min_payload.to_string()),
        ("max_payload", limits.max_payload.to_string()),
        ("single_capacity", limits.single_capacity.to_string()),
        ("start_capacity", limits.start_capacity.to_string()),
        ("continuation_capacity", limits.continuation_capacity.to_string()),
        ("exceeds_link", limits.exceeds_link.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::SinglePolicyArg;

    fn framing(mtu: usize) -> FramingArgs {
        FramingArgs {
            mtu,
            att_overhead: 3,
            max_gatt_value_len: 512,
            min_payload: 20,
            single_policy: SinglePolicyArg::Passthrough,
        }
    }

    #[test]
    fn default_mtu_limits() {
        let limits = LimitsOutput::compute(&framing(23));
        assert_eq!(limits.max_payload, 20);
        assert_eq!(limits.single_capacity, 19);
        assert_eq!(limits.start_capacity, 15);
        assert_eq!(limits.continuation_capacity, 19);
        assert!(!limits.exceeds_link);
    }

    #[test]
    fn large_mtu_is_capped() {
        let limits = LimitsOutput::compute(&framing(600));
        assert_eq!(limits.max_payload, 512);
        assert!(!limits.exceeds_link);
    }

    #[test]
    fn tiny_mtu_floor_exceeds_link() {
        let limits = LimitsOutput::compute(&framing(10));
        assert_eq!(limits.max_payload, 20);
        assert!(limits.exceeds_link);
    }
}
