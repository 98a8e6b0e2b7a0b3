mod cmd;
mod exit;
mod logging;
mod output;
mod packet_hex;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "blerpc", version, about = "Framing tools for JSON-RPC over GATT-style links")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "BLERPC_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_packetize_subcommand() {
        let cli = Cli::try_parse_from(["blerpc", "packetize", "--mtu", "185", "--data", "hello"])
            .expect("packetize args should parse");

        assert!(matches!(cli.command, Command::Packetize(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "blerpc",
            "packetize",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_reassemble_with_hex_args() {
        let cli = Cli::try_parse_from([
            "blerpc",
            "reassemble",
            "006869",
            "--single-policy",
            "reset",
        ])
        .expect("reassemble args should parse");
        let Command::Reassemble(args) = cli.command else {
            panic!("expected reassemble");
        };
        assert_eq!(args.packets, vec!["006869".to_string()]);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["blerpc", "limits", "--mtu", "23", "--format", "json"])
            .expect("limits args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
