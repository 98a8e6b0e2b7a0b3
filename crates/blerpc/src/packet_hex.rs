use crate::exit::{CliError, CliResult, USAGE};

/// Parse one packet given as hex, ignoring whitespace, `:` and `-`
/// separators and an optional `0x` prefix.
pub fn decode(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != '-')
        .collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex packet {input:?}: {err}")))
}
