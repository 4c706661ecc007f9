//! Parser functions for CLI arguments.

use alloy_primitives::B256;
use std::str::FromStr;

/// Parse a string slice into [B256].
pub fn parse_b256(s: &str) -> Result<B256, String> {
    B256::from_str(s).map_err(|_| format!("Invalid B256 value: {}", s))
}

/// Parse a decimal amount of yoctoNEAR into a [u128].
pub fn parse_balance(s: &str) -> Result<u128, String> {
    s.replace('_', "").parse::<u128>().map_err(|e| format!("Invalid balance {s}: {e}"))
}
