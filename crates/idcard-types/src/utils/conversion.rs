//! Conversion utilities for addresses supplied as text.

use super::formatting::without_0x_prefix;
use alloy_primitives::Address;

/// Parses a hex address, with or without `0x`, case-insensitively.
pub fn parse_address(value: &str) -> Result<Address, String> {
	let hex_part = without_0x_prefix(value.trim());
	if hex_part.len() != 40 {
		return Err(format!(
			"Invalid address '{}': expected 40 hex characters, got {}",
			value,
			hex_part.len()
		));
	}
	hex_part
		.parse::<Address>()
		.map_err(|e| format!("Invalid address '{}': {}", value, e))
}
