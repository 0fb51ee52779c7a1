//! String formatting utilities for logs and CLI output.

use alloy_primitives::U256;

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Formats a wei amount as ether, e.g. `10000000000000000` -> `"0.01"`.
pub fn format_wei(amount: U256) -> String {
	const DECIMALS: usize = 18;
	let digits = amount.to_string();

	let (integer_part, decimal_part) = if digits.len() <= DECIMALS {
		("0".to_string(), format!("{:0>width$}", digits, width = DECIMALS))
	} else {
		let split_pos = digits.len() - DECIMALS;
		(digits[..split_pos].to_string(), digits[split_pos..].to_string())
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');
	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}
