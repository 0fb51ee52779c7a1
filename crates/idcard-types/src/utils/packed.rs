//! Tightly packed encoder for authorization messages.
//!
//! Mirrors Solidity's `abi.encodePacked` for the handful of types the
//! authorization message uses: no padding between fields, addresses as their
//! 20 raw bytes, `uint256` as 32 big-endian bytes, strings as raw UTF-8.

use alloy_primitives::{Address, U256};

/// Append-only buffer producing a packed encoding.
pub struct PackedEncoder {
	buf: Vec<u8>,
}

impl Default for PackedEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl PackedEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_address(&mut self, addr: &Address) {
		self.buf.extend_from_slice(addr.as_slice());
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_str(&mut self, s: &str) {
		self.buf.extend_from_slice(s.as_bytes());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
