//! Chain state types.
//!
//! These describe the slice of chain state the protocol needs: the block a
//! call executes in, and the snapshot a signer reads before issuing.

use serde::{Deserialize, Serialize};

/// Block environment a ledger call executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
	/// Block height.
	pub number: u64,
	/// Block timestamp (Unix seconds).
	pub timestamp: u64,
}

/// Chain state read by the issuer before building a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
	/// The chain ID.
	pub chain_id: u64,
	/// Latest block number.
	pub block_number: u64,
}
