//! Event types published by the ledger.
//!
//! Every state change and every rejected call is broadcast on the ledger's
//! event bus so that observers (logging, the HTTP service, tests) can follow
//! the nonce state machine without polling.

use crate::TokenId;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Which ledger entry point an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerCall {
	Mint,
	Burn,
}

impl std::fmt::Display for LedgerCall {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LedgerCall::Mint => write!(f, "mint"),
			LedgerCall::Burn => write!(f, "burn"),
		}
	}
}

/// Events related to the identity ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
	/// A token was minted.
	Minted {
		recipient: Address,
		token_id: TokenId,
		verify_code: String,
		block_number: u64,
		timestamp: u64,
		/// Nonce after the increment.
		nonce: U256,
	},
	/// A token was burned.
	Burned {
		recipient: Address,
		token_id: TokenId,
		block_number: u64,
		/// Nonce after the increment.
		nonce: U256,
	},
	/// A call was reverted without touching state.
	Rejected {
		recipient: Address,
		call: LedgerCall,
		reason: String,
	},
}
