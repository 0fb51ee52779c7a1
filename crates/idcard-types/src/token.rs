//! Identity token records and the persisted ledger snapshot.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Sequential token identifier. The first minted token is `1`; `0` means "none".
pub type TokenId = u64;

/// Metadata recorded when an identity token is minted.
///
/// The record outlives the token: after a burn the owner link is cleared but
/// the verification code and timestamp stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Token id.
	pub token_id: TokenId,
	/// Current owner, `None` once burned.
	pub owner: Option<Address>,
	/// Verification id supplied at mint, empty when none was given.
	pub verify_code: String,
	/// Timestamp of the block that included the mint.
	pub mint_timestamp: u64,
}

/// Complete ledger state, serialisable for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
	/// Replay-protection counter per account.
	pub nonces: HashMap<Address, U256>,
	/// Token held by each account (absent when balance is zero).
	pub holdings: HashMap<Address, TokenId>,
	/// Every token ever minted, by id.
	pub tokens: BTreeMap<TokenId, TokenRecord>,
	/// Id the next mint will receive.
	pub next_token_id: TokenId,
	/// Sum of accepted mint payments in wei.
	pub collected: U256,
}

impl Default for LedgerState {
	fn default() -> Self {
		Self {
			nonces: HashMap::new(),
			holdings: HashMap::new(),
			tokens: BTreeMap::new(),
			next_token_id: 1,
			collected: U256::ZERO,
		}
	}
}

impl LedgerState {
	/// Current nonce for `account` (zero if never used).
	pub fn nonce_of(&self, account: &Address) -> U256 {
		self.nonces.get(account).copied().unwrap_or_default()
	}

	/// Balance of `account`: 1 while it holds a token, otherwise 0.
	pub fn balance_of(&self, account: &Address) -> u64 {
		u64::from(self.holdings.contains_key(account))
	}
}
