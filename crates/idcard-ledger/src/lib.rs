//! IdentityCard ledger.
//!
//! In-process rendition of the IdentityCard contract: mint and burn are
//! gated by an authorizer signature over the caller's current nonce, each
//! success bumps that nonce, and each failure reverts with one of a fixed
//! set of reason tags and no state change.

use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::LedgerBuilder;
pub use engine::{event_bus::EventBus, CallContext, Deployment, IdentityCard};

/// Reasons a ledger call reverts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
	/// The recovered signer is not the authorizer, or the signature was made
	/// for another nonce, contract, chain, expiry or verification id.
	#[error("Invalid signer")]
	InvalidSigner,
	/// Mint while already holding a token.
	#[error("Balance must be zero")]
	AlreadyHolds,
	/// Burn without holding a token.
	#[error("No balance to burn")]
	NoBalance,
	/// Current block is past the authorization's expiry block.
	#[error("Authorization expired")]
	Expired,
	/// Mint with less than the mint price attached.
	#[error("Insufficient payment")]
	InsufficientPayment,
	/// The new state could not be saved; nothing was applied.
	#[error("Persistence failed: {0}")]
	Persistence(String),
}

impl LedgerError {
	/// Revert tag reported to callers.
	pub fn reason(&self) -> &'static str {
		match self {
			LedgerError::InvalidSigner => "Invalid signer",
			LedgerError::AlreadyHolds => "Balance must be zero",
			LedgerError::NoBalance => "No balance to burn",
			LedgerError::Expired => "Authorization expired",
			LedgerError::InsufficientPayment => "Insufficient payment",
			LedgerError::Persistence(_) => "Persistence failed",
		}
	}

	/// True for the two balance errors (mint while holding, burn while empty).
	pub fn is_balance_class(&self) -> bool {
		matches!(self, LedgerError::AlreadyHolds | LedgerError::NoBalance)
	}
}
