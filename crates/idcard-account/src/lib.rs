//! Account management for the IdentityCard authorizer.
//!
//! This crate is the signer service of the protocol: it holds the
//! authorizer's key and produces personal-message signatures over
//! authorization digests. The ledger never touches it; only the issuing
//! side (CLI, HTTP service, tests) does.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use idcard_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Signing the message failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured key is missing or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error raised by the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface every account implementation provides.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address derived from the account's key.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs `message` with the personal-message convention
	/// (`"\x19Ethereum Signed Message:\n" || len || message`) and returns
	/// the 65-byte `r || s || v` signature, `v` being 27 or 28.
	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service wrapping the configured account implementation.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Address of the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs an authorization digest (or any other message).
	pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes, AccountError> {
		self.implementation.sign_message(message).await
	}
}
