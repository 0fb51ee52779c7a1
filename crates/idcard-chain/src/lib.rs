//! Chain state reader for the IdentityCard authorization system.
//!
//! The issuing side needs three reads before it can sign anything: the
//! recipient's nonce on the ledger, the chain id and the current block
//! number. This crate abstracts those reads behind `ChainInterface` so the
//! same issuance flow runs against the in-process devnet and against a
//! deployed contract reached over JSON-RPC.
//!
//! The devnet additionally owns block production: every transaction is
//! included in a fresh block (automine) and empty blocks can be mined on
//! demand, which is what makes authorization expiry observable in tests.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use idcard_types::{BlockEnv, ChainSnapshot, ConfigSchema, ImplementationRegistry};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod local;
}

/// Errors that can occur while reading chain state.
#[derive(Debug, Error)]
pub enum ChainError {
	/// RPC transport or node failure.
	#[error("Network error: {0}")]
	Network(String),
	/// A contract read failed or no contract exists at the address.
	#[error("Contract error: {0}")]
	Contract(String),
	/// The implementation cannot perform this operation.
	#[error("Unsupported operation: {0}")]
	Unsupported(String),
	/// The implementation section is invalid.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Read-only view of a ledger deployed on the devnet.
///
/// The devnet resolves nonce reads through this trait, the same way an RPC
/// node answers `getNonce` from contract storage.
#[async_trait]
pub trait NonceView: Send + Sync {
	async fn nonce_of(&self, account: Address) -> U256;
}

/// Interface implemented by every chain backend.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Returns the configuration schema for this chain implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Chain id reported by the chain.
	async fn chain_id(&self) -> Result<u64, ChainError>;

	/// Latest block number.
	async fn block_number(&self) -> Result<u64, ChainError>;

	/// Current authorization nonce of `account` on the ledger at `contract`.
	async fn nonce_of(&self, contract: Address, account: Address) -> Result<U256, ChainError>;

	/// Produces the block that includes the next transaction.
	async fn next_block(&self) -> Result<BlockEnv, ChainError> {
		Err(ChainError::Unsupported("next_block".to_string()))
	}

	/// Mines `blocks` empty blocks and returns the new head number.
	async fn mine(&self, _blocks: u64) -> Result<u64, ChainError> {
		Err(ChainError::Unsupported("mine".to_string()))
	}

	/// Makes a ledger readable at `address`.
	async fn deploy(&self, _address: Address, _view: Arc<dyn NonceView>) -> Result<(), ChainError> {
		Err(ChainError::Unsupported("deploy".to_string()))
	}
}

/// Type alias for chain factory functions.
pub type ChainFactory = fn(&toml::Value) -> Result<Box<dyn ChainInterface>, ChainError>;

/// Registry trait for chain implementations.
pub trait ChainRegistry: ImplementationRegistry<Factory = ChainFactory> {}

/// Get all registered chain implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, ChainFactory)> {
	use implementations::{evm::alloy, local};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(alloy::Registry::NAME, alloy::Registry::factory()),
	]
}

/// Service wrapping the configured chain backend.
pub struct ChainService {
	implementation: Box<dyn ChainInterface>,
}

impl ChainService {
	pub fn new(implementation: Box<dyn ChainInterface>) -> Self {
		Self { implementation }
	}

	pub async fn chain_id(&self) -> Result<u64, ChainError> {
		self.implementation.chain_id().await
	}

	pub async fn block_number(&self) -> Result<u64, ChainError> {
		self.implementation.block_number().await
	}

	pub async fn nonce_of(&self, contract: Address, account: Address) -> Result<U256, ChainError> {
		self.implementation.nonce_of(contract, account).await
	}

	pub async fn next_block(&self) -> Result<BlockEnv, ChainError> {
		self.implementation.next_block().await
	}

	pub async fn mine(&self, blocks: u64) -> Result<u64, ChainError> {
		self.implementation.mine(blocks).await
	}

	pub async fn deploy(&self, address: Address, view: Arc<dyn NonceView>) -> Result<(), ChainError> {
		self.implementation.deploy(address, view).await
	}

	/// Chain id and block number, read in that order.
	pub async fn snapshot(&self) -> Result<ChainSnapshot, ChainError> {
		let chain_id = self.chain_id().await?;
		let block_number = self.block_number().await?;
		Ok(ChainSnapshot {
			chain_id,
			block_number,
		})
	}
}
