//! In-process development chain.
//!
//! Stands in for a hardhat-style node: fixed chain id, automine (every
//! transaction gets its own block, number +1 and timestamp +block time) and
//! manual mining of empty blocks. Ledgers are "deployed" by registering a
//! `NonceView` under their address.

use crate::{ChainError, ChainFactory, ChainInterface, ChainRegistry, NonceView};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use idcard_types::{
	utils::{current_timestamp, DEVNET_CHAIN_ID},
	BlockEnv, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Local automining chain.
pub struct LocalChain {
	chain_id: u64,
	block_time_seconds: u64,
	head: Mutex<BlockEnv>,
	contracts: RwLock<HashMap<Address, Arc<dyn NonceView>>>,
}

impl LocalChain {
	/// Creates a chain whose genesis block (number 0) has `genesis_timestamp`.
	pub fn new(chain_id: u64, genesis_timestamp: u64, block_time_seconds: u64) -> Self {
		Self {
			chain_id,
			block_time_seconds,
			head: Mutex::new(BlockEnv {
				number: 0,
				timestamp: genesis_timestamp,
			}),
			contracts: RwLock::new(HashMap::new()),
		}
	}

	/// Latest mined block.
	pub async fn latest_block(&self) -> BlockEnv {
		*self.head.lock().await
	}

	/// Moves the head forward by `blocks`, saturating at `u64::MAX`.
	fn advance(&self, head: &mut BlockEnv, blocks: u64) {
		head.number = head.number.saturating_add(blocks);
		head.timestamp = head
			.timestamp
			.saturating_add(self.block_time_seconds.saturating_mul(blocks));
	}
}

#[async_trait]
impl ChainInterface for LocalChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalChainSchema)
	}

	async fn chain_id(&self) -> Result<u64, ChainError> {
		Ok(self.chain_id)
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		Ok(self.head.lock().await.number)
	}

	async fn nonce_of(&self, contract: Address, account: Address) -> Result<U256, ChainError> {
		let view = self
			.contracts
			.read()
			.await
			.get(&contract)
			.cloned()
			.ok_or_else(|| ChainError::Contract(format!("No contract deployed at {}", contract)))?;
		Ok(view.nonce_of(account).await)
	}

	async fn next_block(&self) -> Result<BlockEnv, ChainError> {
		let mut head = self.head.lock().await;
		self.advance(&mut head, 1);
		tracing::trace!(number = head.number, timestamp = head.timestamp, "Mined block");
		Ok(*head)
	}

	async fn mine(&self, blocks: u64) -> Result<u64, ChainError> {
		let mut head = self.head.lock().await;
		self.advance(&mut head, blocks);
		tracing::debug!(blocks, head = head.number, "Mined empty blocks");
		Ok(head.number)
	}

	async fn deploy(&self, address: Address, view: Arc<dyn NonceView>) -> Result<(), ChainError> {
		let mut contracts = self.contracts.write().await;
		if contracts.contains_key(&address) {
			return Err(ChainError::Contract(format!(
				"Contract already deployed at {}",
				address
			)));
		}
		contracts.insert(address, view);
		tracing::info!(contract = %address, chain_id = self.chain_id, "Deployed ledger on devnet");
		Ok(())
	}
}

/// Configuration schema for LocalChain.
pub struct LocalChainSchema;

impl ConfigSchema for LocalChainSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![],
			// Optional fields
			vec![
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"genesis_timestamp",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"block_time_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a devnet from configuration.
///
/// Configuration parameters:
/// - `chain_id`: chain id to report (default 31337)
/// - `genesis_timestamp`: timestamp of block 0 (default: now)
/// - `block_time_seconds`: timestamp increment per block (default 1)
pub fn create_chain(config: &toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> {
	LocalChainSchema
		.validate(config)
		.map_err(|e| ChainError::InvalidConfig(e.to_string()))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEVNET_CHAIN_ID);
	let genesis_timestamp = config
		.get("genesis_timestamp")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or_else(current_timestamp);
	let block_time_seconds = config
		.get("block_time_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(1);

	Ok(Box::new(LocalChain::new(
		chain_id,
		genesis_timestamp,
		block_time_seconds,
	)))
}

/// Registry for the local devnet implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = ChainFactory;

	fn factory() -> Self::Factory {
		create_chain
	}
}

impl ChainRegistry for Registry {}
