//! Configuration builder for tests and local development.
//!
//! Produces a devnet configuration (local chain, memory storage, local
//! account) that individual tests adjust through the fluent setters.

use crate::{
	AccountConfig, ApiConfig, ChainConfig, Config, LedgerConfig, ServiceConfig, StorageConfig,
};
use alloy_primitives::{address, Address};
use std::collections::HashMap;

/// Hardhat development key #2, used as the default authorizer.
const DEV_AUTHORIZER_KEY: &str =
	"0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	expiry_window_blocks: u64,
	chain_id: u64,
	private_key: String,
	contract_address: Address,
	authorizer: Option<Address>,
	mint_price_wei: String,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "idcard-test".to_string(),
			expiry_window_blocks: 20,
			chain_id: 31337,
			private_key: DEV_AUTHORIZER_KEY.to_string(),
			contract_address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
			authorizer: None,
			mint_price_wei: "10000000000000000".to_string(),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn expiry_window_blocks(mut self, blocks: u64) -> Self {
		self.expiry_window_blocks = blocks;
		self
	}

	/// Sets the devnet chain id.
	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Sets the signing key of the local account.
	pub fn private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = key.into();
		self
	}

	pub fn contract_address(mut self, address: Address) -> Self {
		self.contract_address = address;
		self
	}

	pub fn authorizer(mut self, authorizer: Option<Address>) -> Self {
		self.authorizer = authorizer;
		self
	}

	pub fn mint_price_wei(mut self, price: impl Into<String>) -> Self {
		self.mint_price_wei = price.into();
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		let mut local_chain = toml::map::Map::new();
		local_chain.insert(
			"chain_id".to_string(),
			toml::Value::Integer(self.chain_id as i64),
		);

		let mut local_account = toml::map::Map::new();
		local_account.insert(
			"private_key".to_string(),
			toml::Value::String(self.private_key),
		);

		Config {
			service: ServiceConfig {
				id: self.service_id,
				expiry_window_blocks: self.expiry_window_blocks,
			},
			chain: ChainConfig {
				primary: "local".to_string(),
				implementations: HashMap::from([(
					"local".to_string(),
					toml::Value::Table(local_chain),
				)]),
			},
			account: AccountConfig {
				primary: "local".to_string(),
				implementations: HashMap::from([(
					"local".to_string(),
					toml::Value::Table(local_account),
				)]),
			},
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: HashMap::from([(
					"memory".to_string(),
					toml::Value::Table(toml::map::Map::new()),
				)]),
			},
			ledger: LedgerConfig {
				contract_address: self.contract_address,
				authorizer: self.authorizer,
				mint_price_wei: self.mint_price_wei,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_built_config_validates() {
		let config = ConfigBuilder::new().expiry_window_blocks(5).build();
		assert!(config.validate().is_ok());
		assert_eq!(config.service.expiry_window_blocks, 5);
		assert_eq!(config.chain.implementations["local"]["chain_id"].as_integer(), Some(31337));
	}
}
