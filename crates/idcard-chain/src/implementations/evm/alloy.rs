//! JSON-RPC chain reader backed by Alloy.
//!
//! Reads block number and chain id from the node and nonces from a deployed
//! IdentityCard contract. Block production is left to the node, so the
//! devnet-only operations keep their `Unsupported` defaults.

use crate::{ChainError, ChainFactory, ChainInterface, ChainRegistry};
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_sol_types::sol;
use alloy_transport_http::Http;
use async_trait::async_trait;
use idcard_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::str::FromStr;

sol! {
	#[sol(rpc)]
	interface IIdentityCard {
		function getNonce(address forAddress) external view returns (uint256);
		function nonces(address what) external view returns (uint256);
	}
}

/// Contract accessor used to read nonces.
///
/// Both names return the same mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAccessor {
	GetNonce,
	Nonces,
}

impl FromStr for NonceAccessor {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"getNonce" => Ok(Self::GetNonce),
			"nonces" => Ok(Self::Nonces),
			other => Err(format!(
				"Unknown nonce accessor '{}', expected 'getNonce' or 'nonces'",
				other
			)),
		}
	}
}

/// Alloy-based chain reader.
pub struct AlloyChain {
	provider: RootProvider<Http<reqwest::Client>>,
	nonce_accessor: NonceAccessor,
}

impl AlloyChain {
	/// Creates a reader for the node at `rpc_url`. No request is made here.
	pub fn new(rpc_url: &str, nonce_accessor: NonceAccessor) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::InvalidConfig(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;
		let provider = RootProvider::new_http(url);

		Ok(Self {
			provider,
			nonce_accessor,
		})
	}
}

#[async_trait]
impl ChainInterface for AlloyChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyChainSchema)
	}

	async fn chain_id(&self) -> Result<u64, ChainError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get chain id: {}", e)))
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get block number: {}", e)))
	}

	async fn nonce_of(&self, contract: Address, account: Address) -> Result<U256, ChainError> {
		let card = IIdentityCard::new(contract, &self.provider);

		let nonce = match self.nonce_accessor {
			NonceAccessor::GetNonce => card.getNonce(account).call().await.map(|r| r._0),
			NonceAccessor::Nonces => card.nonces(account).call().await.map(|r| r._0),
		}
		.map_err(|e| {
			ChainError::Contract(format!(
				"Failed to read nonce for {} from {}: {}",
				account, contract, e
			))
		})?;

		tracing::debug!(contract = %contract, account = %account, nonce = %nonce, "Read ledger nonce");
		Ok(nonce)
	}
}

/// Configuration schema for AlloyChain.
pub struct AlloyChainSchema;

impl ConfigSchema for AlloyChainSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("rpc_url must be an http(s) URL".to_string()),
				}
			})],
			// Optional fields
			vec![
				Field::new("nonce_accessor", FieldType::String).with_validator(|value| {
					value
						.as_str()
						.unwrap_or_default()
						.parse::<NonceAccessor>()
						.map(|_| ())
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an RPC chain reader from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: HTTP endpoint of the node
/// - `nonce_accessor`: `getNonce` (default) or `nonces`
pub fn create_chain(config: &toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> {
	AlloyChainSchema
		.validate(config)
		.map_err(|e| ChainError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ChainError::InvalidConfig("rpc_url is required".to_string()))?;
	let nonce_accessor = match config.get("nonce_accessor").and_then(|v| v.as_str()) {
		Some(name) => name.parse().map_err(ChainError::InvalidConfig)?,
		None => NonceAccessor::GetNonce,
	};

	Ok(Box::new(AlloyChain::new(rpc_url, nonce_accessor)?))
}

/// Registry for the Alloy chain reader.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "alloy";
	type Factory = ChainFactory;

	fn factory() -> Self::Factory {
		create_chain
	}
}

impl ChainRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nonce_accessor_parsing() {
		assert_eq!("getNonce".parse::<NonceAccessor>(), Ok(NonceAccessor::GetNonce));
		assert_eq!("nonces".parse::<NonceAccessor>(), Ok(NonceAccessor::Nonces));
		assert!("nonce".parse::<NonceAccessor>().is_err());
	}

	#[test]
	fn test_schema() {
		let valid: toml::Value = toml::from_str(
			r#"
rpc_url = "http://127.0.0.1:8545"
nonce_accessor = "nonces"
"#,
		)
		.unwrap();
		assert!(AlloyChainSchema.validate(&valid).is_ok());

		let bad_url: toml::Value = toml::from_str(r#"rpc_url = "ws://127.0.0.1:8545""#).unwrap();
		assert!(AlloyChainSchema.validate(&bad_url).is_err());

		let bad_accessor: toml::Value = toml::from_str(
			r#"
rpc_url = "http://127.0.0.1:8545"
nonce_accessor = "balanceOf"
"#,
		)
		.unwrap();
		assert!(AlloyChainSchema.validate(&bad_accessor).is_err());
	}

	#[test]
	fn test_factory_builds_without_connecting() {
		let config: toml::Value = toml::from_str(r#"rpc_url = "http://127.0.0.1:8545""#).unwrap();
		assert!(create_chain(&config).is_ok());
	}
}
