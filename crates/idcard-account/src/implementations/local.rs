//! Local private-key account.
//!
//! Keeps the authorizer key in process memory. The key normally arrives
//! through `${SIGNER_PK}` in the configuration file.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_primitives::{Address, Bytes};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use idcard_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};

/// Account backed by an in-memory secp256k1 key.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Builds an account from a hex private key (with or without `0x`).
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|key| {
			key.trim()
				.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(format!("Failed to parse private key: {}", e)))
		})?;

		tracing::debug!(address = %signer.address(), "Loaded local account");
		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, AccountError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(Bytes::from(signature.as_bytes().to_vec()))
	}
}

/// Configuration schema for LocalAccount.
pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![Field::new("private_key", FieldType::PrivateKey)], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalAccount::new(&SecretString::from(key))?))
}

/// Registry for the local account implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
