//! Configuration for the IdentityCard authorization service.
//!
//! Configuration is read from TOML with `${VAR}` / `${VAR:-default}`
//! environment substitution and validated after parsing. Pluggable
//! components (chain, account, storage) each name a `primary`
//! implementation and carry raw per-implementation tables that the
//! implementations validate through their own schemas.
//!
//! Component sections may be split into other files with
//! `include = ["chain.toml", "storage.toml"]`; see [`Config::from_file`].

mod loader;

#[cfg(any(test, feature = "testing"))]
pub mod builders;

use alloy_primitives::{Address, U256};
use idcard_types::utils::{DEFAULT_EXPIRY_WINDOW_BLOCKS, DEFAULT_MINT_PRICE_WEI};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Service identity and issuance settings.
	pub service: ServiceConfig,
	/// Chain reader implementations.
	pub chain: ChainConfig,
	/// Signing account implementations.
	pub account: AccountConfig,
	/// Storage backend implementations.
	pub storage: StorageConfig,
	/// Parameters of the IdentityCard deployment.
	pub ledger: LedgerConfig,
	/// Optional HTTP signing API.
	pub api: Option<ApiConfig>,
}

/// Service identity and issuance settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Number of blocks an issued authorization stays valid for.
	#[serde(default = "default_expiry_window_blocks")]
	pub expiry_window_blocks: u64,
}

/// Chain reader configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of chain implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Parameters of the IdentityCard deployment being authorized for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// Address of the ledger contract. Part of every signed digest.
	pub contract_address: Address,
	/// Signer required on every mint and burn. Defaults to the account address.
	#[serde(default)]
	pub authorizer: Option<Address>,
	/// Mint price in wei, as a decimal string.
	#[serde(default = "default_mint_price_wei")]
	pub mint_price_wei: String,
}

impl LedgerConfig {
	/// Parsed mint price.
	pub fn mint_price(&self) -> Result<U256, ConfigError> {
		U256::from_str_radix(self.mint_price_wei.trim(), 10).map_err(|e| {
			ConfigError::Validation(format!(
				"Invalid mint_price_wei '{}': {}",
				self.mint_price_wei, e
			))
		})
	}
}

/// HTTP signing API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_expiry_window_blocks() -> u64 {
	DEFAULT_EXPIRY_WINDOW_BLOCKS
}

fn default_mint_price_wei() -> String {
	DEFAULT_MINT_PRICE_WEI.to_string()
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must come from exactly one file, and
	/// `[service]` / `[ledger]` must be in `path` itself.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		loader::load(Path::new(path)).await
	}

	/// Validates the configuration.
	///
	/// - service id is not empty and the expiry window is within 1..=10000
	/// - every component names a primary that exists in its implementations
	/// - the mint price parses
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}
		if self.service.expiry_window_blocks == 0 {
			return Err(ConfigError::Validation(
				"expiry_window_blocks must be at least 1".into(),
			));
		}
		if self.service.expiry_window_blocks > 10_000 {
			return Err(ConfigError::Validation(
				"expiry_window_blocks cannot exceed 10000".into(),
			));
		}

		validate_primary("chain", &self.chain.primary, &self.chain.implementations)?;
		validate_primary(
			"account",
			&self.account.primary,
			&self.account.implementations,
		)?;
		validate_primary(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;

		if self.ledger.contract_address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Ledger contract_address cannot be the zero address".into(),
			));
		}
		if self.ledger.authorizer == Some(Address::ZERO) {
			return Err(ConfigError::Validation(
				"Ledger authorizer cannot be the zero address".into(),
			));
		}
		self.ledger.mint_price()?;

		if let Some(ref api) = self.api {
			if api.enabled && api.host.is_empty() {
				return Err(ConfigError::Validation("API host cannot be empty".into()));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
