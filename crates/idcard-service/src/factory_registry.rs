//! Dynamic factory registry for pluggable implementations.
//!
//! Every implementation crate exposes `get_all_implementations()`; the
//! registry collects those once and the service context is assembled by
//! looking up each component's configured `primary` by name.

use alloy_primitives::Address;
use idcard_account::{AccountFactory, AccountService};
use idcard_auth::AuthorizationIssuer;
use idcard_chain::{implementations::local, ChainFactory, ChainService};
use idcard_config::Config;
use idcard_ledger::{Deployment, IdentityCard, LedgerBuilder};
use idcard_storage::{StorageFactory, StorageService};
use idcard_types::{format_wei, ImplementationRegistry};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub chain: HashMap<String, ChainFactory>,
	pub account: HashMap<String, AccountFactory>,
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			chain: HashMap::new(),
			account: HashMap::new(),
			storage: HashMap::new(),
		}
	}

	pub fn register_chain(&mut self, name: impl Into<String>, factory: ChainFactory) {
		self.chain.insert(name.into(), factory);
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in idcard_chain::get_all_implementations() {
			tracing::debug!("Registering chain implementation: {}", name);
			registry.register_chain(name, factory);
		}

		for (name, factory) in idcard_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in idcard_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Looks up the factory for a component's primary implementation and
/// instantiates it from its configuration table.
macro_rules! build_primary {
	($registry:expr, $section:expr, $registry_field:ident, $type_name:literal) => {{
		let name = &$section.primary;
		let factory = $registry.$registry_field.get(name).ok_or_else(|| {
			let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
			available.sort();
			format!(
				"Unknown {} implementation '{}'. Available: [{}]",
				$type_name,
				name,
				available.join(", ")
			)
		})?;
		let implementation_config = $section.implementations.get(name).ok_or_else(|| {
			format!("Missing configuration for {} implementation '{}'", $type_name, name)
		})?;
		factory(implementation_config)?
	}};
}

/// Everything a command needs, built from configuration.
pub struct ServiceContext {
	pub config: Config,
	pub chain: Arc<ChainService>,
	pub account: Arc<AccountService>,
	pub storage: Arc<StorageService>,
	pub issuer: Arc<AuthorizationIssuer>,
	/// Address whose signatures the ledger accepts.
	pub authorizer: Address,
	/// In-process ledger, present when the devnet chain is selected.
	pub ledger: Option<Arc<IdentityCard>>,
}

/// Whether the configured chain is the in-process devnet, which then also
/// hosts the ledger.
pub fn hosts_ledger(config: &Config) -> bool {
	config.chain.primary == local::Registry::NAME
}

/// Builds the service context from configuration.
///
/// On the devnet the ledger is deployed at `[ledger].contract_address`
/// with state restored from the configured storage; against a remote chain
/// the contract is expected to already exist there.
pub async fn build_context(config: Config) -> Result<ServiceContext, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let chain = Arc::new(ChainService::new(build_primary!(
		registry,
		config.chain,
		chain,
		"chain"
	)));
	let account = Arc::new(AccountService::new(build_primary!(
		registry,
		config.account,
		account,
		"account"
	)));
	let storage = Arc::new(StorageService::new(build_primary!(
		registry,
		config.storage,
		storage,
		"storage"
	)));

	let authorizer = match config.ledger.authorizer {
		Some(authorizer) => authorizer,
		None => account.get_address().await?,
	};
	let contract = config.ledger.contract_address;

	let ledger = if hosts_ledger(&config) {
		let deployment = Deployment {
			address: contract,
			chain_id: chain.chain_id().await?,
			authorizer,
			mint_price: config.ledger.mint_price()?,
		};
		let card = Arc::new(
			LedgerBuilder::new(deployment)
				.with_storage(storage.clone())
				.build()
				.await?,
		);
		chain.deploy(contract, card.clone()).await?;
		tracing::info!(
			contract = %contract,
			authorizer = %authorizer,
			mint_price = %format_wei(deployment.mint_price),
			"Hosting ledger in-process"
		);
		Some(card)
	} else {
		None
	};

	let issuer = Arc::new(AuthorizationIssuer::new(
		chain.clone(),
		account.clone(),
		contract,
		config.service.expiry_window_blocks,
	));

	Ok(ServiceContext {
		config,
		chain,
		account,
		storage,
		issuer,
		authorizer,
		ledger,
	})
}
