//! Builder for IdentityCard ledgers.
//!
//! Assembles a ledger from its deployment parameters, an optional storage
//! service and an event bus. With storage attached, `build` restores the
//! last saved state for the same deployment and every later mint or burn
//! is persisted before it takes effect.

use crate::engine::{event_bus::EventBus, Deployment, IdentityCard};
use crate::state::LedgerStore;
use crate::LedgerError;
use idcard_storage::StorageService;
use idcard_types::LedgerState;
use std::sync::Arc;

/// Builder for [`IdentityCard`].
pub struct LedgerBuilder {
	deployment: Deployment,
	storage: Option<Arc<StorageService>>,
	event_bus: Option<EventBus>,
}

impl LedgerBuilder {
	pub fn new(deployment: Deployment) -> Self {
		Self {
			deployment,
			storage: None,
			event_bus: None,
		}
	}

	/// Persists the ledger through `storage`.
	pub fn with_storage(mut self, storage: Arc<StorageService>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// Publishes events on an existing bus instead of a private one.
	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = Some(event_bus);
		self
	}

	/// Builds the ledger, restoring stored state when available.
	pub async fn build(self) -> Result<IdentityCard, LedgerError> {
		let events = self.event_bus.unwrap_or_default();
		let Some(storage) = self.storage else {
			return Ok(IdentityCard::from_parts(
				self.deployment,
				LedgerState::default(),
				None,
				events,
			));
		};

		let store = LedgerStore::new(storage, self.deployment.address);
		let state = match store
			.load(&self.deployment)
			.await
			.map_err(|e| LedgerError::Persistence(e.to_string()))?
		{
			Some(state) => {
				tracing::info!(
					contract = %self.deployment.address,
					tokens = state.tokens.len(),
					holders = state.holdings.len(),
					"Restored ledger state"
				);
				state
			},
			None => {
				tracing::info!(contract = %self.deployment.address, "Deployed new ledger");
				LedgerState::default()
			},
		};

		Ok(IdentityCard::from_parts(
			self.deployment,
			state,
			Some(store),
			events,
		))
	}
}
