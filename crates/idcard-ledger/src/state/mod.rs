//! Ledger persistence.
//!
//! A ledger is saved as one document under `ledger_state:<contract>`
//! holding its deployment parameters and the full `LedgerState`. The
//! document is written before a call's changes become visible, so a stored
//! snapshot never lags a successful mint or burn.

use crate::engine::Deployment;
use alloy_primitives::Address;
use idcard_storage::StorageService;
use idcard_types::{LedgerState, StorageKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while loading or saving a ledger.
#[derive(Debug, Error)]
pub enum StateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Stored ledger does not match deployment: {0}")]
	DeploymentMismatch(String),
}

/// Stored form of a ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedLedger {
	pub deployment: Deployment,
	pub state: LedgerState,
}

#[derive(Serialize)]
struct PersistedLedgerRef<'a> {
	deployment: &'a Deployment,
	state: &'a LedgerState,
}

/// Reads and writes one ledger's snapshot.
pub struct LedgerStore {
	storage: Arc<StorageService>,
	id: String,
}

impl LedgerStore {
	pub fn new(storage: Arc<StorageService>, contract: Address) -> Self {
		Self {
			storage,
			id: contract.to_string().to_lowercase(),
		}
	}

	/// Loads the stored state for `deployment`, if any.
	///
	/// A snapshot written by a different deployment (other chain, authorizer
	/// or price) is refused instead of silently adopted.
	pub async fn load(&self, deployment: &Deployment) -> Result<Option<LedgerState>, StateError> {
		let stored: Option<PersistedLedger> = self
			.storage
			.retrieve_optional(StorageKey::LedgerState, &self.id)
			.await
			.map_err(|e| StateError::Storage(e.to_string()))?;

		match stored {
			None => Ok(None),
			Some(stored) if stored.deployment == *deployment => Ok(Some(stored.state)),
			Some(stored) => Err(StateError::DeploymentMismatch(format!(
				"stored {:?}, configured {:?}",
				stored.deployment, deployment
			))),
		}
	}

	pub async fn save(&self, deployment: &Deployment, state: &LedgerState) -> Result<(), StateError> {
		self.storage
			.store(
				StorageKey::LedgerState,
				&self.id,
				&PersistedLedgerRef { deployment, state },
			)
			.await
			.map_err(|e| StateError::Storage(e.to_string()))
	}
}
