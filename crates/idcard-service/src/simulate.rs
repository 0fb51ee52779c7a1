//! Devnet walk-through of the authorization lifecycle.
//!
//! Drives the in-process ledger the way a client would: fetch an
//! authorization, submit it, then try the calls that must revert (replay,
//! burn without a token, expired signature). Each step reports the ledger's
//! answer instead of stopping at the first revert.

use crate::factory_registry::ServiceContext;
use alloy_primitives::{Address, U256};
use idcard_ledger::{CallContext, IdentityCard};
use idcard_types::{AuthorizationScope, SignedAuthorization, TokenId};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
	#[error("Simulation needs the local chain; configured chain is '{0}'")]
	NoLocalLedger(String),
	#[error("Issuing authorization failed: {0}")]
	Issue(String),
	#[error("Chain error: {0}")]
	Chain(String),
}

/// Outcome of one scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
	pub step: &'static str,
	/// Nonce the authorization was signed for.
	pub nonce: U256,
	/// Token id on success.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_id: Option<TokenId>,
	/// Revert tag on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub revert: Option<String>,
}

enum Call {
	Mint,
	Burn,
}

struct Simulation<'a> {
	context: &'a ServiceContext,
	ledger: &'a IdentityCard,
	caller: Address,
	price: U256,
}

impl Simulation<'_> {
	async fn authorize(&self, scope: AuthorizationScope) -> Result<SignedAuthorization, SimulationError> {
		self.context
			.issuer
			.issue(self.caller, scope)
			.await
			.map_err(|e| SimulationError::Issue(e.to_string()))
	}

	async fn submit(
		&self,
		step: &'static str,
		call: Call,
		auth: &SignedAuthorization,
	) -> Result<StepOutcome, SimulationError> {
		let block = self
			.context
			.chain
			.next_block()
			.await
			.map_err(|e| SimulationError::Chain(e.to_string()))?;
		let value = match call {
			Call::Mint => self.price,
			Call::Burn => U256::ZERO,
		};
		let ctx = CallContext {
			caller: self.caller,
			value,
			block,
		};

		let result = match call {
			Call::Mint => {
				self.ledger
					.mint(ctx, auth.expire_block, &auth.signature, &auth.verification_id)
					.await
			},
			Call::Burn => {
				self.ledger
					.burn(ctx, auth.expire_block, &auth.signature, &auth.verification_id)
					.await
			},
		};

		let outcome = StepOutcome {
			step,
			nonce: auth.nonce,
			token_id: result.as_ref().ok().copied(),
			revert: result.err().map(|e| e.reason().to_string()),
		};
		tracing::debug!(step, revert = ?outcome.revert, "Simulation step finished");
		Ok(outcome)
	}
}

/// Runs the lifecycle scenario for `caller` against the devnet ledger.
///
/// Steps: mint, replay of the mint signature, burn, burn with no token,
/// and a mint whose authorization is left to expire.
pub async fn run(
	context: &ServiceContext,
	caller: Address,
	verification_id: Option<String>,
) -> Result<Vec<StepOutcome>, SimulationError> {
	let ledger = context
		.ledger
		.as_deref()
		.ok_or_else(|| SimulationError::NoLocalLedger(context.config.chain.primary.clone()))?;
	let sim = Simulation {
		context,
		ledger,
		caller,
		price: ledger.deployment().mint_price,
	};

	let mut outcomes = Vec::new();

	let mint_auth = sim
		.authorize(AuthorizationScope::from_verification_id(verification_id))
		.await?;
	outcomes.push(sim.submit("mint", Call::Mint, &mint_auth).await?);
	outcomes.push(sim.submit("replay_mint", Call::Mint, &mint_auth).await?);

	let burn_auth = sim.authorize(AuthorizationScope::Basic).await?;
	outcomes.push(sim.submit("burn", Call::Burn, &burn_auth).await?);

	let burn_auth = sim.authorize(AuthorizationScope::Basic).await?;
	outcomes.push(sim.submit("burn_without_token", Call::Burn, &burn_auth).await?);

	let late_auth = sim.authorize(AuthorizationScope::Basic).await?;
	context
		.chain
		.mine(context.config.service.expiry_window_blocks)
		.await
		.map_err(|e| SimulationError::Chain(e.to_string()))?;
	outcomes.push(sim.submit("expired_mint", Call::Mint, &late_auth).await?);

	Ok(outcomes)
}
