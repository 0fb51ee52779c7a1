//! The IdentityCard ledger.
//!
//! One `IdentityCard` is one deployed contract: a per-address nonce map, at
//! most one token per address, and the metadata of every token ever minted.
//! `mint` and `burn` run their whole check-then-commit sequence under a
//! single write lock, so concurrent calls are serialised and a failed call
//! leaves no trace in nonces, balances, token records or collected value.

pub mod event_bus;

use crate::state::LedgerStore;
use crate::LedgerError;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use event_bus::EventBus;
use idcard_auth::verify_authorization;
use idcard_chain::NonceView;
use idcard_types::{
	AuthorizationMessage, AuthorizationScope, BlockEnv, LedgerCall, LedgerEvent, LedgerState,
	TokenId, TokenRecord,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Immutable parameters fixed when a ledger is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
	/// Address the ledger lives at; part of every digest.
	pub address: Address,
	/// Chain the ledger lives on; part of every digest.
	pub chain_id: u64,
	/// The only key whose signatures authorize mints and burns.
	pub authorizer: Address,
	/// Minimum value attached to a mint, in wei.
	pub mint_price: U256,
}

/// Transaction context of a ledger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
	/// Account submitting the call; it is the authorization's recipient.
	pub caller: Address,
	/// Value attached to the call, in wei.
	pub value: U256,
	/// Block the call is included in.
	pub block: BlockEnv,
}

/// In-process IdentityCard ledger.
pub struct IdentityCard {
	deployment: Deployment,
	state: RwLock<LedgerState>,
	store: Option<LedgerStore>,
	events: EventBus,
}

impl IdentityCard {
	pub(crate) fn from_parts(
		deployment: Deployment,
		state: LedgerState,
		store: Option<LedgerStore>,
		events: EventBus,
	) -> Self {
		Self {
			deployment,
			state: RwLock::new(state),
			store,
			events,
		}
	}

	/// Fresh, unpersisted ledger.
	pub fn deploy(deployment: Deployment) -> Self {
		Self::from_parts(deployment, LedgerState::default(), None, EventBus::default())
	}

	pub fn deployment(&self) -> &Deployment {
		&self.deployment
	}

	pub fn address(&self) -> Address {
		self.deployment.address
	}

	pub fn authorizer(&self) -> Address {
		self.deployment.authorizer
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.events
	}

	/// Mints the caller's identity token.
	///
	/// Checks, in order: attached value, signer, expiry, zero balance. A
	/// non-empty `verification_id` selects the verified digest shape and is
	/// recorded as the token's verify code.
	pub async fn mint(
		&self,
		ctx: CallContext,
		expire_block: u64,
		signature: &[u8],
		verification_id: &str,
	) -> Result<TokenId, LedgerError> {
		let mut state = self.state.write().await;

		let result = self
			.check_mint(&state, &ctx, expire_block, signature, verification_id)
			.map(|()| self.apply_mint(&state, &ctx, verification_id));
		let (next, token_id) = match result {
			Ok(applied) => applied,
			Err(e) => return Err(self.reject(ctx.caller, LedgerCall::Mint, e)),
		};

		if let Err(e) = self.commit(&mut state, next).await {
			return Err(self.reject(ctx.caller, LedgerCall::Mint, e));
		}
		let nonce = state.nonce_of(&ctx.caller);

		tracing::info!(
			recipient = %ctx.caller,
			token_id,
			nonce = %nonce,
			block = ctx.block.number,
			"Minted identity card"
		);
		self.events.publish(LedgerEvent::Minted {
			recipient: ctx.caller,
			token_id,
			verify_code: verification_id.to_string(),
			block_number: ctx.block.number,
			timestamp: ctx.block.timestamp,
			nonce,
		});
		Ok(token_id)
	}

	/// Burns the caller's identity token.
	///
	/// The digest always uses the basic shape; `verification_id` is accepted
	/// for call compatibility and otherwise ignored.
	pub async fn burn(
		&self,
		ctx: CallContext,
		expire_block: u64,
		signature: &[u8],
		_verification_id: &str,
	) -> Result<TokenId, LedgerError> {
		let mut state = self.state.write().await;

		let result = self
			.check_burn(&state, &ctx, expire_block, signature)
			.map(|token_id| (self.apply_burn(&state, &ctx, token_id), token_id));
		let (next, token_id) = match result {
			Ok(applied) => applied,
			Err(e) => return Err(self.reject(ctx.caller, LedgerCall::Burn, e)),
		};

		if let Err(e) = self.commit(&mut state, next).await {
			return Err(self.reject(ctx.caller, LedgerCall::Burn, e));
		}
		let nonce = state.nonce_of(&ctx.caller);

		tracing::info!(
			recipient = %ctx.caller,
			token_id,
			nonce = %nonce,
			block = ctx.block.number,
			"Burned identity card"
		);
		self.events.publish(LedgerEvent::Burned {
			recipient: ctx.caller,
			token_id,
			block_number: ctx.block.number,
			nonce,
		});
		Ok(token_id)
	}

	fn check_mint(
		&self,
		state: &LedgerState,
		ctx: &CallContext,
		expire_block: u64,
		signature: &[u8],
		verification_id: &str,
	) -> Result<(), LedgerError> {
		if ctx.value < self.deployment.mint_price {
			return Err(LedgerError::InsufficientPayment);
		}
		let scope = if verification_id.is_empty() {
			AuthorizationScope::Basic
		} else {
			AuthorizationScope::Verified {
				verification_id: verification_id.to_string(),
			}
		};
		self.check_authorization(state, ctx, expire_block, signature, scope)?;
		if state.balance_of(&ctx.caller) != 0 {
			return Err(LedgerError::AlreadyHolds);
		}
		Ok(())
	}

	fn check_burn(
		&self,
		state: &LedgerState,
		ctx: &CallContext,
		expire_block: u64,
		signature: &[u8],
	) -> Result<TokenId, LedgerError> {
		self.check_authorization(state, ctx, expire_block, signature, AuthorizationScope::Basic)?;
		state
			.holdings
			.get(&ctx.caller)
			.copied()
			.ok_or(LedgerError::NoBalance)
	}

	/// Signer check against the caller's current nonce, then expiry.
	fn check_authorization(
		&self,
		state: &LedgerState,
		ctx: &CallContext,
		expire_block: u64,
		signature: &[u8],
		scope: AuthorizationScope,
	) -> Result<(), LedgerError> {
		let message = AuthorizationMessage {
			recipient: ctx.caller,
			expire_block,
			subject_contract: self.deployment.address,
			nonce: state.nonce_of(&ctx.caller),
			chain_id: self.deployment.chain_id,
			scope,
		};
		if let Err(e) = verify_authorization(&message, signature, self.deployment.authorizer) {
			tracing::debug!(recipient = %ctx.caller, error = %e, "Authorization did not verify");
			return Err(LedgerError::InvalidSigner);
		}
		if ctx.block.number > expire_block {
			return Err(LedgerError::Expired);
		}
		Ok(())
	}

	fn apply_mint(
		&self,
		state: &LedgerState,
		ctx: &CallContext,
		verification_id: &str,
	) -> (LedgerState, TokenId) {
		let mut next = state.clone();
		let token_id = next.next_token_id;

		bump_nonce(&mut next, ctx.caller);
		next.next_token_id += 1;
		next.holdings.insert(ctx.caller, token_id);
		next.tokens.insert(
			token_id,
			TokenRecord {
				token_id,
				owner: Some(ctx.caller),
				verify_code: verification_id.to_string(),
				mint_timestamp: ctx.block.timestamp,
			},
		);
		next.collected = next.collected.saturating_add(ctx.value);
		(next, token_id)
	}

	fn apply_burn(&self, state: &LedgerState, ctx: &CallContext, token_id: TokenId) -> LedgerState {
		let mut next = state.clone();
		bump_nonce(&mut next, ctx.caller);
		next.holdings.remove(&ctx.caller);
		if let Some(record) = next.tokens.get_mut(&token_id) {
			record.owner = None;
		}
		next
	}

	/// Persists `next` (when a store is attached) and only then installs it.
	async fn commit(&self, state: &mut LedgerState, next: LedgerState) -> Result<(), LedgerError> {
		if let Some(store) = &self.store {
			store
				.save(&self.deployment, &next)
				.await
				.map_err(|e| LedgerError::Persistence(e.to_string()))?;
		}
		*state = next;
		Ok(())
	}

	fn reject(&self, recipient: Address, call: LedgerCall, error: LedgerError) -> LedgerError {
		tracing::warn!(recipient = %recipient, call = %call, reason = error.reason(), "Call reverted");
		self.events.publish(LedgerEvent::Rejected {
			recipient,
			call,
			reason: error.reason().to_string(),
		});
		error
	}

	/// 1 while `account` holds a token, otherwise 0.
	pub async fn balance_of(&self, account: Address) -> u64 {
		self.state.read().await.balance_of(&account)
	}

	/// Current nonce of `account`.
	pub async fn get_nonce(&self, account: Address) -> U256 {
		self.state.read().await.nonce_of(&account)
	}

	/// Same value as [`Self::get_nonce`]; both accessor names exist on chain.
	pub async fn nonces(&self, account: Address) -> U256 {
		self.get_nonce(account).await
	}

	/// Verification id recorded at mint, `""` for ids never minted.
	pub async fn get_verify_code_for_id(&self, token_id: TokenId) -> String {
		self.state
			.read()
			.await
			.tokens
			.get(&token_id)
			.map(|record| record.verify_code.clone())
			.unwrap_or_default()
	}

	/// Token held by `account`, 0 when it holds none.
	pub async fn get_id_for_account(&self, account: Address) -> TokenId {
		self.state
			.read()
			.await
			.holdings
			.get(&account)
			.copied()
			.unwrap_or(0)
	}

	/// Mint timestamp of `token_id`, 0 for ids never minted.
	pub async fn get_timestamp_for_id(&self, token_id: TokenId) -> u64 {
		self.state
			.read()
			.await
			.tokens
			.get(&token_id)
			.map(|record| record.mint_timestamp)
			.unwrap_or(0)
	}

	/// Current owner of `token_id`, `None` once burned or never minted.
	pub async fn owner_of(&self, token_id: TokenId) -> Option<Address> {
		self.state
			.read()
			.await
			.tokens
			.get(&token_id)
			.and_then(|record| record.owner)
	}

	/// Sum of all accepted mint payments.
	pub async fn collected(&self) -> U256 {
		self.state.read().await.collected
	}

	/// Copy of the full state.
	pub async fn snapshot(&self) -> LedgerState {
		self.state.read().await.clone()
	}
}

fn bump_nonce(state: &mut LedgerState, account: Address) {
	let nonce = state.nonces.entry(account).or_default();
	*nonce += U256::from(1);
}

#[async_trait]
impl NonceView for IdentityCard {
	async fn nonce_of(&self, account: Address) -> U256 {
		self.get_nonce(account).await
	}
}
