//! End-to-end scenarios: issuer -> devnet -> ledger.
//!
//! Accounts follow the default development mnemonic: #0 submits calls, #1
//! is a key the ledger does not trust and #2 is the authorizer.

use alloy_primitives::{address, Address, U256};
use async_trait::async_trait;
use idcard_account::{implementations::local::create_account, AccountService};
use idcard_auth::AuthorizationIssuer;
use idcard_chain::{implementations::local::LocalChain, ChainService};
use idcard_ledger::{CallContext, Deployment, IdentityCard, LedgerBuilder, LedgerError};
use idcard_storage::{
	implementations::{file::FileStorage, memory::MemoryStorage},
	StorageError, StorageInterface, StorageService,
};
use idcard_types::{
	AuthorizationScope, ConfigSchema, LedgerCall, LedgerEvent, Schema, SignedAuthorization,
	TokenId, ValidationError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const CALLER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const OTHER_CALLER: Address = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");
const AUTHORIZER: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
const CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
const AUTHORIZER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
const WRONG_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const PRICE: u128 = 10_000_000_000_000_000;

fn account(key: &str) -> Arc<AccountService> {
	let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", key)).unwrap();
	Arc::new(AccountService::new(create_account(&config).unwrap()))
}

fn deployment() -> Deployment {
	Deployment {
		address: CONTRACT,
		chain_id: 31337,
		authorizer: AUTHORIZER,
		mint_price: U256::from(PRICE),
	}
}

struct Harness {
	chain: Arc<ChainService>,
	card: Arc<IdentityCard>,
	good: AuthorizationIssuer,
	bad: AuthorizationIssuer,
}

/// Signatures over one message from the authorizer and from the wrong key.
struct Sigs {
	correct: SignedAuthorization,
	wrong: SignedAuthorization,
}

impl Harness {
	async fn with_card(card: IdentityCard) -> Self {
		let chain = Arc::new(ChainService::new(Box::new(LocalChain::new(31337, 1_700_000_000, 1))));
		let card = Arc::new(card);
		chain.deploy(CONTRACT, card.clone()).await.unwrap();

		Self {
			good: AuthorizationIssuer::new(chain.clone(), account(AUTHORIZER_KEY), CONTRACT, 20),
			bad: AuthorizationIssuer::new(chain.clone(), account(WRONG_KEY), CONTRACT, 20),
			chain,
			card,
		}
	}

	async fn new() -> Self {
		Self::with_card(IdentityCard::deploy(deployment())).await
	}

	async fn make_sig(&self, sender: Address) -> Sigs {
		self.make_sig_with(sender, AuthorizationScope::Basic).await
	}

	async fn make_sig_with(&self, sender: Address, scope: AuthorizationScope) -> Sigs {
		let message = self.good.prepare(sender, scope).await.unwrap();
		Sigs {
			correct: self.good.sign(&message).await.unwrap(),
			wrong: self.bad.sign(&message).await.unwrap(),
		}
	}

	async fn ctx(&self, caller: Address, value: u128) -> CallContext {
		CallContext {
			caller,
			value: U256::from(value),
			block: self.chain.next_block().await.unwrap(),
		}
	}

	async fn mint(&self, auth: &SignedAuthorization) -> Result<TokenId, LedgerError> {
		self.mint_paying(auth, PRICE).await
	}

	async fn mint_paying(&self, auth: &SignedAuthorization, value: u128) -> Result<TokenId, LedgerError> {
		let ctx = self.ctx(CALLER, value).await;
		self.card
			.mint(ctx, auth.expire_block, &auth.signature, &auth.verification_id)
			.await
	}

	async fn burn(&self, auth: &SignedAuthorization) -> Result<TokenId, LedgerError> {
		let ctx = self.ctx(CALLER, 0).await;
		self.card
			.burn(ctx, auth.expire_block, &auth.signature, &auth.verification_id)
			.await
	}
}

#[tokio::test]
async fn mints_with_verification_id() {
	let h = Harness::new().await;
	let sigs = h
		.make_sig_with(
			CALLER,
			AuthorizationScope::Verified {
				verification_id: "verification_AbC".into(),
			},
		)
		.await;

	h.mint(&sigs.correct).await.unwrap();
	assert_eq!(h.card.balance_of(CALLER).await, 1);
	assert_eq!(h.card.get_verify_code_for_id(1).await, "verification_AbC");
}

#[tokio::test]
async fn signature_lifecycle() {
	let h = Harness::new().await;

	// sig 1: wrong signer cannot mint.
	let sig_1 = h.make_sig(CALLER).await;
	assert_eq!(h.card.balance_of(CALLER).await, 0);
	assert_eq!(h.mint(&sig_1.wrong).await, Err(LedgerError::InvalidSigner));
	assert_eq!(h.card.balance_of(CALLER).await, 0);

	// sig 2: authorizer signature mints.
	h.mint(&sig_1.correct).await.unwrap();
	assert_eq!(h.card.balance_of(CALLER).await, 1);

	// sig 3: the same signature is dead once the nonce moved.
	assert_eq!(h.mint(&sig_1.correct).await, Err(LedgerError::InvalidSigner));

	// sig 4: a fresh signature still cannot mint a second card.
	let second = h.make_sig(CALLER).await;
	let err = h.mint(&second.correct).await.unwrap_err();
	assert!(err.is_balance_class());
	assert!(err.reason().contains("Balance"));
	assert_eq!(h.card.balance_of(CALLER).await, 1);

	// sig 5: wrong signer cannot burn.
	let sig_2 = h.make_sig(CALLER).await;
	assert_eq!(h.burn(&sig_2.wrong).await, Err(LedgerError::InvalidSigner));

	// sig 6: authorizer signature burns.
	h.burn(&sig_2.correct).await.unwrap();
	assert_eq!(h.card.balance_of(CALLER).await, 0);

	// sig 7: mint again.
	let sig_3 = h.make_sig(CALLER).await;
	h.mint(&sig_3.correct).await.unwrap();
	assert_eq!(h.card.balance_of(CALLER).await, 1);

	// sig 8: replaying the mint signature as a burn fails on the nonce.
	assert_eq!(h.burn(&sig_3.correct).await, Err(LedgerError::InvalidSigner));

	// sig 9: fresh signature burns.
	assert_eq!(h.card.balance_of(CALLER).await, 1);
	let sig_4 = h.make_sig(CALLER).await;
	h.burn(&sig_4.correct).await.unwrap();
	assert_eq!(h.card.balance_of(CALLER).await, 0);

	// sig 10: nothing left to burn.
	let sig_5 = h.make_sig(CALLER).await;
	let err = h.burn(&sig_5.correct).await.unwrap_err();
	assert!(err.is_balance_class());
	assert!(err.reason().contains("balance"));

	// Successful calls: mint, burn, mint, burn.
	assert_eq!(h.card.get_nonce(CALLER).await, U256::from(4));
	assert_eq!(h.card.collected().await, U256::from(2 * PRICE));
}

#[tokio::test]
async fn saves_timestamps_and_verify_codes() {
	let h = Harness::new().await;
	let sigs = h.make_sig(CALLER).await;
	assert_eq!(h.card.get_verify_code_for_id(1).await, "");

	let ctx = h.ctx(CALLER, PRICE).await;
	h.card
		.mint(
			ctx,
			sigs.correct.expire_block,
			&sigs.correct.signature,
			&sigs.correct.verification_id,
		)
		.await
		.unwrap();

	assert_eq!(h.card.get_id_for_account(CALLER).await, 1);
	assert_eq!(h.card.get_verify_code_for_id(1).await, "");
	assert_eq!(h.card.get_timestamp_for_id(1).await, ctx.block.timestamp);
	assert_eq!(h.chain.block_number().await.unwrap(), ctx.block.number);
}

#[tokio::test]
async fn authorization_expires() {
	let h = Harness::new().await;
	let head = h.chain.block_number().await.unwrap();
	let sigs = h.make_sig(CALLER).await;
	assert_eq!(sigs.correct.expire_block, head + 20);

	// The next transaction lands in block head + 21.
	h.chain.mine(20).await.unwrap();
	assert_eq!(h.mint(&sigs.correct).await, Err(LedgerError::Expired));
	assert_eq!(h.card.get_nonce(CALLER).await, U256::ZERO);
}

#[tokio::test]
async fn authorization_valid_through_expire_block() {
	let h = Harness::new().await;
	let sigs = h.make_sig(CALLER).await;

	// The next transaction lands exactly in the expiry block.
	h.chain.mine(19).await.unwrap();
	h.mint(&sigs.correct).await.unwrap();
}

#[tokio::test]
async fn payment_below_price_is_refused() {
	let h = Harness::new().await;
	let sigs = h.make_sig(CALLER).await;

	assert_eq!(
		h.mint_paying(&sigs.correct, PRICE - 1).await,
		Err(LedgerError::InsufficientPayment)
	);
	assert_eq!(h.card.balance_of(CALLER).await, 0);

	// Overpaying is accepted and the whole value is kept.
	h.mint_paying(&sigs.correct, PRICE * 2).await.unwrap();
	assert_eq!(h.card.collected().await, U256::from(PRICE * 2));
}

#[tokio::test]
async fn authorization_is_bound_to_recipient() {
	let h = Harness::new().await;
	let sigs = h.make_sig(CALLER).await;

	let ctx = h.ctx(OTHER_CALLER, PRICE).await;
	assert_eq!(
		h.card
			.mint(ctx, sigs.correct.expire_block, &sigs.correct.signature, "")
			.await,
		Err(LedgerError::InvalidSigner)
	);
}

#[tokio::test]
async fn authorization_is_bound_to_contract_and_chain() {
	let h = Harness::new().await;
	let sigs = h.make_sig(CALLER).await;

	let elsewhere = IdentityCard::deploy(Deployment {
		address: address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
		..deployment()
	});
	let other_chain = IdentityCard::deploy(Deployment {
		chain_id: 1,
		..deployment()
	});

	for card in [&elsewhere, &other_chain] {
		let ctx = h.ctx(CALLER, PRICE).await;
		assert_eq!(
			card.mint(ctx, sigs.correct.expire_block, &sigs.correct.signature, "")
				.await,
			Err(LedgerError::InvalidSigner)
		);
	}
}

#[tokio::test]
async fn concurrent_authorizations_race_on_nonce() {
	let h = Harness::new().await;
	let first = h.make_sig(CALLER).await;
	let second = h.make_sig(CALLER).await;

	h.mint(&first.correct).await.unwrap();

	// Issued for the same nonce; the first inclusion invalidated it.
	let sig_burn = second.correct;
	assert_eq!(h.burn(&sig_burn).await, Err(LedgerError::InvalidSigner));
}

#[tokio::test]
async fn events_follow_state_changes() {
	let h = Harness::new().await;
	let mut rx = h.card.event_bus().subscribe();

	let sigs = h.make_sig(CALLER).await;
	h.mint(&sigs.correct).await.unwrap();
	let _ = h.mint(&sigs.correct).await;

	match rx.recv().await.unwrap() {
		LedgerEvent::Minted {
			recipient,
			token_id,
			nonce,
			..
		} => {
			assert_eq!(recipient, CALLER);
			assert_eq!(token_id, 1);
			assert_eq!(nonce, U256::from(1));
		},
		other => panic!("unexpected event {:?}", other),
	}
	match rx.recv().await.unwrap() {
		LedgerEvent::Rejected { reason, .. } => assert_eq!(reason, "Invalid signer"),
		other => panic!("unexpected event {:?}", other),
	}
}

#[tokio::test]
async fn persisted_ledger_answers_same_reads() {
	let dir = tempfile::TempDir::new().unwrap();
	let storage = || {
		Arc::new(StorageService::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
		))))
	};

	let card = LedgerBuilder::new(deployment())
		.with_storage(storage())
		.build()
		.await
		.unwrap();
	let h = Harness::with_card(card).await;
	let sigs = h
		.make_sig_with(
			CALLER,
			AuthorizationScope::Verified {
				verification_id: "kyc-42".into(),
			},
		)
		.await;
	h.mint(&sigs.correct).await.unwrap();
	let before = h.card.snapshot().await;

	let restored = LedgerBuilder::new(deployment())
		.with_storage(storage())
		.build()
		.await
		.unwrap();
	assert_eq!(restored.snapshot().await, before);
	assert_eq!(restored.balance_of(CALLER).await, 1);
	assert_eq!(restored.get_nonce(CALLER).await, U256::from(1));
	assert_eq!(restored.get_verify_code_for_id(1).await, "kyc-42");
	assert_eq!(
		restored.get_timestamp_for_id(1).await,
		h.card.get_timestamp_for_id(1).await
	);

	// The used signature stays dead after the restart.
	let ctx = h.ctx(CALLER, PRICE).await;
	assert_eq!(
		restored
			.mint(
				ctx,
				sigs.correct.expire_block,
				&sigs.correct.signature,
				&sigs.correct.verification_id
			)
			.await,
		Err(LedgerError::InvalidSigner)
	);
}

/// Memory storage whose writes fail while `failing` is set.
struct FlakyStorage {
	inner: MemoryStorage,
	failing: Arc<AtomicBool>,
}

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(StorageError::Backend("disk full".into()));
		}
		self.inner.set_bytes(key, value).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}
}

#[tokio::test]
async fn failed_save_reverts_and_is_reported() {
	let failing = Arc::new(AtomicBool::new(false));
	let storage = Arc::new(StorageService::new(Box::new(FlakyStorage {
		inner: MemoryStorage::new(),
		failing: failing.clone(),
	})));
	let card = LedgerBuilder::new(deployment())
		.with_storage(storage)
		.build()
		.await
		.unwrap();
	let h = Harness::with_card(card).await;
	let mut rx = h.card.event_bus().subscribe();

	// Mint while the backend refuses writes.
	let mint_sigs = h.make_sig(CALLER).await;
	failing.store(true, Ordering::SeqCst);
	let err = h.mint(&mint_sigs.correct).await.unwrap_err();
	assert!(matches!(err, LedgerError::Persistence(_)));
	assert_eq!(err.reason(), "Persistence failed");
	assert_eq!(h.card.get_nonce(CALLER).await, U256::ZERO);
	assert_eq!(h.card.balance_of(CALLER).await, 0);
	assert_eq!(h.card.collected().await, U256::ZERO);
	match rx.recv().await.unwrap() {
		LedgerEvent::Rejected {
			recipient,
			call,
			reason,
		} => {
			assert_eq!(recipient, CALLER);
			assert_eq!(call, LedgerCall::Mint);
			assert_eq!(reason, "Persistence failed");
		},
		other => panic!("unexpected event {:?}", other),
	}

	// The nonce did not move, so the same signature still works.
	failing.store(false, Ordering::SeqCst);
	assert_eq!(h.mint(&mint_sigs.correct).await, Ok(1));
	assert!(matches!(rx.recv().await.unwrap(), LedgerEvent::Minted { .. }));

	// Burn hits the same path.
	let burn_sigs = h.make_sig(CALLER).await;
	failing.store(true, Ordering::SeqCst);
	assert!(matches!(
		h.burn(&burn_sigs.correct).await,
		Err(LedgerError::Persistence(_))
	));
	assert_eq!(h.card.get_nonce(CALLER).await, U256::from(1));
	assert_eq!(h.card.balance_of(CALLER).await, 1);
	match rx.recv().await.unwrap() {
		LedgerEvent::Rejected { call, reason, .. } => {
			assert_eq!(call, LedgerCall::Burn);
			assert_eq!(reason, "Persistence failed");
		},
		other => panic!("unexpected event {:?}", other),
	}
}
