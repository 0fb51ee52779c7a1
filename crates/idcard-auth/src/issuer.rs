//! Client-side issuance of authorizations.
//!
//! Issuing reads the recipient's nonce from the ledger, then the chain id,
//! then the current block number, and only then builds and signs the
//! digest. The signature is valid until `block + expiry_window` and only
//! for the nonce read here: once any mint or burn for the recipient lands,
//! outstanding authorizations stop verifying.

use alloy_primitives::Address;
use idcard_account::AccountService;
use idcard_chain::ChainService;
use idcard_types::{AuthorizationMessage, AuthorizationScope, SignedAuthorization};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while issuing an authorization.
#[derive(Debug, Error)]
pub enum IssueError {
	/// The chain reported id 0, so there is nothing to bind the signature to.
	#[error("chain arg missing")]
	MissingChainId,
	/// Reading nonce, chain id or block number failed.
	#[error("Chain read failed: {0}")]
	Chain(String),
	/// The account service could not sign.
	#[error("Signing failed: {0}")]
	Signing(String),
}

/// Issues signed authorizations for one ledger.
pub struct AuthorizationIssuer {
	chain: Arc<ChainService>,
	account: Arc<AccountService>,
	contract: Address,
	expiry_window: u64,
}

impl AuthorizationIssuer {
	pub fn new(
		chain: Arc<ChainService>,
		account: Arc<AccountService>,
		contract: Address,
		expiry_window: u64,
	) -> Self {
		Self {
			chain,
			account,
			contract,
			expiry_window,
		}
	}

	/// Ledger address authorizations are bound to.
	pub fn contract(&self) -> Address {
		self.contract
	}

	/// Reads chain state and builds the message a signature must cover.
	pub async fn prepare(
		&self,
		recipient: Address,
		scope: AuthorizationScope,
	) -> Result<AuthorizationMessage, IssueError> {
		let nonce = self
			.chain
			.nonce_of(self.contract, recipient)
			.await
			.map_err(|e| IssueError::Chain(e.to_string()))?;
		let chain_id = self
			.chain
			.chain_id()
			.await
			.map_err(|e| IssueError::Chain(e.to_string()))?;
		if chain_id == 0 {
			return Err(IssueError::MissingChainId);
		}
		let block_number = self
			.chain
			.block_number()
			.await
			.map_err(|e| IssueError::Chain(e.to_string()))?;

		Ok(AuthorizationMessage {
			recipient,
			expire_block: block_number.saturating_add(self.expiry_window),
			subject_contract: self.contract,
			nonce,
			chain_id,
			scope,
		})
	}

	/// Signs an already prepared message with the issuer's account.
	pub async fn sign(
		&self,
		message: &AuthorizationMessage,
	) -> Result<SignedAuthorization, IssueError> {
		let digest = message.digest();
		let signature = self
			.account
			.sign_message(digest.as_slice())
			.await
			.map_err(|e| IssueError::Signing(e.to_string()))?;

		tracing::info!(
			recipient = %message.recipient,
			nonce = %message.nonce,
			expire_block = message.expire_block,
			chain_id = message.chain_id,
			"Issued authorization"
		);

		Ok(SignedAuthorization {
			signature,
			expire_block: message.expire_block,
			nonce: message.nonce,
			chain_id: message.chain_id,
			verification_id: message
				.scope
				.verification_id()
				.unwrap_or_default()
				.to_string(),
		})
	}

	/// Prepares and signs an authorization for `recipient`.
	pub async fn issue(
		&self,
		recipient: Address,
		scope: AuthorizationScope,
	) -> Result<SignedAuthorization, IssueError> {
		let message = self.prepare(recipient, scope).await?;
		self.sign(&message).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::verify_authorization;
	use alloy_primitives::{address, U256};
	use async_trait::async_trait;
	use idcard_account::implementations::local::create_account;
	use idcard_chain::implementations::local::LocalChain;
	use idcard_chain::{ChainError, ChainInterface, NonceView};
	use idcard_types::ConfigSchema;
	use tokio::sync::Mutex;

	const AUTHORIZER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
	const AUTHORIZER: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
	const CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
	const RECIPIENT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	struct FixedNonce(u64);

	#[async_trait]
	impl NonceView for FixedNonce {
		async fn nonce_of(&self, _account: Address) -> U256 {
			U256::from(self.0)
		}
	}

	fn account() -> Arc<AccountService> {
		let config: toml::Value =
			toml::from_str(&format!("private_key = \"{}\"", AUTHORIZER_KEY)).unwrap();
		Arc::new(AccountService::new(create_account(&config).unwrap()))
	}

	async fn devnet(chain_id: u64, nonce: u64) -> Arc<ChainService> {
		let chain = LocalChain::new(chain_id, 1_000, 1);
		chain.deploy(CONTRACT, Arc::new(FixedNonce(nonce))).await.unwrap();
		chain.mine(5).await.unwrap();
		Arc::new(ChainService::new(Box::new(chain)))
	}

	#[tokio::test]
	async fn test_issue_basic() {
		let issuer = AuthorizationIssuer::new(devnet(31337, 4).await, account(), CONTRACT, 20);
		let signed = issuer
			.issue(RECIPIENT, AuthorizationScope::Basic)
			.await
			.unwrap();

		assert_eq!(signed.expire_block, 25);
		assert_eq!(signed.nonce, U256::from(4));
		assert_eq!(signed.chain_id, 31337);
		assert_eq!(signed.verification_id, "");

		let message = AuthorizationMessage {
			recipient: RECIPIENT,
			expire_block: 25,
			subject_contract: CONTRACT,
			nonce: U256::from(4),
			chain_id: 31337,
			scope: AuthorizationScope::Basic,
		};
		assert!(verify_authorization(&message, &signed.signature, AUTHORIZER).is_ok());
	}

	#[tokio::test]
	async fn test_issue_verified_carries_id() {
		let issuer = AuthorizationIssuer::new(devnet(31337, 0).await, account(), CONTRACT, 20);
		let scope = AuthorizationScope::Verified {
			verification_id: "verification_AbC".to_string(),
		};
		let message = issuer.prepare(RECIPIENT, scope).await.unwrap();
		let signed = issuer.sign(&message).await.unwrap();

		assert_eq!(signed.verification_id, "verification_AbC");
		assert!(verify_authorization(&message, &signed.signature, AUTHORIZER).is_ok());

		let basic = AuthorizationMessage {
			scope: AuthorizationScope::Basic,
			..message
		};
		assert!(verify_authorization(&basic, &signed.signature, AUTHORIZER).is_err());
	}

	#[tokio::test]
	async fn test_zero_chain_id_is_rejected() {
		let issuer = AuthorizationIssuer::new(devnet(0, 0).await, account(), CONTRACT, 20);
		let err = issuer
			.issue(RECIPIENT, AuthorizationScope::Basic)
			.await
			.unwrap_err();
		assert!(matches!(err, IssueError::MissingChainId));
		assert_eq!(err.to_string(), "chain arg missing");
	}

	#[tokio::test]
	async fn test_undeployed_contract_is_chain_error() {
		let chain = Arc::new(ChainService::new(Box::new(LocalChain::new(31337, 0, 1))));
		let issuer = AuthorizationIssuer::new(chain, account(), CONTRACT, 20);
		assert!(matches!(
			issuer.issue(RECIPIENT, AuthorizationScope::Basic).await,
			Err(IssueError::Chain(_))
		));
	}

	/// Records the order in which chain reads happen.
	struct RecordingChain {
		calls: Arc<Mutex<Vec<&'static str>>>,
	}

	#[async_trait]
	impl ChainInterface for RecordingChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			unimplemented!()
		}

		async fn chain_id(&self) -> Result<u64, ChainError> {
			self.calls.lock().await.push("chain_id");
			Ok(1)
		}

		async fn block_number(&self) -> Result<u64, ChainError> {
			self.calls.lock().await.push("block_number");
			Ok(100)
		}

		async fn nonce_of(&self, _contract: Address, _account: Address) -> Result<U256, ChainError> {
			self.calls.lock().await.push("nonce");
			Ok(U256::ZERO)
		}
	}

	#[tokio::test]
	async fn test_reads_nonce_then_chain_then_block() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let chain = Arc::new(ChainService::new(Box::new(RecordingChain {
			calls: calls.clone(),
		})));
		let issuer = AuthorizationIssuer::new(chain, account(), CONTRACT, 7);

		let signed = issuer
			.issue(RECIPIENT, AuthorizationScope::Basic)
			.await
			.unwrap();
		assert_eq!(signed.expire_block, 107);
		assert_eq!(*calls.lock().await, vec!["nonce", "chain_id", "block_number"]);
	}
}
