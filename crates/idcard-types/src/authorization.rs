//! Authorization message types.
//!
//! An authorization is the off-chain permission, signed by the authorizer key,
//! that lets one recipient perform exactly one mint or burn on one ledger.
//! The message binds the recipient, an expiry block, the ledger address, the
//! recipient's current nonce and the chain id. The verified shape appends an
//! opaque verification id that is stored against the minted token.

use crate::utils::PackedEncoder;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Which digest shape an authorization is built for.
///
/// The shape is chosen when the request is constructed and is never inferred
/// from the message contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationScope {
	/// `(recipient, expireBlock, contract, nonce, chainId)`.
	Basic,
	/// `(recipient, expireBlock, contract, nonce, chainId, verificationId)`.
	Verified { verification_id: String },
}

impl AuthorizationScope {
	/// Builds the scope for an optional verification id.
	///
	/// `None` selects the basic shape; `Some(id)` always selects the verified
	/// shape, even when `id` is empty.
	pub fn from_verification_id(verification_id: Option<String>) -> Self {
		match verification_id {
			Some(verification_id) => Self::Verified { verification_id },
			None => Self::Basic,
		}
	}

	/// Returns the verification id carried by this scope, if any.
	pub fn verification_id(&self) -> Option<&str> {
		match self {
			Self::Basic => None,
			Self::Verified { verification_id } => Some(verification_id),
		}
	}
}

/// The fields covered by an authorization signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
	/// Account allowed to perform the call.
	pub recipient: Address,
	/// Last block height at which the authorization is accepted.
	pub expire_block: u64,
	/// Ledger contract the authorization is bound to.
	pub subject_contract: Address,
	/// Recipient nonce at signing time.
	pub nonce: U256,
	/// Chain the ledger lives on.
	pub chain_id: u64,
	/// Digest shape.
	pub scope: AuthorizationScope,
}

impl AuthorizationMessage {
	/// Packed encoding of the message fields, in signing order.
	///
	/// Addresses take 20 bytes, integers 32 bytes big-endian, and the
	/// verification id its raw UTF-8 bytes.
	pub fn encode_packed(&self) -> Vec<u8> {
		let mut enc = PackedEncoder::new();
		enc.push_address(&self.recipient);
		enc.push_u256(U256::from(self.expire_block));
		enc.push_address(&self.subject_contract);
		enc.push_u256(self.nonce);
		enc.push_u256(U256::from(self.chain_id));
		if let AuthorizationScope::Verified { verification_id } = &self.scope {
			enc.push_str(verification_id);
		}
		enc.finish()
	}

	/// keccak256 of [`Self::encode_packed`].
	pub fn digest(&self) -> B256 {
		keccak256(self.encode_packed())
	}
}

/// An authorization signed by the authorizer, ready to submit to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
	/// 65-byte `r || s || v` signature over the personal-message hash of the digest.
	pub signature: Bytes,
	/// Expiry block embedded in the signed message.
	pub expire_block: u64,
	/// Nonce the signature was produced for.
	pub nonce: U256,
	/// Chain id embedded in the signed message.
	pub chain_id: u64,
	/// Verification id to pass along with the call (empty for the basic shape).
	pub verification_id: String,
}
