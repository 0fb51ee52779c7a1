//! Personal-message hashing and signer recovery.

use alloy_primitives::{eip191_hash_message, uint, Address, PrimitiveSignature, B256, U256};
use idcard_types::AuthorizationMessage;
use thiserror::Error;

/// Half of the secp256k1 group order. Signatures with a larger `s` are
/// malleable twins of a valid one and are refused.
const SECP256K1_HALF_ORDER: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

const SIGNATURE_LENGTH: usize = 65;

/// Errors raised while checking an authorization signature.
#[derive(Debug, Error)]
pub enum AuthError {
	/// Wrong length, zero/high `s`, or unknown recovery id.
	#[error("Malformed signature: {0}")]
	MalformedSignature(String),
	/// secp256k1 recovery failed.
	#[error("Signer recovery failed: {0}")]
	Recovery(String),
	/// The signature is valid but made by someone else.
	#[error("Signed by {recovered}, expected {expected}")]
	SignerMismatch { expected: Address, recovered: Address },
}

/// `keccak256("\x19Ethereum Signed Message:\n32" || digest)`.
pub fn personal_message_hash(digest: &B256) -> B256 {
	eip191_hash_message(digest)
}

fn parse_signature(signature: &[u8]) -> Result<PrimitiveSignature, AuthError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(AuthError::MalformedSignature(format!(
			"expected {} bytes, got {}",
			SIGNATURE_LENGTH,
			signature.len()
		)));
	}

	let r = U256::from_be_slice(&signature[..32]);
	let s = U256::from_be_slice(&signature[32..64]);
	let y_parity = match signature[64] {
		0 | 27 => false,
		1 | 28 => true,
		v => {
			return Err(AuthError::MalformedSignature(format!(
				"invalid recovery id {}",
				v
			)))
		},
	};

	if r.is_zero() || s.is_zero() {
		return Err(AuthError::MalformedSignature("zero r or s".to_string()));
	}
	if s > SECP256K1_HALF_ORDER {
		return Err(AuthError::MalformedSignature("s is in the upper half order".to_string()));
	}

	Ok(PrimitiveSignature::new(r, s, y_parity))
}

/// Recovers the address that signed `digest` as a personal message.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, AuthError> {
	let parsed = parse_signature(signature)?;
	parsed
		.recover_address_from_prehash(&personal_message_hash(digest))
		.map_err(|e| AuthError::Recovery(e.to_string()))
}

/// Checks that `signature` over `message` was made by `authorizer`.
///
/// The comparison is against the authorizer only; the message recipient
/// plays no part in it.
pub fn verify_authorization(
	message: &AuthorizationMessage,
	signature: &[u8],
	authorizer: Address,
) -> Result<(), AuthError> {
	let digest = message.digest();
	let recovered = recover_signer(&digest, signature)?;
	tracing::debug!(
		digest = %digest,
		recovered = %recovered,
		expected = %authorizer,
		"Recovered authorization signer"
	);

	if recovered != authorizer {
		return Err(AuthError::SignerMismatch {
			expected: authorizer,
			recovered,
		});
	}
	Ok(())
}
