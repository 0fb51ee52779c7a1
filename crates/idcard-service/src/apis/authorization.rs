//! Authorization issuance endpoints.
//!
//! Issues signed authorizations for the configured ledger and keeps the
//! last one issued per recipient so clients can fetch it again.

use crate::server::AppState;
use alloy_primitives::Address;
use idcard_auth::IssueError;
use idcard_types::{
	APIError, AuthorizationRequest, AuthorizationResponse, AuthorizationScope, HealthResponse,
	SignedAuthorization, StorageKey,
};
use tracing::{info, warn};

fn recipient_id(recipient: &Address) -> String {
	recipient.to_string().to_lowercase()
}

/// Maps issuance failures onto HTTP errors.
fn issue_error(e: IssueError) -> APIError {
	match e {
		IssueError::MissingChainId => APIError::BadRequest {
			error_type: "CHAIN_ID_MISSING".to_string(),
			message: e.to_string(),
		},
		IssueError::Chain(_) => APIError::BadGateway {
			error_type: "CHAIN_UNAVAILABLE".to_string(),
			message: e.to_string(),
		},
		IssueError::Signing(_) => APIError::InternalServerError {
			error_type: "SIGNING_FAILED".to_string(),
			message: e.to_string(),
		},
	}
}

/// Issues an authorization for the requested recipient and scope.
pub async fn issue_authorization(
	state: &AppState,
	request: AuthorizationRequest,
) -> Result<AuthorizationResponse, APIError> {
	if request.recipient == Address::ZERO {
		return Err(APIError::BadRequest {
			error_type: "INVALID_RECIPIENT".to_string(),
			message: "Recipient cannot be the zero address".to_string(),
		});
	}

	let scope = AuthorizationScope::from_verification_id(request.verification_id);
	let signed = state
		.issuer
		.issue(request.recipient, scope)
		.await
		.map_err(issue_error)?;

	if let Err(e) = state
		.storage
		.store(
			StorageKey::IssuedAuthorizations,
			&recipient_id(&request.recipient),
			&signed,
		)
		.await
	{
		warn!(recipient = %request.recipient, error = %e, "Failed to record issued authorization");
	}

	Ok(signed.into())
}

/// Returns the last authorization issued for `recipient`.
pub async fn get_authorization(
	state: &AppState,
	recipient: &str,
) -> Result<AuthorizationResponse, APIError> {
	let recipient: Address = idcard_types::parse_address(recipient).map_err(|e| {
		APIError::BadRequest {
			error_type: "INVALID_RECIPIENT".to_string(),
			message: e,
		}
	})?;

	let stored: Option<SignedAuthorization> = state
		.storage
		.retrieve_optional(StorageKey::IssuedAuthorizations, &recipient_id(&recipient))
		.await
		.map_err(|e| APIError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message: e.to_string(),
		})?;

	match stored {
		Some(signed) => {
			info!(recipient = %recipient, nonce = %signed.nonce, "Returning issued authorization");
			Ok(signed.into())
		},
		None => Err(APIError::NotFound {
			error_type: "AUTHORIZATION_NOT_FOUND".to_string(),
			message: format!("No authorization issued for {}", recipient),
		}),
	}
}

/// Reports the authorizer, ledger and chain the service signs for.
pub async fn health(state: &AppState) -> Result<HealthResponse, APIError> {
	let snapshot = state
		.chain
		.snapshot()
		.await
		.map_err(|e| APIError::BadGateway {
			error_type: "CHAIN_UNAVAILABLE".to_string(),
			message: e.to_string(),
		})?;

	Ok(HealthResponse {
		status: "ok".to_string(),
		authorizer: state.authorizer,
		contract: state.issuer.contract(),
		chain_id: snapshot.chain_id,
		block_number: snapshot.block_number,
	})
}
