//! API types for the IdentityCard signing service.
//!
//! Request and response bodies for the HTTP endpoints, plus the structured
//! error type that maps failures onto HTTP status codes.

use crate::SignedAuthorization;
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `POST /api/authorizations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	/// Account that will submit the mint or burn.
	pub recipient: Address,
	/// Optional verification id; selects the verified digest shape when present.
	#[serde(default)]
	pub verification_id: Option<String>,
}

/// Response body for `POST /api/authorizations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	pub signature: Bytes,
	pub expire_block: u64,
	pub nonce: U256,
	pub chain_id: u64,
	pub verification_id: String,
}

impl From<SignedAuthorization> for AuthorizationResponse {
	fn from(auth: SignedAuthorization) -> Self {
		Self {
			signature: auth.signature,
			expire_block: auth.expire_block,
			nonce: auth.nonce,
			chain_id: auth.chain_id,
			verification_id: auth.verification_id,
		}
	}
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub authorizer: Address,
	pub contract: Address,
	pub chain_id: u64,
	pub block_number: u64,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Invalid input (400)
	BadRequest { error_type: String, message: String },
	/// No record for the requested resource (404)
	NotFound { error_type: String, message: String },
	/// Upstream chain endpoint failed (502)
	BadGateway { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::BadGateway { .. } => 502,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::BadGateway {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
