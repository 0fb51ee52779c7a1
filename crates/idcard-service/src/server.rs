//! HTTP server for the IdentityCard signing API.

use crate::factory_registry::ServiceContext;
use alloy_primitives::Address;
use axum::{
	extract::{Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use idcard_auth::AuthorizationIssuer;
use idcard_chain::ChainService;
use idcard_config::ApiConfig;
use idcard_storage::StorageService;
use idcard_types::{APIError, AuthorizationRequest, AuthorizationResponse, HealthResponse};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub issuer: Arc<AuthorizationIssuer>,
	pub chain: Arc<ChainService>,
	/// Records the last authorization issued per recipient.
	pub storage: Arc<StorageService>,
	pub authorizer: Address,
}

impl From<&ServiceContext> for AppState {
	fn from(context: &ServiceContext) -> Self {
		Self {
			issuer: context.issuer.clone(),
			chain: context.chain.clone(),
			storage: context.storage.clone(),
			authorizer: context.authorizer,
		}
	}
}

/// Builds the API router under the `/api` base path.
pub fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/health", get(handle_health))
				.route("/authorizations", post(handle_issue))
				.route("/authorizations/{recipient}", get(handle_get_authorization)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Starts the HTTP server and serves until it fails.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("IdentityCard signing API starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/authorizations requests.
async fn handle_issue(
	State(state): State<AppState>,
	Json(request): Json<AuthorizationRequest>,
) -> Result<Json<AuthorizationResponse>, APIError> {
	match crate::apis::authorization::issue_authorization(&state, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Authorization request failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/authorizations/{recipient} requests.
async fn handle_get_authorization(
	Path(recipient): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<AuthorizationResponse>, APIError> {
	crate::apis::authorization::get_authorization(&state, &recipient)
		.await
		.map(Json)
}

/// Handles GET /api/health requests.
async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, APIError> {
	crate::apis::authorization::health(&state).await.map(Json)
}
