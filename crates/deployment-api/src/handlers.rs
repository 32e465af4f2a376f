//! API request handlers for the deployment service

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use protocol_client::{EscrowBalance, Network, ProtocolClient};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{
    error::DeployError,
    models::{
        DeploymentRequest, DeploymentResponse, DeploymentsListResponse, LeasesQuery,
        RefreshQuery, UpdateDeploymentRequest,
    },
    orchestrator::{Orchestrator, OrchestratorSettings},
    storage::DeploymentStore,
};

/// Shared application state
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub network: Network,
}

impl AppState {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        store: Arc<dyn DeploymentStore>,
        settings: OrchestratorSettings,
        network: Network,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(client, store, settings),
            network,
        }
    }
}

/// API Error type
///
/// Serialized as `{message, error}`: `message` is stable per failure class,
/// `error` carries the underlying detail.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            status,
            message: message.into(),
            error: error.to_string(),
        }
    }

    fn invalid_request(error: impl ToString) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation failed", error)
    }

    /// Map an orchestration error, using `failure` for protocol-side errors
    fn from_deploy(err: DeployError, status: StatusCode, failure: &str) -> Self {
        let message = match &err {
            DeployError::Validation(_) => "Validation failed",
            DeployError::InsufficientBalance { .. } => "Insufficient balance in escrow",
            _ => failure,
        };
        Self::new(status, message, err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "message": self.message,
            "error": self.error,
        });

        (self.status, Json(body)).into_response()
    }
}

/// Health check
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "deployment-api",
        "network": state.network,
    }))
}

/// Escrow balance for the configured token
pub async fn balance_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EscrowBalance>, ApiError> {
    info!("Fetching escrow balance");

    let balance = state.orchestrator.escrow_balance().await.map_err(|e| {
        ApiError::from_deploy(e, StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch balance")
    })?;

    Ok(Json(balance))
}

/// Create a deployment
pub async fn create_deployment_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;
    info!("Creating deployment: {}", request.name);

    let view = state
        .orchestrator
        .create_deployment(request)
        .await
        .map_err(|e| {
            ApiError::from_deploy(e, StatusCode::BAD_REQUEST, "Failed to create deployment")
        })?;

    Ok(Json(view))
}

/// List locally stored deployment records
pub async fn list_deployments_handler(
    State(state): State<Arc<AppState>>,
) -> Json<DeploymentsListResponse> {
    info!("Listing deployment records");

    let deployments = state.orchestrator.store().list().await;
    let total = deployments.len();

    Json(DeploymentsListResponse { deployments, total })
}

/// Get a locally stored deployment record
pub async fn get_record_handler(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::invalid_request(e.body_text()))?;
    info!("Getting deployment record {}", id);

    match state.orchestrator.store().get(id).await {
        Some(deployment) => Ok(Json(DeploymentResponse { deployment })),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Deployment record not found",
            format!("No deployment record with id {}", id),
        )),
    }
}

/// Re-fetch deployment detail for a lease
pub async fn refresh_deployment_handler(
    State(state): State<Arc<AppState>>,
    Path(lease_id): Path<String>,
    query: Result<Query<RefreshQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let detail = state
        .orchestrator
        .refresh(&lease_id, query.provider_url.as_deref())
        .await
        .map_err(|e| {
            ApiError::from_deploy(e, StatusCode::BAD_REQUEST, "Failed to fetch deployment")
        })?;

    Ok(Json(detail))
}

/// Submit a modified ICL document for a lease
pub async fn update_deployment_handler(
    State(state): State<Arc<AppState>>,
    Path(lease_id): Path<String>,
    payload: Result<Json<UpdateDeploymentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let result = state
        .orchestrator
        .update(&lease_id, request)
        .await
        .map_err(|e| {
            ApiError::from_deploy(e, StatusCode::BAD_REQUEST, "Failed to update deployment")
        })?;

    Ok(Json(result))
}

/// Close the lease behind a deployment
pub async fn close_deployment_handler(
    State(state): State<Arc<AppState>>,
    Path(lease_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state.orchestrator.close(&lease_id).await.map_err(|e| {
        ApiError::from_deploy(e, StatusCode::BAD_REQUEST, "Failed to close deployment")
    })?;

    Ok(Json(result))
}

/// Page through leases by state
pub async fn list_leases_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LeasesQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let page = state.orchestrator.leases(query).await.map_err(|e| {
        ApiError::from_deploy(e, StatusCode::BAD_REQUEST, "Failed to list leases")
    })?;

    Ok(Json(page))
}
