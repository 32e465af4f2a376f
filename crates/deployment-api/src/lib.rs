//! Deployment API
//!
//! HTTP service for buying escrow-backed compute on a decentralized provider
//! network. A user submits an ICL document; the service checks the escrow
//! balance, submits the document through the protocol client, records the
//! attempt locally and returns one JSON view of the deployment, its
//! transaction and whatever lease detail could be gathered.
//!
//! ## Endpoints
//!
//! - `GET /api/balance` - Escrow balance for the configured token
//! - `POST /api/deployments` - Create a deployment
//! - `GET /api/deployments` - List local deployment records
//! - `GET /api/deployments/{lease_id}` - Refresh deployment detail
//! - `PUT /api/deployments/{lease_id}` - Submit an updated ICL document
//! - `POST /api/deployments/{lease_id}/close` - Close the lease
//! - `GET /api/records/{id}` - Get one local deployment record
//! - `GET /api/leases` - List leases by state
//! - `GET /health` - Health check

pub mod balance;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod sanitize;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use balance::BalanceGate;
pub use config::Config;
pub use error::DeployError;
pub use handlers::AppState;
pub use models::{DeploymentRecord, DeploymentRequest, Enrichment, EnrichmentDetails};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use sanitize::sanitize;
pub use storage::{DeploymentStore, MemoryStore};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/balance", get(handlers::balance_handler))
        .route(
            "/api/deployments",
            post(handlers::create_deployment_handler).get(handlers::list_deployments_handler),
        )
        .route(
            "/api/deployments/{lease_id}",
            get(handlers::refresh_deployment_handler).put(handlers::update_deployment_handler),
        )
        .route(
            "/api/deployments/{lease_id}/close",
            post(handlers::close_deployment_handler),
        )
        .route("/api/records/{id}", get(handlers::get_record_handler))
        .route("/api/leases", get(handlers::list_leases_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
