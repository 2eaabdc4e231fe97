//! API routes for the GiftVault server.

pub mod accounts;
pub mod cards;
pub mod rewards;
pub mod wallets;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::ledger::Ledger;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

/// Creates the main API router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes(state))
}

/// Creates the v1 API routes.
fn api_v1_routes(state: AppState) -> Router {
    Router::new()
        .nest("/gift-cards", cards::router(state.clone()))
        .nest("/wallets", wallets::router(state.clone()))
        .nest("/rewards", rewards::router(state.clone()))
        .nest("/accounts", accounts::router(state))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
