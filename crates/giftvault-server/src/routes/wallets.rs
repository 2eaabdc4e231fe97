//! Wallet binding endpoints.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

/// Creates the wallets router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bind", post(bind_wallet))
        .with_state(state)
}

/// Request body for binding a wallet address to a user.
/// Note: In a real deployment the user id would come from authentication.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindWalletRequest {
    pub user_id: Uuid,
    pub wallet_address: String,
}

/// Response for a successful wallet bind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindWalletResponse {
    /// False if this wallet was already bound to the same user.
    pub newly_bound: bool,
    /// Engagement bonus granted on the user's first wallet connect.
    pub bonus_points: u32,
}

/// POST /api/v1/wallets/bind
///
/// Binds a wallet address to a user. A wallet held by another user is a
/// 409 conflict. The user's first successful bind grants the flat
/// engagement bonus.
async fn bind_wallet(
    State(state): State<AppState>,
    Json(request): Json<BindWalletRequest>,
) -> Result<Json<BindWalletResponse>, AppError> {
    let outcome = state
        .ledger
        .bind_wallet(request.user_id, &request.wallet_address)
        .await?;

    Ok(Json(BindWalletResponse {
        newly_bound: outcome.newly_bound,
        bonus_points: outcome.bonus_points,
    }))
}
