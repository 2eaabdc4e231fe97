//! Reward balance endpoints.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use giftvault_core::Reward;

use crate::error::AppError;
use crate::routes::AppState;

/// Creates the rewards router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/balance", get(get_rewards_balance))
        .with_state(state)
}

/// Query parameters for the rewards balance endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsBalanceQuery {
    pub user_id: Uuid,
}

/// Response for the rewards balance endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsBalanceResponse {
    pub user_id: Uuid,
    /// Cumulative points across all grants.
    pub total_points: u64,
    pub rewards: Vec<Reward>,
}

/// GET /api/v1/rewards/balance?userId=...
///
/// Returns the user's cumulative loyalty points and the grants behind
/// them.
async fn get_rewards_balance(
    State(state): State<AppState>,
    Query(query): Query<RewardsBalanceQuery>,
) -> Result<Json<RewardsBalanceResponse>, AppError> {
    let (total_points, rewards) = state.ledger.rewards(query.user_id).await?;
    Ok(Json(RewardsBalanceResponse {
        user_id: query.user_id,
        total_points,
        rewards,
    }))
}
