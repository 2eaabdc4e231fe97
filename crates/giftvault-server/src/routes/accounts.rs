//! Non-card account balance endpoints (the refund target).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

/// Creates the accounts router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{user_id}/balance", get(get_account_balance))
        .with_state(state)
}

/// Response for the account balance endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalanceResponse {
    pub user_id: Uuid,
    /// Fiat balance accumulated from `refund`-mode change issuance.
    pub balance: BigDecimal,
}

/// GET /api/v1/accounts/{user_id}/balance
///
/// Returns the user's non-card account balance. Users start at zero; no
/// account record is required beforehand.
async fn get_account_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AccountBalanceResponse>, AppError> {
    let balance = state.ledger.account_balance(user_id).await?;
    Ok(Json(AccountBalanceResponse { user_id, balance }))
}
