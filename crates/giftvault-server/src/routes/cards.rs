//! Gift card endpoints: mint, snapshot, recharge, spend, history.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use giftvault_core::{Amount, CardStatus, ChangeMode, GiftCard, SpendProof, Transaction};

use crate::error::AppError;
use crate::ledger::{MintRequest, RechargeRequest, SpendRequest};
use crate::routes::AppState;

/// Default card lifetime when the mint request does not set an expiry.
const DEFAULT_LIFETIME_DAYS: i64 = 365;

/// Creates the gift-cards router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(mint_card))
        .route("/{id}", get(get_card))
        .route("/{id}/recharge", post(recharge_card))
        .route("/{id}/spend", post(spend_card))
        .route("/{id}/transactions", get(list_transactions))
        .with_state(state)
}

/// Wire representation of a card, with its lazily derived status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: Uuid,
    pub merchant_id: Option<Uuid>,
    pub balance: Amount,
    pub original_value: Amount,
    pub is_rechargeable: bool,
    pub is_privacy_enabled: bool,
    /// Derived from balance and expiry at response time.
    pub status: CardStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardResponse {
    pub fn from_card(card: &GiftCard, now: DateTime<Utc>) -> Self {
        Self {
            id: card.id,
            merchant_id: card.merchant_id,
            balance: card.balance.clone(),
            original_value: card.original_value.clone(),
            is_rechargeable: card.is_rechargeable,
            is_privacy_enabled: card.is_privacy_enabled,
            status: card.status_at(now),
            expires_at: card.expires_at,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// Parses a decimal amount field, rejecting malformed input.
fn parse_amount(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(value)
        .map_err(|e| AppError::BadRequest(format!("invalid {field} '{value}': {e}")))
}

// ===== Mint =====

/// Request body for minting a card.
/// Note: In a real deployment the user id would come from authentication.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintCardRequest {
    /// The purchasing user.
    pub user_id: Uuid,
    /// Issuing merchant, if any (absent for peer-issued cards).
    #[serde(default)]
    pub merchant_id: Option<Uuid>,
    /// Initial fiat value.
    pub amount_fiat: String,
    /// Initial crypto-equivalent value. Defaults to zero.
    #[serde(default)]
    pub amount_crypto: Option<String>,
    /// Whether the card accepts top-ups. Immutable after mint.
    pub is_rechargeable: bool,
    /// Whether spends require a proof artifact.
    #[serde(default)]
    pub is_privacy_enabled: bool,
    /// Expiry timestamp; defaults to one year from mint.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response for a successful mint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintCardResponse {
    pub gift_card: CardResponse,
    pub reward_points: u32,
}

/// POST /api/v1/gift-cards
///
/// Mints a new gift card and accrues the purchase reward.
async fn mint_card(
    State(state): State<AppState>,
    Json(request): Json<MintCardRequest>,
) -> Result<Json<MintCardResponse>, AppError> {
    let fiat = parse_amount("amountFiat", &request.amount_fiat)?;
    let crypto = match &request.amount_crypto {
        Some(value) => parse_amount("amountCrypto", value)?,
        None => BigDecimal::from(0),
    };

    let now = Utc::now();
    let expires_at = request
        .expires_at
        .unwrap_or_else(|| now + Duration::days(DEFAULT_LIFETIME_DAYS));

    let outcome = state
        .ledger
        .mint(MintRequest {
            user_id: request.user_id,
            merchant_id: request.merchant_id,
            value: Amount::new(fiat, crypto),
            is_rechargeable: request.is_rechargeable,
            is_privacy_enabled: request.is_privacy_enabled,
            expires_at,
        })
        .await?;

    Ok(Json(MintCardResponse {
        gift_card: CardResponse::from_card(&outcome.card, now),
        reward_points: outcome.reward_points,
    }))
}

// ===== Snapshot =====

/// GET /api/v1/gift-cards/{id}
///
/// Returns a card snapshot. Expiry is evaluated on access: a card past
/// its expiry date reads as `expired` with no background timer involved.
async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state.ledger.snapshot(id).await?;
    Ok(Json(CardResponse::from_card(&card, Utc::now())))
}

// ===== Recharge =====

/// Request body for recharging a card.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeCardRequest {
    pub user_id: Uuid,
    pub amount_fiat: String,
    /// Crypto-equivalent of the top-up at the caller's conversion rate.
    /// Defaults to zero; the ledger never recomputes one denomination
    /// from the other.
    #[serde(default)]
    pub amount_crypto: Option<String>,
    /// Client-supplied key making retries safe.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Response for a successful recharge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeCardResponse {
    pub gift_card: CardResponse,
    pub reward_points: u32,
}

/// POST /api/v1/gift-cards/{id}/recharge
///
/// Adds value to a rechargeable card. 404 if the card does not exist,
/// 400 with a reason code if the card is expired, not rechargeable, or
/// the amount is not positive.
async fn recharge_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RechargeCardRequest>,
) -> Result<Json<RechargeCardResponse>, AppError> {
    let fiat = parse_amount("amountFiat", &request.amount_fiat)?;
    let crypto = match &request.amount_crypto {
        Some(value) => parse_amount("amountCrypto", value)?,
        None => BigDecimal::from(0),
    };

    let outcome = state
        .ledger
        .recharge(
            id,
            RechargeRequest {
                user_id: request.user_id,
                amount: Amount::new(fiat, crypto),
                idempotency_key: request.idempotency_key,
            },
        )
        .await?;

    Ok(Json(RechargeCardResponse {
        gift_card: CardResponse::from_card(&outcome.card, Utc::now()),
        reward_points: outcome.reward_points,
    }))
}

// ===== Spend =====

/// Request body for spending from a card.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCardRequest {
    pub user_id: Uuid,
    /// Fiat amount to spend.
    pub amount: String,
    /// Where leftover value goes: `keep`, `new_card`, or `refund`.
    pub change_handling: ChangeMode,
    /// Proof artifact, required when the card is privacy-enabled.
    #[serde(default)]
    pub proof: Option<SpendProof>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Response for a successful spend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCardResponse {
    pub gift_card: CardResponse,
    /// Leftover value before change handling was applied.
    pub change: Amount,
    /// The change card, when `changeHandling` was `new_card`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_card_id: Option<Uuid>,
    /// Fiat credited to the account balance, when `changeHandling` was
    /// `refund`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_to_account: Option<BigDecimal>,
}

/// POST /api/v1/gift-cards/{id}/spend
///
/// Debits a card, issuing change per the requested handling mode. A spend
/// exactly equal to the balance empties the card and is not an error.
async fn spend_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SpendCardRequest>,
) -> Result<Json<SpendCardResponse>, AppError> {
    let amount = parse_amount("amount", &request.amount)?;

    let outcome = state
        .ledger
        .spend(
            id,
            SpendRequest {
                user_id: request.user_id,
                amount_fiat: amount,
                change_handling: request.change_handling,
                proof: request.proof,
                idempotency_key: request.idempotency_key,
            },
        )
        .await?;

    Ok(Json(SpendCardResponse {
        gift_card: CardResponse::from_card(&outcome.card, Utc::now()),
        change: outcome.change,
        new_card_id: outcome.new_card_id,
        refunded_to_account: outcome.refunded_to_account,
    }))
}

// ===== History =====

/// Response for the transaction history of a card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub gift_card_id: Uuid,
    pub transactions: Vec<Transaction>,
}

/// GET /api/v1/gift-cards/{id}/transactions
///
/// Returns the card's append-only ledger history in append order.
async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let transactions = state.ledger.transactions(id).await?;
    Ok(Json(TransactionsResponse {
        gift_card_id: id,
        transactions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("amountFiat", "12.34").is_ok());
        assert!(parse_amount("amountFiat", "").is_err());
        assert!(parse_amount("amountFiat", "12,34").is_err());
        assert!(parse_amount("amountFiat", "abc").is_err());
    }

    #[test]
    fn test_spend_request_deserializes_change_modes() {
        let body = serde_json::json!({
            "userId": Uuid::new_v4(),
            "amount": "10.00",
            "changeHandling": "new_card"
        });
        let request: SpendCardRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.change_handling, ChangeMode::NewCard);
        assert!(request.proof.is_none());
    }
}
