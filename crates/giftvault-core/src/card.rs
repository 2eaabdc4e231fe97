//! Gift card entity and lifecycle status derivation.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, PolicyReason};
use crate::money::Amount;

/// Lifecycle states of a gift card.
///
/// Status is never stored: it is a pure function of the card's balance,
/// its expiry date, and the current time, evaluated lazily on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Has balance and has not expired.
    Active,
    /// Fiat balance is exactly zero; can return to `active` only via a
    /// recharge on a rechargeable card.
    Empty,
    /// Past the expiry date. Terminal, regardless of balance.
    Expired,
}

/// Derives a card's status from its balance, expiry, and the current time.
///
/// Expiry dominates: a card past its expiry date is `expired` even if it
/// still carries balance.
pub fn derive_status(balance: &Amount, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> CardStatus {
    if now > expires_at {
        CardStatus::Expired
    } else if balance.is_fiat_zero() {
        CardStatus::Empty
    } else {
        CardStatus::Active
    }
}

/// A discrete, non-fungible store-credit token.
///
/// Mutated only through recharge, spend, and change-issuance operations;
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftCard {
    /// Unique identifier, immutable.
    pub id: Uuid,
    /// Owning merchant, if merchant-issued (None for peer-issued cards).
    pub merchant_id: Option<Uuid>,
    /// Current balance in both denominations.
    pub balance: Amount,
    /// Balance at mint time, immutable.
    pub original_value: Amount,
    /// Whether the card accepts top-ups. Set at mint, immutable.
    pub is_rechargeable: bool,
    /// Whether spend operations require a verified proof artifact.
    pub is_privacy_enabled: bool,
    /// Cards past this instant are expired regardless of balance.
    pub expires_at: DateTime<Utc>,
    /// When this card was minted.
    pub created_at: DateTime<Utc>,
    /// When this card was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl GiftCard {
    /// The card's status as of `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> CardStatus {
        derive_status(&self.balance, self.expires_at, now)
    }

    /// Returns true if the card is past its expiry date as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == CardStatus::Expired
    }
}

/// Data required to mint a new gift card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGiftCard {
    pub merchant_id: Option<Uuid>,
    pub value: Amount,
    pub is_rechargeable: bool,
    pub is_privacy_enabled: bool,
    pub expires_at: DateTime<Utc>,
}

impl NewGiftCard {
    /// Mints the card, validating the initial state.
    ///
    /// A zero or negative initial fiat balance is rejected with
    /// `InvalidInitialBalance`; a card is born `active` or not at all.
    pub fn mint(self, now: DateTime<Utc>) -> Result<GiftCard, DomainError> {
        if self.value.fiat <= BigDecimal::from(0) {
            return Err(DomainError::policy(
                PolicyReason::InvalidInitialBalance,
                format!("initial fiat balance must be positive, got {}", self.value.fiat),
            ));
        }
        if self.value.crypto < BigDecimal::from(0) {
            return Err(DomainError::Validation(
                "initial crypto balance must not be negative".to_string(),
            ));
        }
        if self.expires_at <= now {
            return Err(DomainError::Validation(
                "expiry date must be in the future".to_string(),
            ));
        }
        Ok(GiftCard {
            id: Uuid::new_v4(),
            merchant_id: self.merchant_id,
            balance: self.value.clone(),
            original_value: self.value,
            is_rechargeable: self.is_rechargeable,
            is_privacy_enabled: self.is_privacy_enabled,
            expires_at: self.expires_at,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn amount(fiat: &str) -> Amount {
        Amount::new(BigDecimal::from_str(fiat).unwrap(), BigDecimal::from(0))
    }

    fn new_card(fiat: &str) -> NewGiftCard {
        NewGiftCard {
            merchant_id: None,
            value: amount(fiat),
            is_rechargeable: true,
            is_privacy_enabled: false,
            expires_at: Utc::now() + Duration::days(365),
        }
    }

    #[test]
    fn test_status_derivation_is_pure() {
        let now = Utc::now();
        let expiry = now + Duration::days(30);
        let funded = amount("20.00");
        let drained = amount("0.00");

        assert_eq!(derive_status(&funded, expiry, now), CardStatus::Active);
        assert_eq!(derive_status(&drained, expiry, now), CardStatus::Empty);
        // Expiry dominates any balance
        assert_eq!(
            derive_status(&funded, expiry, now + Duration::days(31)),
            CardStatus::Expired
        );
        assert_eq!(
            derive_status(&drained, expiry, now + Duration::days(31)),
            CardStatus::Expired
        );
    }

    #[test]
    fn test_status_at_exact_expiry_instant_is_not_expired() {
        let now = Utc::now();
        let funded = amount("20.00");
        assert_eq!(derive_status(&funded, now, now), CardStatus::Active);
    }

    #[test]
    fn test_mint_active_card() {
        let now = Utc::now();
        let card = new_card("50.00").mint(now).unwrap();
        assert_eq!(card.status_at(now), CardStatus::Active);
        assert_eq!(card.balance, card.original_value);
        assert_eq!(card.created_at, now);
    }

    #[test]
    fn test_mint_with_zero_balance_is_rejected() {
        let err = new_card("0.00").mint(Utc::now()).unwrap_err();
        match err {
            DomainError::Policy { reason, .. } => {
                assert_eq!(reason, PolicyReason::InvalidInitialBalance)
            }
            other => panic!("expected policy error, got {other:?}"),
        }
    }

    #[test]
    fn test_mint_with_past_expiry_is_rejected() {
        let mut req = new_card("50.00");
        req.expires_at = Utc::now() - Duration::days(1);
        assert!(matches!(
            req.mint(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_card_serialization_uses_camel_case() {
        let now = Utc::now();
        let card = new_card("50.00").mint(now).unwrap();
        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("isRechargeable").is_some());
        assert!(json.get("merchantId").is_some());
        assert!(json.get("originalValue").is_some());
    }
}
