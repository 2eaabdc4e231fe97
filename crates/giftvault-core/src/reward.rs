//! Loyalty reward records and accrual math.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of reward events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    /// Percentage of a card purchase (mint).
    Purchase,
    /// Percentage of a recharge.
    Recharge,
    /// Flat one-time bonus (e.g. first wallet connect).
    Engagement,
}

/// A loyalty-point grant.
///
/// Created only as a side effect of a completed transaction or engagement
/// event; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Points granted; always a non-negative integer.
    pub points: u32,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    /// The transaction that triggered this grant, if any.
    pub related_transaction_id: Option<Uuid>,
    /// When these points expire, if they do.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Reward {
    /// Creates a grant tied to a transaction.
    pub fn for_transaction(
        user_id: Uuid,
        points: u32,
        reward_type: RewardType,
        transaction_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            points,
            reward_type,
            related_transaction_id: Some(transaction_id),
            expires_at: None,
            created_at: now,
        }
    }

    /// Creates a standalone engagement grant.
    pub fn engagement(user_id: Uuid, points: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            points,
            reward_type: RewardType::Engagement,
            related_transaction_id: None,
            expires_at: None,
            created_at: now,
        }
    }
}

/// Accrual rates, externally configurable.
#[derive(Debug, Clone)]
pub struct RewardRates {
    /// Fraction of fiat purchase value granted as points.
    pub purchase_rate: BigDecimal,
    /// Fraction of fiat recharge value granted as points.
    pub recharge_rate: BigDecimal,
    /// Flat points for one-time engagement events.
    pub engagement_bonus: u32,
}

impl Default for RewardRates {
    fn default() -> Self {
        Self {
            purchase_rate: BigDecimal::from(5) / BigDecimal::from(100),
            recharge_rate: BigDecimal::from(10) / BigDecimal::from(100),
            engagement_bonus: 25,
        }
    }
}

impl RewardRates {
    /// Points for a transaction: `floor(amount_fiat * rate)`, never
    /// negative, always an integer.
    pub fn points_for(&self, reward_type: RewardType, amount_fiat: &BigDecimal) -> u32 {
        let rate = match reward_type {
            RewardType::Purchase => &self.purchase_rate,
            RewardType::Recharge => &self.recharge_rate,
            RewardType::Engagement => return self.engagement_bonus,
        };
        (amount_fiat * rate)
            .with_scale_round(0, RoundingMode::Floor)
            .to_u32()
            .unwrap_or(0)
    }
}
