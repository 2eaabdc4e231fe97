//! Append-only transaction log entries.
//!
//! Balance changes are derived from applying transactions, not the other
//! way around: every ledger mutation appends an entry before the card is
//! touched, so the card's balance is always replayable from its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Amount;

/// Kinds of ledger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Initial value loaded at mint time.
    Purchase,
    /// Value added to an existing card.
    Recharge,
    /// Value debited from a card by a spend.
    Redeem,
    /// Leftover value credited to the user's non-card account balance.
    Refund,
}

/// Processing state of a ledger entry.
///
/// Entries are immutable once `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// An immutable ledger entry for a gift-card balance event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier for this entry.
    pub id: Uuid,
    /// The card this entry applies to.
    pub gift_card_id: Uuid,
    /// The user who initiated the operation.
    pub user_id: Uuid,
    /// Kind of event.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Amount moved, in both denominations.
    pub amount: Amount,
    /// Processing state.
    pub status: TransactionStatus,
    /// Additional event context.
    pub metadata: serde_json::Value,
    /// When this entry was appended.
    pub created_at: DateTime<Utc>,
}

/// Data required to append a new ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub gift_card_id: Uuid,
    pub user_id: Uuid,
    pub tx_type: TransactionType,
    pub amount: Amount,
    pub metadata: serde_json::Value,
}

impl NewTransaction {
    /// Initial card value loaded at mint time.
    pub fn purchase(gift_card_id: Uuid, user_id: Uuid, amount: Amount, metadata: serde_json::Value) -> Self {
        Self {
            gift_card_id,
            user_id,
            tx_type: TransactionType::Purchase,
            amount,
            metadata,
        }
    }

    /// Value added to an existing card.
    pub fn recharge(gift_card_id: Uuid, user_id: Uuid, amount: Amount, metadata: serde_json::Value) -> Self {
        Self {
            gift_card_id,
            user_id,
            tx_type: TransactionType::Recharge,
            amount,
            metadata,
        }
    }

    /// Value debited from a card by a spend.
    pub fn redeem(gift_card_id: Uuid, user_id: Uuid, amount: Amount, metadata: serde_json::Value) -> Self {
        Self {
            gift_card_id,
            user_id,
            tx_type: TransactionType::Redeem,
            amount,
            metadata,
        }
    }

    /// Leftover value moved off-card to the user's account balance.
    pub fn refund(gift_card_id: Uuid, user_id: Uuid, amount: Amount, metadata: serde_json::Value) -> Self {
        Self {
            gift_card_id,
            user_id,
            tx_type: TransactionType::Refund,
            amount,
            metadata,
        }
    }

    /// Materializes this entry in the `pending` state.
    pub fn into_pending(self, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            gift_card_id: self.gift_card_id,
            user_id: self.user_id,
            tx_type: self.tx_type,
            amount: self.amount,
            status: TransactionStatus::Pending,
            metadata: self.metadata,
            created_at: now,
        }
    }
}
