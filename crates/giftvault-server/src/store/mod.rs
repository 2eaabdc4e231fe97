//! Pluggable persistence for GiftVault entities.
//!
//! The ledger engine talks to a `Store` trait with per-entity get/put/update
//! operations, so the in-memory backend is one implementation among several
//! rather than process-wide mutable state. A transactional database backend
//! would implement the same trait.

pub mod memory;

pub use memory::MemoryStore;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use giftvault_core::{GiftCard, Reward, Transaction, TransactionStatus};

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence operations required by the ledger engine.
///
/// Implementations must be safe to call from concurrent request handlers;
/// cross-call atomicity (read-modify-write on a card) is the ledger's
/// responsibility via its per-card critical section.
pub trait Store: Send + Sync + 'static {
    // Cards
    fn insert_card(&self, card: GiftCard) -> Result<(), StoreError>;
    fn card(&self, id: Uuid) -> Result<Option<GiftCard>, StoreError>;
    fn update_card(&self, card: GiftCard) -> Result<(), StoreError>;

    // Transactions (append-only; status transitions only)
    fn append_transaction(&self, tx: Transaction) -> Result<(), StoreError>;
    fn set_transaction_status(&self, id: Uuid, status: TransactionStatus) -> Result<(), StoreError>;
    fn transactions_for_card(&self, card_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    // Rewards
    fn insert_reward(&self, reward: Reward) -> Result<(), StoreError>;
    fn rewards_for_user(&self, user_id: Uuid) -> Result<Vec<Reward>, StoreError>;

    // Non-card account balances (refund target)
    fn credit_account(&self, user_id: Uuid, amount: &BigDecimal) -> Result<BigDecimal, StoreError>;
    fn account_balance(&self, user_id: Uuid) -> Result<BigDecimal, StoreError>;

    // Wallet bindings. Returns true if the binding was newly created,
    // false if the wallet was already bound to this same user. Binding a
    // wallet held by another user is a conflict.
    fn bind_wallet(&self, address: &str, user_id: Uuid) -> Result<bool, StoreError>;
    fn wallet_owner(&self, address: &str) -> Result<Option<Uuid>, StoreError>;

    // Idempotency records, keyed by (card, client key). The recorded value
    // is the serialized outcome of the first completed execution.
    fn recorded_outcome(
        &self,
        card_id: Uuid,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StoreError>;
    fn record_outcome(
        &self,
        card_id: Uuid,
        key: &str,
        outcome: serde_json::Value,
    ) -> Result<(), StoreError>;
}
