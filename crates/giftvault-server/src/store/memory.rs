//! In-memory store backed by concurrent maps.

use bigdecimal::BigDecimal;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use giftvault_core::{GiftCard, Reward, Transaction, TransactionStatus};

use super::{Store, StoreError};

/// In-process `Store` implementation.
///
/// Each entity lives in its own concurrent map; transaction ordering per
/// card is kept in a separate index so history reads come back in append
/// order.
#[derive(Default)]
pub struct MemoryStore {
    cards: DashMap<Uuid, GiftCard>,
    transactions: DashMap<Uuid, Transaction>,
    card_tx_index: DashMap<Uuid, Vec<Uuid>>,
    rewards: DashMap<Uuid, Vec<Reward>>,
    accounts: DashMap<Uuid, BigDecimal>,
    wallets: DashMap<String, Uuid>,
    outcomes: DashMap<(Uuid, String), serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn insert_card(&self, card: GiftCard) -> Result<(), StoreError> {
        if self.cards.contains_key(&card.id) {
            return Err(StoreError::Conflict(format!(
                "card already exists: {}",
                card.id
            )));
        }
        self.cards.insert(card.id, card);
        Ok(())
    }

    fn card(&self, id: Uuid) -> Result<Option<GiftCard>, StoreError> {
        Ok(self.cards.get(&id).map(|entry| entry.clone()))
    }

    fn update_card(&self, card: GiftCard) -> Result<(), StoreError> {
        match self.cards.get_mut(&card.id) {
            Some(mut entry) => {
                *entry = card;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("card not found: {}", card.id))),
        }
    }

    fn append_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        self.card_tx_index
            .entry(tx.gift_card_id)
            .or_default()
            .push(tx.id);
        self.transactions.insert(tx.id, tx);
        Ok(())
    }

    fn set_transaction_status(&self, id: Uuid, status: TransactionStatus) -> Result<(), StoreError> {
        match self.transactions.get_mut(&id) {
            Some(mut entry) => {
                // Completed and failed entries are immutable
                if matches!(
                    entry.status,
                    TransactionStatus::Completed | TransactionStatus::Failed
                ) {
                    return Err(StoreError::Conflict(format!(
                        "transaction {} is finalized",
                        id
                    )));
                }
                entry.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("transaction not found: {id}"))),
        }
    }

    fn transactions_for_card(&self, card_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let ids = match self.card_tx_index.get(&card_id) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        let mut txs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tx) = self.transactions.get(&id) {
                txs.push(tx.clone());
            }
        }
        Ok(txs)
    }

    fn insert_reward(&self, reward: Reward) -> Result<(), StoreError> {
        self.rewards.entry(reward.user_id).or_default().push(reward);
        Ok(())
    }

    fn rewards_for_user(&self, user_id: Uuid) -> Result<Vec<Reward>, StoreError> {
        Ok(self
            .rewards
            .get(&user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    fn credit_account(&self, user_id: Uuid, amount: &BigDecimal) -> Result<BigDecimal, StoreError> {
        let mut entry = self
            .accounts
            .entry(user_id)
            .or_insert_with(|| BigDecimal::from(0));
        let updated = entry.clone() + amount;
        *entry = updated.clone();
        Ok(updated)
    }

    fn account_balance(&self, user_id: Uuid) -> Result<BigDecimal, StoreError> {
        Ok(self
            .accounts
            .get(&user_id)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| BigDecimal::from(0)))
    }

    fn bind_wallet(&self, address: &str, user_id: Uuid) -> Result<bool, StoreError> {
        match self.wallets.entry(address.to_string()) {
            Entry::Occupied(entry) => {
                if *entry.get() == user_id {
                    Ok(false)
                } else {
                    Err(StoreError::Conflict(format!(
                        "wallet {address} is already bound to another user"
                    )))
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(user_id);
                Ok(true)
            }
        }
    }

    fn wallet_owner(&self, address: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(self.wallets.get(address).map(|entry| *entry))
    }

    fn recorded_outcome(
        &self,
        card_id: Uuid,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self
            .outcomes
            .get(&(card_id, key.to_string()))
            .map(|entry| entry.clone()))
    }

    fn record_outcome(
        &self,
        card_id: Uuid,
        key: &str,
        outcome: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.outcomes.insert((card_id, key.to_string()), outcome);
        Ok(())
    }
}
