//! The ledger engine.
//!
//! Every balance mutation flows through here. Operations on one card run
//! inside a per-card critical section, so concurrent requests against the
//! same card serialize while distinct cards proceed independently. Each
//! mutation appends its transaction entry before the card is touched
//! (write-ahead), and reward/notification follow-ups are best-effort: they
//! can fail without un-committing the financial operation.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use giftvault_core::{
    plan_change, Amount, ChangeAction, ChangeMode, GiftCard, NewGiftCard, NewTransaction,
    PolicyReason, Reward, RewardRates, RewardType, SpendProof, Transaction, TransactionStatus,
    TransactionType,
};

use crate::error::AppError;
use crate::notify::{dispatch, NotificationKind, Notifier};
use crate::store::Store;

/// Request to mint a new card.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub user_id: Uuid,
    pub merchant_id: Option<Uuid>,
    pub value: Amount,
    pub is_rechargeable: bool,
    pub is_privacy_enabled: bool,
    pub expires_at: DateTime<Utc>,
}

/// Request to recharge an existing card.
#[derive(Debug, Clone)]
pub struct RechargeRequest {
    pub user_id: Uuid,
    pub amount: Amount,
    pub idempotency_key: Option<String>,
}

/// Request to spend from a card.
#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub user_id: Uuid,
    pub amount_fiat: BigDecimal,
    pub change_handling: ChangeMode,
    pub proof: Option<SpendProof>,
    pub idempotency_key: Option<String>,
}

/// Result of a mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintOutcome {
    pub card: GiftCard,
    pub reward_points: u32,
}

/// Result of a recharge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeOutcome {
    pub card: GiftCard,
    pub reward_points: u32,
}

/// Result of a spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendOutcome {
    /// The original card after the debit.
    pub card: GiftCard,
    /// Leftover value (`balance - spend` before the call).
    pub change: Amount,
    /// Set when change was minted onto a fresh card.
    pub new_card_id: Option<Uuid>,
    /// Set when change was credited to the user's account balance.
    pub refunded_to_account: Option<BigDecimal>,
}

/// Result of a wallet bind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBindOutcome {
    /// False if this wallet was already bound to the same user.
    pub newly_bound: bool,
    /// Engagement bonus granted on a user's first wallet connect.
    pub bonus_points: u32,
}

/// The ledger engine. Cheap to share behind an `Arc`.
pub struct Ledger {
    store: Arc<dyn Store>,
    rates: RewardRates,
    notifier: Arc<dyn Notifier>,
    card_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>, rates: RewardRates, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            rates,
            notifier,
            card_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn card_lock(&self, card_id: Uuid) -> Arc<Mutex<()>> {
        self.card_locks
            .entry(card_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Mints a new gift card, loading its initial value as a `purchase`
    /// transaction and accruing the purchase reward.
    pub async fn mint(&self, request: MintRequest) -> Result<MintOutcome, AppError> {
        let now = Utc::now();

        // Validation happens before any mutation
        let card = NewGiftCard {
            merchant_id: request.merchant_id,
            value: request.value,
            is_rechargeable: request.is_rechargeable,
            is_privacy_enabled: request.is_privacy_enabled,
            expires_at: request.expires_at,
        }
        .mint(now)?;

        let tx = self.insert_card_with_purchase(
            &card,
            request.user_id,
            json!({ "reason": "card_purchase" }),
            now,
        )?;

        let reward_points =
            self.accrue(request.user_id, RewardType::Purchase, &card.original_value.fiat, tx.id, now);

        dispatch(
            &self.notifier,
            request.user_id,
            NotificationKind::CardMinted,
            "Gift card minted",
            format!("Card {} minted with {} fiat", card.id, card.original_value.fiat),
            Some(card.id),
        );

        Ok(MintOutcome { card, reward_points })
    }

    /// Returns a card for a read, or `NotFound`.
    ///
    /// Expiry is evaluated lazily by the caller via `status_at`; there is
    /// no background timer.
    pub async fn snapshot(&self, card_id: Uuid) -> Result<GiftCard, AppError> {
        self.store
            .card(card_id)?
            .ok_or_else(|| AppError::NotFound(format!("gift card not found: {card_id}")))
    }

    /// Recharges a card.
    ///
    /// Preconditions, checked in order before any mutation: the card
    /// exists, has not expired, is rechargeable, and the amount is
    /// positive. A successful recharge on an `empty` card is the only
    /// path back to `active`.
    pub async fn recharge(
        &self,
        card_id: Uuid,
        request: RechargeRequest,
    ) -> Result<RechargeOutcome, AppError> {
        let lock = self.card_lock(card_id);
        let _guard = lock.lock().await;

        // Replay a completed execution for a retried idempotency key
        if let Some(key) = &request.idempotency_key {
            if let Some(recorded) = self.store.recorded_outcome(card_id, key)? {
                let outcome: RechargeOutcome = serde_json::from_value(recorded)
                    .map_err(|e| AppError::Internal(format!("corrupt idempotency record: {e}")))?;
                return Ok(outcome);
            }
        }

        let now = Utc::now();
        let mut card = self.snapshot(card_id).await?;

        if card.is_expired_at(now) {
            return Err(AppError::Policy {
                reason: PolicyReason::CardExpired,
                message: format!("card {card_id} expired at {}", card.expires_at),
            });
        }
        if !card.is_rechargeable {
            return Err(AppError::Policy {
                reason: PolicyReason::NotRechargeable,
                message: format!("card {card_id} does not accept top-ups"),
            });
        }
        if request.amount.fiat <= BigDecimal::from(0) {
            return Err(AppError::BadRequest(
                "recharge amount must be positive".to_string(),
            ));
        }
        if request.amount.crypto < BigDecimal::from(0) {
            return Err(AppError::BadRequest(
                "recharge crypto amount must not be negative".to_string(),
            ));
        }

        let entry = NewTransaction::recharge(
            card_id,
            request.user_id,
            request.amount.clone(),
            json!({ "reason": "top_up" }),
        );
        let tx = self.apply_delta(&mut card, entry, now)?;

        let reward_points =
            self.accrue(request.user_id, RewardType::Recharge, &request.amount.fiat, tx.id, now);

        let outcome = RechargeOutcome {
            card: card.clone(),
            reward_points,
        };
        if let Some(key) = &request.idempotency_key {
            self.record_outcome(card_id, key, &outcome);
        }

        dispatch(
            &self.notifier,
            request.user_id,
            NotificationKind::CardRecharged,
            "Card recharged",
            format!("Card {} recharged by {} fiat", card_id, request.amount.fiat),
            Some(card_id),
        );

        Ok(outcome)
    }

    /// Spends from a card, issuing change per the requested handling mode.
    pub async fn spend(
        &self,
        card_id: Uuid,
        request: SpendRequest,
    ) -> Result<SpendOutcome, AppError> {
        let lock = self.card_lock(card_id);
        let _guard = lock.lock().await;

        if let Some(key) = &request.idempotency_key {
            if let Some(recorded) = self.store.recorded_outcome(card_id, key)? {
                let outcome: SpendOutcome = serde_json::from_value(recorded)
                    .map_err(|e| AppError::Internal(format!("corrupt idempotency record: {e}")))?;
                return Ok(outcome);
            }
        }

        let now = Utc::now();
        let mut card = self.snapshot(card_id).await?;

        if card.is_expired_at(now) {
            return Err(AppError::Policy {
                reason: PolicyReason::CardExpired,
                message: format!("card {card_id} expired at {}", card.expires_at),
            });
        }

        // Privacy gate: an opaque verified/unverified token, consulted
        // before balance computation, never part of it.
        if card.is_privacy_enabled {
            match &request.proof {
                None => {
                    return Err(AppError::Policy {
                        reason: PolicyReason::ProofRequired,
                        message: format!("card {card_id} requires a spend proof"),
                    })
                }
                Some(proof) if !proof.verify(&card_id) => {
                    return Err(AppError::Policy {
                        reason: PolicyReason::ProofInvalid,
                        message: "spend proof did not verify".to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        let plan = plan_change(&card.balance, &request.amount_fiat, request.change_handling)?;

        let entry = NewTransaction::redeem(
            card_id,
            request.user_id,
            plan.debit.clone(),
            json!({
                "changeHandling": request.change_handling,
                "requestedFiat": request.amount_fiat.to_string(),
            }),
        );
        self.apply_delta(&mut card, entry, now)?;

        let mut new_card_id = None;
        let mut refunded_to_account = None;
        match plan.action {
            ChangeAction::None => {}
            ChangeAction::MintCard => {
                let change_card = NewGiftCard {
                    merchant_id: card.merchant_id,
                    value: plan.change.clone(),
                    is_rechargeable: card.is_rechargeable,
                    is_privacy_enabled: card.is_privacy_enabled,
                    expires_at: card.expires_at,
                }
                .mint(now)?;
                self.insert_card_with_purchase(
                    &change_card,
                    request.user_id,
                    json!({ "reason": "change_issuance", "sourceCardId": card_id }),
                    now,
                )?;
                new_card_id = Some(change_card.id);
            }
            ChangeAction::CreditAccount => {
                let new_balance = self
                    .store
                    .credit_account(request.user_id, &plan.change.fiat)?;
                let refund = NewTransaction::refund(
                    card_id,
                    request.user_id,
                    plan.change.clone(),
                    json!({ "reason": "change_refund", "accountBalance": new_balance.to_string() }),
                )
                .into_pending(now);
                let refund_id = refund.id;
                self.store.append_transaction(refund)?;
                self.store
                    .set_transaction_status(refund_id, TransactionStatus::Completed)?;
                refunded_to_account = Some(plan.change.fiat.clone());
            }
        }

        let outcome = SpendOutcome {
            card: card.clone(),
            change: plan.change.clone(),
            new_card_id,
            refunded_to_account,
        };
        if let Some(key) = &request.idempotency_key {
            self.record_outcome(card_id, key, &outcome);
        }

        let kind = if plan.action == ChangeAction::None {
            NotificationKind::CardSpent
        } else {
            NotificationKind::ChangeIssued
        };
        dispatch(
            &self.notifier,
            request.user_id,
            kind,
            "Card spent",
            format!(
                "Card {} debited {}; change {}",
                card_id, plan.debit.fiat, plan.change.fiat
            ),
            Some(card_id),
        );

        Ok(outcome)
    }

    /// Returns the append-only transaction history for a card.
    pub async fn transactions(&self, card_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        // 404 for a card that never existed, empty history otherwise
        self.snapshot(card_id).await?;
        Ok(self.store.transactions_for_card(card_id)?)
    }

    /// Returns a user's reward rows and cumulative point total.
    pub async fn rewards(&self, user_id: Uuid) -> Result<(u64, Vec<Reward>), AppError> {
        let rewards = self.store.rewards_for_user(user_id)?;
        let total = rewards.iter().map(|r| u64::from(r.points)).sum();
        Ok((total, rewards))
    }

    /// Returns a user's non-card account balance (the refund target).
    pub async fn account_balance(&self, user_id: Uuid) -> Result<BigDecimal, AppError> {
        Ok(self.store.account_balance(user_id)?)
    }

    /// Binds a wallet address to a user.
    ///
    /// A wallet held by another user is a conflict. The first successful
    /// bind for a user grants the flat engagement bonus, once.
    pub async fn bind_wallet(
        &self,
        user_id: Uuid,
        address: &str,
    ) -> Result<WalletBindOutcome, AppError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest(
                "wallet address must not be empty".to_string(),
            ));
        }

        let newly_bound = self.store.bind_wallet(trimmed, user_id)?;

        let mut bonus_points = 0;
        if newly_bound && !self.has_engagement_reward(user_id)? {
            let now = Utc::now();
            bonus_points = self.rates.points_for(RewardType::Engagement, &BigDecimal::from(0));
            let reward = Reward::engagement(user_id, bonus_points, now);
            if let Err(e) = self.store.insert_reward(reward) {
                tracing::warn!("failed to persist engagement reward for {user_id}: {e}");
            }
        }

        if newly_bound {
            dispatch(
                &self.notifier,
                user_id,
                NotificationKind::WalletBound,
                "Wallet connected",
                format!("Wallet {trimmed} bound to your account"),
                None,
            );
        }

        Ok(WalletBindOutcome {
            newly_bound,
            bonus_points,
        })
    }

    /// BalanceLedger contract: applies one transaction's delta to a card.
    ///
    /// Write-ahead ordering: the entry is appended `pending` first, the
    /// card balance is mutated, the card is stored, and only then is the
    /// entry finalized `completed` (`failed` if the delta is rejected), so
    /// a crash between card update and log append cannot lose the entry.
    fn apply_delta(
        &self,
        card: &mut GiftCard,
        entry: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, AppError> {
        let tx = entry.into_pending(now);
        self.store.append_transaction(tx.clone())?;

        let new_balance = match tx.tx_type {
            TransactionType::Purchase | TransactionType::Recharge => {
                Some(card.balance.plus(&tx.amount))
            }
            TransactionType::Redeem => card.balance.minus(&tx.amount),
            // Refund entries move value off-card; the card debit was
            // already applied by the accompanying redeem entry.
            TransactionType::Refund => Some(card.balance.clone()),
        };
        let Some(new_balance) = new_balance else {
            let _ = self
                .store
                .set_transaction_status(tx.id, TransactionStatus::Failed);
            return Err(AppError::Policy {
                reason: PolicyReason::InsufficientBalance,
                message: format!(
                    "debit {} exceeds balance {}",
                    tx.amount.fiat, card.balance.fiat
                ),
            });
        };

        card.balance = new_balance;
        card.updated_at = now;
        if let Err(e) = self.store.update_card(card.clone()) {
            let _ = self
                .store
                .set_transaction_status(tx.id, TransactionStatus::Failed);
            return Err(AppError::Internal(format!("failed to persist card: {e}")));
        }
        self.store
            .set_transaction_status(tx.id, TransactionStatus::Completed)?;
        Ok(tx)
    }

    /// Inserts a freshly minted card together with its `purchase` entry.
    fn insert_card_with_purchase(
        &self,
        card: &GiftCard,
        user_id: Uuid,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Transaction, AppError> {
        let tx = NewTransaction::purchase(card.id, user_id, card.original_value.clone(), metadata)
            .into_pending(now);
        self.store.append_transaction(tx.clone())?;

        if let Err(e) = self.store.insert_card(card.clone()) {
            let _ = self
                .store
                .set_transaction_status(tx.id, TransactionStatus::Failed);
            return Err(AppError::Internal(format!("failed to insert card: {e}")));
        }
        self.store
            .set_transaction_status(tx.id, TransactionStatus::Completed)?;
        Ok(tx)
    }

    /// Accrues reward points for a completed transaction, best-effort.
    ///
    /// Persistence failure is logged and does not fail the financial
    /// operation that triggered the accrual.
    fn accrue(
        &self,
        user_id: Uuid,
        reward_type: RewardType,
        amount_fiat: &BigDecimal,
        transaction_id: Uuid,
        now: DateTime<Utc>,
    ) -> u32 {
        let points = self.rates.points_for(reward_type, amount_fiat);
        let reward = Reward::for_transaction(user_id, points, reward_type, transaction_id, now);
        if let Err(e) = self.store.insert_reward(reward) {
            tracing::warn!("failed to persist reward for {user_id}: {e}");
        }
        points
    }

    fn has_engagement_reward(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .store
            .rewards_for_user(user_id)?
            .iter()
            .any(|r| r.reward_type == RewardType::Engagement))
    }

    fn record_outcome<T: Serialize>(&self, card_id: Uuid, key: &str, outcome: &T) {
        match serde_json::to_value(outcome) {
            Ok(value) => {
                if let Err(e) = self.store.record_outcome(card_id, key, value) {
                    tracing::warn!("failed to record idempotency outcome for {card_id}: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize idempotency outcome: {e}"),
        }
    }
}
