//! Change issuance for partial spends.
//!
//! Gift cards are discrete non-fungible balances, so a partial spend has
//! to decide where the leftover value goes: stay on the card, move to a
//! freshly minted card, or move to the user's account balance. This module
//! computes the plan; executing it is the ledger engine's job.

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, PolicyReason};
use crate::money::{Amount, FIAT_SCALE};

/// Where leftover value goes after a partial spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMode {
    /// Leftover stays on the original card.
    Keep,
    /// Original card is drained; leftover is minted onto a new card.
    NewCard,
    /// Original card is drained; leftover is credited to the user's
    /// non-card account balance.
    Refund,
}

/// What the ledger must do with the computed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Nothing beyond the card debit (keep mode, or zero change).
    None,
    /// Mint a new card carrying the change.
    MintCard,
    /// Credit the change to the user's account balance.
    CreditAccount,
}

/// A computed change plan for one spend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePlan {
    /// Amount to debit from the original card.
    pub debit: Amount,
    /// Leftover value (`balance - spend`), in both denominations.
    pub change: Amount,
    /// Where the leftover goes.
    pub action: ChangeAction,
}

/// Plans a spend of `spend_fiat` against `balance` under `mode`.
///
/// Invariant: `spend + change == balance.fiat` before the call, for every
/// mode. A spend exactly equal to the balance is the intended "fully used"
/// outcome and yields zero change with no change action, regardless of
/// mode; only `spend > balance` is `InsufficientBalance`.
pub fn plan_change(
    balance: &Amount,
    spend_fiat: &BigDecimal,
    mode: ChangeMode,
) -> Result<ChangePlan, DomainError> {
    if spend_fiat <= &BigDecimal::from(0) {
        return Err(DomainError::Validation(
            "spend amount must be positive".to_string(),
        ));
    }
    let spend = spend_fiat.with_scale_round(FIAT_SCALE, RoundingMode::HalfEven);
    if spend > balance.fiat {
        return Err(DomainError::policy(
            PolicyReason::InsufficientBalance,
            format!("spend {} exceeds balance {}", spend, balance.fiat),
        ));
    }

    let change_fiat = &balance.fiat - &spend;
    let spend_crypto = balance.pro_rata_crypto(&spend);
    let change_crypto = &balance.crypto - &spend_crypto;

    // Exact exhaustion: no change action in any mode.
    if change_fiat == BigDecimal::from(0) {
        return Ok(ChangePlan {
            debit: balance.clone(),
            change: Amount::zero(),
            action: ChangeAction::None,
        });
    }

    let change = Amount::new(change_fiat, change_crypto);
    let plan = match mode {
        ChangeMode::Keep => ChangePlan {
            debit: Amount::new(spend, spend_crypto),
            change,
            action: ChangeAction::None,
        },
        ChangeMode::NewCard => ChangePlan {
            debit: balance.clone(),
            change,
            action: ChangeAction::MintCard,
        },
        ChangeMode::Refund => ChangePlan {
            debit: balance.clone(),
            change,
            action: ChangeAction::CreditAccount,
        },
    };
    Ok(plan)
}
