//! Domain error taxonomy for GiftVault.

use serde::{Deserialize, Serialize};

/// Machine-readable reason codes for policy violations.
///
/// These are surfaced to clients alongside the HTTP status so that a
/// rejected operation can be handled programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyReason {
    /// Recharge attempted on a card minted with `is_rechargeable = false`.
    NotRechargeable,
    /// Operation attempted on a card past its expiry date.
    CardExpired,
    /// A debit would drive the fiat or crypto balance below zero.
    InsufficientBalance,
    /// Mint attempted with a zero or negative initial balance.
    InvalidInitialBalance,
    /// Spend on a privacy-enabled card without a proof artifact.
    ProofRequired,
    /// The supplied proof artifact did not verify.
    ProofInvalid,
}

impl PolicyReason {
    /// Returns the wire representation of this reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyReason::NotRechargeable => "not_rechargeable",
            PolicyReason::CardExpired => "card_expired",
            PolicyReason::InsufficientBalance => "insufficient_balance",
            PolicyReason::InvalidInitialBalance => "invalid_initial_balance",
            PolicyReason::ProofRequired => "proof_required",
            PolicyReason::ProofInvalid => "proof_invalid",
        }
    }
}

impl std::fmt::Display for PolicyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error type.
///
/// Validation and policy errors are detected before any mutation, so a
/// failed operation has no side effects on the ledger.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("policy violation ({reason}): {message}")]
    Policy {
        reason: PolicyReason,
        message: String,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Shorthand for a policy violation with a reason code.
    pub fn policy(reason: PolicyReason, message: impl Into<String>) -> Self {
        DomainError::Policy {
            reason,
            message: message.into(),
        }
    }
}
