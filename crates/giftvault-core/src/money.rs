//! Two-denomination monetary amounts.
//!
//! Every gift card tracks its value in a fiat denomination and a
//! crypto-equivalent denomination. The two are updated together and never
//! recomputed implicitly from each other, so drifting exchange rates cannot
//! corrupt a card's history. Amounts use arbitrary-precision decimals,
//! never floats.

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

/// Decimal places carried by fiat amounts.
pub const FIAT_SCALE: i64 = 2;

/// Decimal places carried by crypto amounts.
pub const CRYPTO_SCALE: i64 = 8;

/// A paired fiat/crypto monetary amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    /// Fiat value, 2 decimal places.
    pub fiat: BigDecimal,
    /// Crypto-equivalent value, 8 decimal places.
    pub crypto: BigDecimal,
}

impl Amount {
    /// Creates an amount, normalizing both denominations to their
    /// canonical scales (half-even).
    pub fn new(fiat: BigDecimal, crypto: BigDecimal) -> Self {
        Self {
            fiat: fiat.with_scale_round(FIAT_SCALE, RoundingMode::HalfEven),
            crypto: crypto.with_scale_round(CRYPTO_SCALE, RoundingMode::HalfEven),
        }
    }

    /// The zero amount.
    pub fn zero() -> Self {
        Self::new(BigDecimal::from(0), BigDecimal::from(0))
    }

    /// Returns true if the fiat denomination is zero.
    pub fn is_fiat_zero(&self) -> bool {
        self.fiat == BigDecimal::from(0)
    }

    /// Returns true if either denomination is negative.
    pub fn is_negative(&self) -> bool {
        self.fiat < BigDecimal::from(0) || self.crypto < BigDecimal::from(0)
    }

    /// Adds `other` to this amount.
    pub fn plus(&self, other: &Amount) -> Amount {
        Amount::new(&self.fiat + &other.fiat, &self.crypto + &other.crypto)
    }

    /// Subtracts `other` from this amount.
    ///
    /// Returns `None` if either denomination would go below zero.
    pub fn minus(&self, other: &Amount) -> Option<Amount> {
        let fiat = &self.fiat - &other.fiat;
        let crypto = &self.crypto - &other.crypto;
        if fiat < BigDecimal::from(0) || crypto < BigDecimal::from(0) {
            return None;
        }
        Some(Amount::new(fiat, crypto))
    }

    /// Computes the crypto share corresponding to a fiat share of this
    /// amount, pro-rata, rounded half-even at 8 decimal places.
    ///
    /// A fiat share equal to the whole fiat balance returns the whole
    /// crypto balance exactly, so a full drain leaves no dust.
    pub fn pro_rata_crypto(&self, fiat_share: &BigDecimal) -> BigDecimal {
        if self.fiat == BigDecimal::from(0) || fiat_share >= &self.fiat {
            return self.crypto.clone();
        }
        if fiat_share <= &BigDecimal::from(0) {
            return BigDecimal::from(0).with_scale(CRYPTO_SCALE);
        }
        (fiat_share * &self.crypto / &self.fiat).with_scale_round(CRYPTO_SCALE, RoundingMode::HalfEven)
    }
}
