//! Opaque spend-proof artifacts.
//!
//! Privacy-enabled cards gate spend operations behind a proof artifact.
//! The artifact is an opaque verified/unverified token: a SHA-256 digest
//! over the card id and a client nonce. No zero-knowledge cryptography is
//! involved; the ledger only consumes the boolean outcome of verification.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Computes the SHA-256 hash of the input bytes as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(result)
}

/// A spend-proof artifact presented by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendProof {
    /// Client-chosen nonce, non-empty.
    pub nonce: String,
    /// Lowercase hex SHA-256 digest over `"<card_id>:<nonce>"`.
    pub digest: String,
}

impl SpendProof {
    /// Generates a valid proof for a card. Used by clients (and tests).
    pub fn generate(card_id: &Uuid, nonce: impl Into<String>) -> Self {
        let nonce = nonce.into();
        let digest = sha256_hex(format!("{card_id}:{nonce}").as_bytes());
        Self { nonce, digest }
    }

    /// Verifies this artifact against a card id.
    pub fn verify(&self, card_id: &Uuid) -> bool {
        if self.nonce.is_empty() {
            return false;
        }
        self.digest == sha256_hex(format!("{}:{}", card_id, self.nonce).as_bytes())
    }
}
