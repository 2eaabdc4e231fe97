// GiftVault Core - Domain types and balance logic for gift cards

pub mod card;
pub mod change;
pub mod error;
pub mod money;
pub mod proof;
pub mod reward;
pub mod transaction;

pub use card::{derive_status, CardStatus, GiftCard, NewGiftCard};
pub use change::{plan_change, ChangeAction, ChangeMode, ChangePlan};
pub use error::{DomainError, PolicyReason};
pub use money::Amount;
pub use proof::SpendProof;
pub use reward::{Reward, RewardRates, RewardType};
pub use transaction::{NewTransaction, Transaction, TransactionStatus, TransactionType};
