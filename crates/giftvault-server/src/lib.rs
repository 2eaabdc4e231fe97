//! GiftVault Server - REST API for the gift-card balance ledger.
//!
//! This crate provides the HTTP surface, the pluggable store, and the
//! ledger engine that owns every balance mutation.

pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod routes;
pub mod store;

pub use config::AppConfig;
pub use error::AppError;
pub use ledger::Ledger;
pub use notify::{Notifier, TracingNotifier};
pub use routes::{create_router, AppState};
pub use store::{MemoryStore, Store};
