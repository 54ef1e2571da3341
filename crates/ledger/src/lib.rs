pub mod client;
pub mod http;
pub mod reconcile;

pub use client::{IdentityEntry, LedgerClient};
pub use http::HttpLedgerClient;
pub use reconcile::{plan, sync_previous_hash, ReconciliationPlan};
