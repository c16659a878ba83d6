//! Service layer: store access, reconciliation and classification.

pub mod classification;
pub mod database;
pub mod reconcile;
pub mod store;

pub use database::Database;
pub use store::LedgerStore;
