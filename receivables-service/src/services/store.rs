//! Persistent store contract consumed by the reconciler and the
//! classification engine. Any backend with conflict-key upsert and
//! `IN`-filtered select satisfies it; Postgres via [`crate::services::database::Database`]
//! in production, an in-memory map in tests.

use crate::models::{BalanceRecord, Customer, NewBalance, NewCustomer, Note};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Upserts customers on conflict-key `code` and returns the stored rows
    /// (with ids) for every upserted code.
    async fn upsert_customers(&self, rows: &[NewCustomer]) -> Result<Vec<Customer>, AppError>;

    async fn customers_by_codes(&self, codes: &[String]) -> Result<Vec<Customer>, AppError>;

    /// Which of the given customers already have a balance row.
    async fn customer_ids_with_balance(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>;

    /// Upserts balance snapshots on conflict-key `customer_id`, overwriting
    /// every field.
    async fn upsert_balances(&self, rows: &[NewBalance]) -> Result<(), AppError>;

    async fn balance_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<BalanceRecord>, AppError>;

    async fn notes_for_customer(&self, customer_id: Uuid) -> Result<Vec<Note>, AppError>;

    async fn count_customers(&self) -> Result<i64, AppError>;
}
