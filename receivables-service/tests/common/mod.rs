//! Common test utilities for receivables-service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use calamine::{Data, Range};
use chrono::{NaiveDate, Utc};
use receivables_service::config::ImportConfig;
use receivables_service::models::{BalanceRecord, Customer, NewBalance, NewCustomer, Note};
use receivables_service::services::LedgerStore;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,receivables_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Import options tuned for tests: small batches, no throttle.
pub fn test_options() -> ImportConfig {
    ImportConfig {
        batch_size: 2,
        batch_delay_ms: 0,
        number_locale: None,
        upcoming_days: 15,
    }
}

#[derive(Default)]
struct MemoryInner {
    customers: HashMap<String, Customer>,
    balances: HashMap<Uuid, BalanceRecord>,
    notes: HashMap<Uuid, Vec<Note>>,
    customer_upsert_calls: usize,
}

/// In-memory [`LedgerStore`] with the same upsert/select semantics as the
/// Postgres implementation, plus failure knobs for exercising the
/// reconciler's abort and recovery paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_customer_upserts_after: Option<usize>,
    return_no_rows: bool,
    drop_codes: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `upsert_customers` once this many calls have succeeded.
    pub fn failing_customer_upserts_after(mut self, calls: usize) -> Self {
        self.fail_customer_upserts_after = Some(calls);
        self
    }

    /// Return no rows from `upsert_customers`, forcing the re-query path.
    pub fn returning_no_rows(mut self) -> Self {
        self.return_no_rows = true;
        self
    }

    /// Make a code silently vanish on upsert, leaving its id unresolvable.
    pub fn dropping_code(mut self, code: &str) -> Self {
        self.drop_codes.insert(code.to_string());
        self
    }

    pub fn customer_by_code(&self, code: &str) -> Option<Customer> {
        self.inner.lock().unwrap().customers.get(code).cloned()
    }

    pub fn balance_by_code(&self, code: &str) -> Option<BalanceRecord> {
        let inner = self.inner.lock().unwrap();
        let customer = inner.customers.get(code)?;
        inner.balances.get(&customer.customer_id).cloned()
    }

    pub fn customer_count(&self) -> usize {
        self.inner.lock().unwrap().customers.len()
    }

    /// Seed a customer directly, bypassing the import pipeline.
    pub fn seed_customer(&self, code: &str) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        let customer_id = Uuid::new_v4();
        let now = Utc::now();
        inner.customers.insert(
            code.to_string(),
            Customer {
                customer_id,
                code: code.to_string(),
                name: None,
                sector_code: None,
                group_code: None,
                region_code: None,
                payment_term: None,
                created_utc: now,
                updated_utc: now,
            },
        );
        customer_id
    }

    pub fn seed_balance(&self, customer_id: Uuid, balance: BalanceRecord) {
        self.inner
            .lock()
            .unwrap()
            .balances
            .insert(customer_id, balance);
    }

    pub fn seed_note(&self, customer_id: Uuid, promise_date: Option<NaiveDate>) {
        let mut inner = self.inner.lock().unwrap();
        inner.notes.entry(customer_id).or_default().push(Note {
            note_id: Uuid::new_v4(),
            customer_id,
            content: "follow-up call".to_string(),
            promise_date,
            reminder_date: None,
            reminder_completed: false,
            balance_at_time: Decimal::ZERO,
            created_utc: Utc::now(),
        });
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn upsert_customers(&self, rows: &[NewCustomer]) -> Result<Vec<Customer>, AppError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(limit) = self.fail_customer_upserts_after {
            if inner.customer_upsert_calls >= limit {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Simulated store failure"
                )));
            }
        }
        inner.customer_upsert_calls += 1;

        let mut upserted = Vec::with_capacity(rows.len());
        for row in rows {
            if self.drop_codes.contains(&row.code) {
                continue;
            }
            let now = Utc::now();
            let customer = inner
                .customers
                .entry(row.code.clone())
                .and_modify(|c| {
                    c.name = row.name.clone();
                    c.sector_code = row.sector_code.clone();
                    c.group_code = row.group_code.clone();
                    c.region_code = row.region_code.clone();
                    c.payment_term = row.payment_term.clone();
                    c.updated_utc = now;
                })
                .or_insert_with(|| Customer {
                    customer_id: Uuid::new_v4(),
                    code: row.code.clone(),
                    name: row.name.clone(),
                    sector_code: row.sector_code.clone(),
                    group_code: row.group_code.clone(),
                    region_code: row.region_code.clone(),
                    payment_term: row.payment_term.clone(),
                    created_utc: now,
                    updated_utc: now,
                })
                .clone();
            upserted.push(customer);
        }

        if self.return_no_rows {
            return Ok(Vec::new());
        }
        Ok(upserted)
    }

    async fn customers_by_codes(&self, codes: &[String]) -> Result<Vec<Customer>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(codes
            .iter()
            .filter_map(|code| inner.customers.get(code).cloned())
            .collect())
    }

    async fn customer_ids_with_balance(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter(|id| inner.balances.contains_key(id))
            .copied()
            .collect())
    }

    async fn upsert_balances(&self, rows: &[NewBalance]) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        for row in rows {
            let balance_id = inner
                .balances
                .get(&row.customer_id)
                .map(|b| b.balance_id)
                .unwrap_or_else(Uuid::new_v4);
            inner.balances.insert(
                row.customer_id,
                BalanceRecord {
                    balance_id,
                    customer_id: row.customer_id,
                    past_due_balance: row.values.past_due_balance,
                    past_due_date: row.values.past_due_date,
                    not_due_balance: row.values.not_due_balance,
                    not_due_date: row.values.not_due_date,
                    valor: row.values.valor,
                    total_balance: row.values.total_balance,
                    reference_date: row.values.reference_date,
                    updated_utc: Utc::now(),
                },
            );
        }
        Ok(())
    }

    async fn balance_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<BalanceRecord>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .balances
            .get(&customer_id)
            .cloned())
    }

    async fn notes_for_customer(&self, customer_id: Uuid) -> Result<Vec<Note>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .notes
            .get(&customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_customers(&self) -> Result<i64, AppError> {
        Ok(self.inner.lock().unwrap().customers.len() as i64)
    }
}

/// Build an in-memory worksheet from rows of cells.
pub fn sheet(rows: Vec<Vec<Data>>) -> Range<Data> {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(1) as u32;
    let mut range = Range::new((0, 0), (rows.len() as u32 - 1, cols - 1));
    for (r, row) in rows.into_iter().enumerate() {
        for (c, value) in row.into_iter().enumerate() {
            range.set_value((r as u32, c as u32), value);
        }
    }
    range
}

pub fn s(v: &str) -> Data {
    Data::String(v.to_string())
}

/// Header row matching a typical ledger export.
pub fn ledger_header() -> Vec<Data> {
    vec![
        s("Customer Code"),
        s("Customer Name"),
        s("Sector Code"),
        s("Past Due Balance"),
        s("Past Due Balance Due Date"),
        s("Not Due Balance"),
        s("Not Due Balance Due Date"),
        s("Valor (Days)"),
        s("Total Balance"),
    ]
}

/// A data row for [`ledger_header`].
pub fn ledger_row(code: &str, name: &str, past_due: &str, not_due: &str) -> Vec<Data> {
    vec![
        s(code),
        s(name),
        s("S1"),
        s(past_due),
        s("31.12.2024"),
        s(not_due),
        Data::Empty,
        Data::Float(30.0),
        Data::Empty,
    ]
}
