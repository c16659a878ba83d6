//! Database service for receivables-service.

use crate::models::{BalanceRecord, Customer, NewBalance, NewCustomer, Note};
use crate::services::store::LedgerStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "receivables-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Customer Operations
    // =========================================================================

    #[instrument(skip(self), fields(code = %code))]
    pub async fn get_customer_by_code(&self, code: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, code, name, sector_code, group_code, region_code, payment_term, created_utc, updated_utc
            FROM customers
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get customer: {}", e)))?;

        Ok(customer)
    }

    // =========================================================================
    // Note Operations
    // =========================================================================

    /// Append a collections note with a snapshot of the customer's current
    /// past-due balance.
    #[instrument(skip(self, content), fields(customer_id = %customer_id))]
    pub async fn insert_note(
        &self,
        customer_id: Uuid,
        content: &str,
        promise_date: Option<NaiveDate>,
        reminder_date: Option<NaiveDate>,
        balance_at_time: Decimal,
    ) -> Result<Note, AppError> {
        let note_id = Uuid::new_v4();

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (note_id, customer_id, content, promise_date, reminder_date, reminder_completed, balance_at_time)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING note_id, customer_id, content, promise_date, reminder_date, reminder_completed, balance_at_time, created_utc
            "#,
        )
        .bind(note_id)
        .bind(customer_id)
        .bind(content)
        .bind(promise_date)
        .bind(reminder_date)
        .bind(balance_at_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert note: {}", e)))?;

        info!(note_id = %note.note_id, "Note created");

        Ok(note)
    }

    /// Edit a note's content. Notes are otherwise append-only and never
    /// deleted.
    #[instrument(skip(self, content), fields(note_id = %note_id))]
    pub async fn update_note_content(
        &self,
        note_id: Uuid,
        content: &str,
    ) -> Result<Option<Note>, AppError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET content = $2
            WHERE note_id = $1
            RETURNING note_id, customer_id, content, promise_date, reminder_date, reminder_completed, balance_at_time, created_utc
            "#,
        )
        .bind(note_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update note: {}", e)))?;

        Ok(note)
    }

    /// Flip a note's reminder to completed.
    #[instrument(skip(self), fields(note_id = %note_id))]
    pub async fn complete_reminder(&self, note_id: Uuid) -> Result<Option<Note>, AppError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET reminder_completed = TRUE
            WHERE note_id = $1
            RETURNING note_id, customer_id, content, promise_date, reminder_date, reminder_completed, balance_at_time, created_utc
            "#,
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to complete reminder: {}", e))
        })?;

        Ok(note)
    }
}

#[async_trait]
impl LedgerStore for Database {
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_customers(&self, rows: &[NewCustomer]) -> Result<Vec<Customer>, AppError> {
        let mut upserted = Vec::with_capacity(rows.len());

        for row in rows {
            let customer = sqlx::query_as::<_, Customer>(
                r#"
                INSERT INTO customers (customer_id, code, name, sector_code, group_code, region_code, payment_term)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (code) DO UPDATE
                SET name = EXCLUDED.name,
                    sector_code = EXCLUDED.sector_code,
                    group_code = EXCLUDED.group_code,
                    region_code = EXCLUDED.region_code,
                    payment_term = EXCLUDED.payment_term,
                    updated_utc = NOW()
                RETURNING customer_id, code, name, sector_code, group_code, region_code, payment_term, created_utc, updated_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&row.code)
            .bind(&row.name)
            .bind(&row.sector_code)
            .bind(&row.group_code)
            .bind(&row.region_code)
            .bind(&row.payment_term)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to upsert customer: {}", e))
            })?;

            upserted.push(customer);
        }

        Ok(upserted)
    }

    #[instrument(skip(self, codes), fields(count = codes.len()))]
    async fn customers_by_codes(&self, codes: &[String]) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, code, name, sector_code, group_code, region_code, payment_term, created_utc, updated_utc
            FROM customers
            WHERE code = ANY($1)
            "#,
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to query customers by code: {}", e))
        })?;

        Ok(customers)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn customer_ids_with_balance(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT customer_id
            FROM balance_records
            WHERE customer_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to query existing balances: {}", e))
        })?;

        Ok(ids)
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_balances(&self, rows: &[NewBalance]) -> Result<(), AppError> {
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO balance_records (balance_id, customer_id, past_due_balance, past_due_date, not_due_balance, not_due_date, valor, total_balance, reference_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (customer_id) DO UPDATE
                SET past_due_balance = EXCLUDED.past_due_balance,
                    past_due_date = EXCLUDED.past_due_date,
                    not_due_balance = EXCLUDED.not_due_balance,
                    not_due_date = EXCLUDED.not_due_date,
                    valor = EXCLUDED.valor,
                    total_balance = EXCLUDED.total_balance,
                    reference_date = EXCLUDED.reference_date,
                    updated_utc = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.customer_id)
            .bind(row.values.past_due_balance)
            .bind(row.values.past_due_date)
            .bind(row.values.not_due_balance)
            .bind(row.values.not_due_date)
            .bind(row.values.valor)
            .bind(row.values.total_balance)
            .bind(row.values.reference_date)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to upsert balance: {}", e))
            })?;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn balance_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<BalanceRecord>, AppError> {
        let balance = sqlx::query_as::<_, BalanceRecord>(
            r#"
            SELECT balance_id, customer_id, past_due_balance, past_due_date, not_due_balance, not_due_date, valor, total_balance, reference_date, updated_utc
            FROM balance_records
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get balance: {}", e)))?;

        Ok(balance)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn notes_for_customer(&self, customer_id: Uuid) -> Result<Vec<Note>, AppError> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT note_id, customer_id, content, promise_date, reminder_date, reminder_completed, balance_at_time, created_utc
            FROM notes
            WHERE customer_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list notes: {}", e)))?;

        Ok(notes)
    }

    #[instrument(skip(self))]
    async fn count_customers(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count customers: {}", e))
            })?;

        Ok(count)
    }
}
