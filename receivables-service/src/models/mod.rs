//! Domain models for receivables-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Customer Models
// ============================================================================

/// A business customer, keyed by the human-assigned ledger `code`. Created on
/// first import encounter, updated (never deleted) on every later import.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub sector_code: Option<String>,
    pub group_code: Option<String>,
    pub region_code: Option<String>,
    pub payment_term: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Customer fields as parsed from one ledger row, before the store assigns
/// an id. The `code` is trimmed and is the reconciliation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub code: String,
    pub name: Option<String>,
    pub sector_code: Option<String>,
    pub group_code: Option<String>,
    pub region_code: Option<String>,
    pub payment_term: Option<String>,
}

// ============================================================================
// Balance Models
// ============================================================================

/// Stored balance snapshot, one-to-one with a customer. Fully overwritten on
/// each import; this is a snapshot, not an append log.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BalanceRecord {
    pub balance_id: Uuid,
    pub customer_id: Uuid,
    pub past_due_balance: Decimal,
    pub past_due_date: Option<NaiveDate>,
    pub not_due_balance: Decimal,
    pub not_due_date: Option<NaiveDate>,
    pub valor: i32,
    pub total_balance: Decimal,
    pub reference_date: Option<NaiveDate>,
    pub updated_utc: DateTime<Utc>,
}

/// Balance fields as parsed from one ledger row.
///
/// `total_balance` is authoritative when the column is present in the file;
/// otherwise it is derived as past_due + not_due by the row processor.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceValues {
    pub past_due_balance: Decimal,
    pub past_due_date: Option<NaiveDate>,
    pub not_due_balance: Decimal,
    pub not_due_date: Option<NaiveDate>,
    pub valor: i32,
    pub total_balance: Decimal,
    pub reference_date: Option<NaiveDate>,
}

/// A balance snapshot bound to a resolved customer id, ready for upsert.
#[derive(Debug, Clone)]
pub struct NewBalance {
    pub customer_id: Uuid,
    pub values: BalanceValues,
}

// ============================================================================
// Note Models
// ============================================================================

/// A collections note. Append-only: content may be edited and the reminder
/// completed, nothing else mutates and notes are never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Note {
    pub note_id: Uuid,
    pub customer_id: Uuid,
    pub content: String,
    pub promise_date: Option<NaiveDate>,
    pub reminder_date: Option<NaiveDate>,
    pub reminder_completed: bool,
    pub balance_at_time: Decimal,
    pub created_utc: DateTime<Utc>,
}

// ============================================================================
// Classification Models
// ============================================================================

/// Risk tier suggested by the score or set by a human. Special and Custom are
/// only ever produced by a manual override, never by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationBucket {
    Green,
    Yellow,
    Red,
    Black,
    Special,
    Custom,
}

impl ClassificationBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Black => "black",
            Self::Special => "special",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "green" => Some(Self::Green),
            "yellow" => Some(Self::Yellow),
            "red" => Some(Self::Red),
            "black" => Some(Self::Black),
            "special" => Some(Self::Special),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClassificationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived due-date classification, recomputed on demand from a stored
/// balance. Never persisted as ground truth.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub is_past_due: bool,
    pub is_upcoming: bool,
    pub due_date: Option<NaiveDate>,
    pub past_due_balance: Decimal,
    pub not_due_balance: Decimal,
    pub total_balance: Decimal,
    pub is_customer: bool,
    pub is_supplier: bool,
}

/// 0-100 risk score with its independently-capped components. A decision aid
/// feeding a human-settable classification, not an action trigger.
#[derive(Debug, Clone, Serialize)]
pub struct RiskScore {
    pub past_due_ratio: f64,
    pub overdue_age: f64,
    pub note_volume: f64,
    pub broken_promises: f64,
    pub total: u8,
    pub bucket: ClassificationBucket,
}

/// Everything a dashboard or report consumer needs for one customer.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerAssessment {
    pub customer_id: Uuid,
    pub classification: Classification,
    pub risk: RiskScore,
}
