//! Due-date classification and risk scoring.
//!
//! Pure functions over the current balance snapshot and note history; no
//! state machine and no writes, so report and dashboard consumers can call
//! these concurrently. The score suggests a bucket, it never triggers an
//! automated action.

use crate::models::{
    BalanceRecord, Classification, ClassificationBucket, CustomerAssessment, Note, RiskScore,
};
use crate::services::store::LedgerStore;
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

/// Balances at or below this threshold (100 currency units) are not flagged.
pub const MIN_BALANCE: Decimal = Decimal::ONE_HUNDRED;

/// Default look-ahead window for upcoming-due balances, in days.
pub const DEFAULT_UPCOMING_DAYS: i64 = 15;

/// True iff the past-due amount exceeds the threshold. Deliberately ignores
/// the date: a nonzero past-due amount imported from the ledger is already
/// overdue by definition.
pub fn is_past_due(balance: &BalanceRecord) -> bool {
    balance.past_due_balance > MIN_BALANCE
}

/// True iff the not-due amount exceeds the threshold and its due date falls
/// within `[today, today + days_ahead]` inclusive.
pub fn is_upcoming(balance: &BalanceRecord, today: NaiveDate, days_ahead: i64) -> bool {
    if balance.not_due_balance <= MIN_BALANCE {
        return false;
    }
    match balance.not_due_date {
        Some(due) => due >= today && due <= today + Duration::days(days_ahead),
        None => false,
    }
}

/// Recomputes the full derived classification for a balance snapshot.
pub fn classify(balance: &BalanceRecord, today: NaiveDate, days_ahead: i64) -> Classification {
    // The sign of the total, not a separate flag, decides which of the two
    // mutually exclusive views this balance belongs to; zero is a customer.
    let is_customer = balance.total_balance >= Decimal::ZERO;

    Classification {
        is_past_due: is_past_due(balance),
        is_upcoming: is_upcoming(balance, today, days_ahead),
        due_date: balance.not_due_date,
        past_due_balance: balance.past_due_balance,
        not_due_balance: balance.not_due_balance,
        total_balance: balance.total_balance,
        is_customer,
        is_supplier: !is_customer,
    }
}

/// 0-100 risk score as a sum of independently-capped components.
pub fn risk_score(balance: &BalanceRecord, notes: &[Note], today: NaiveDate) -> RiskScore {
    let total = balance.total_balance.to_f64().unwrap_or(0.0);
    let past_due = balance.past_due_balance.to_f64().unwrap_or(0.0);

    let past_due_ratio = if total > 0.0 && past_due > 0.0 {
        ((past_due / total).min(1.0) * 90.0).min(45.0)
    } else {
        0.0
    };

    let days_overdue = balance
        .past_due_date
        .map(|d| (today - d).num_days().max(0))
        .unwrap_or(0);
    let overdue_age = (days_overdue as f64 / 90.0).min(1.0) * 35.0;

    let note_count = notes.len();
    let note_volume = if note_count > 5 {
        ((note_count - 5) as f64 / 10.0).min(1.0) * 10.0
    } else {
        0.0
    };

    let missed_promises = notes
        .iter()
        .filter(|n| n.promise_date.map(|d| d < today).unwrap_or(false))
        .count();
    let broken_promises = (missed_promises as f64 / 3.0).min(1.0) * 10.0;

    let total_score = (past_due_ratio + overdue_age + note_volume + broken_promises).round() as u8;

    RiskScore {
        past_due_ratio,
        overdue_age,
        note_volume,
        broken_promises,
        total: total_score,
        bucket: suggest_bucket(total_score),
    }
}

/// Suggested classification bucket for a score.
pub fn suggest_bucket(score: u8) -> ClassificationBucket {
    match score {
        0..=29 => ClassificationBucket::Green,
        30..=59 => ClassificationBucket::Yellow,
        60..=79 => ClassificationBucket::Red,
        _ => ClassificationBucket::Black,
    }
}

/// Loads a customer's balance and note history and computes the full
/// assessment. Returns None when the customer has no balance snapshot yet.
pub async fn assess_customer<S: LedgerStore>(
    store: &S,
    customer_id: Uuid,
    today: NaiveDate,
    days_ahead: i64,
) -> Result<Option<CustomerAssessment>, AppError> {
    let balance = match store.balance_for_customer(customer_id).await? {
        Some(balance) => balance,
        None => return Ok(None),
    };
    let notes = store.notes_for_customer(customer_id).await?;

    Ok(Some(CustomerAssessment {
        customer_id,
        classification: classify(&balance, today, days_ahead),
        risk: risk_score(&balance, &notes, today),
    }))
}
