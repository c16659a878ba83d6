//! Integration tests for customer assessment over the store.

mod common;

use common::{init_tracing, ledger_header, ledger_row, sheet, test_options, MemoryStore};
use chrono::{Duration, NaiveDate, Utc};
use receivables_service::import::import_range;
use receivables_service::models::{BalanceRecord, ClassificationBucket};
use receivables_service::services::classification::assess_customer;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn snapshot(customer_id: Uuid, past_due: &str, not_due: &str, total: &str) -> BalanceRecord {
    BalanceRecord {
        balance_id: Uuid::new_v4(),
        customer_id,
        past_due_balance: Decimal::from_str(past_due).unwrap(),
        past_due_date: None,
        not_due_balance: Decimal::from_str(not_due).unwrap(),
        not_due_date: None,
        valor: 0,
        total_balance: Decimal::from_str(total).unwrap(),
        reference_date: None,
        updated_utc: Utc::now(),
    }
}

#[tokio::test]
async fn assessment_combines_classification_and_risk() {
    init_tracing();
    let store = MemoryStore::new();
    let today = ymd(2025, 6, 1);

    let customer_id = store.seed_customer("C1");
    let mut balance = snapshot(customer_id, "1000", "0", "1000");
    balance.past_due_date = Some(today - Duration::days(90));
    store.seed_balance(customer_id, balance);

    let assessment = assess_customer(&store, customer_id, today, 15)
        .await
        .unwrap()
        .unwrap();

    assert!(assessment.classification.is_past_due);
    assert!(!assessment.classification.is_upcoming);
    assert!(assessment.classification.is_customer);
    assert_eq!(assessment.risk.total, 80);
    assert_eq!(assessment.risk.bucket, ClassificationBucket::Black);
}

#[tokio::test]
async fn note_history_raises_the_score() {
    init_tracing();
    let store = MemoryStore::new();
    let today = ymd(2025, 6, 1);

    let customer_id = store.seed_customer("C2");
    store.seed_balance(customer_id, snapshot(customer_id, "500", "0", "1000"));

    // Six notes, three with already-broken promises.
    for _ in 0..3 {
        store.seed_note(customer_id, None);
        store.seed_note(customer_id, Some(today - Duration::days(10)));
    }

    let assessment = assess_customer(&store, customer_id, today, 15)
        .await
        .unwrap()
        .unwrap();

    // Ratio 0.5 * 90 capped at 45, plus 1 for volume and 10 for promises.
    assert_eq!(assessment.risk.past_due_ratio, 45.0);
    assert_eq!(assessment.risk.note_volume, 1.0);
    assert_eq!(assessment.risk.broken_promises, 10.0);
    assert_eq!(assessment.risk.total, 56);
    assert_eq!(assessment.risk.bucket, ClassificationBucket::Yellow);
}

#[tokio::test]
async fn customer_without_balance_has_no_assessment() {
    init_tracing();
    let store = MemoryStore::new();
    let customer_id = store.seed_customer("C3");

    let assessment = assess_customer(&store, customer_id, ymd(2025, 6, 1), 15)
        .await
        .unwrap();
    assert!(assessment.is_none());
}

#[tokio::test]
async fn supplier_balances_classify_as_supplier_and_score_low() {
    init_tracing();
    let store = MemoryStore::new();
    let today = ymd(2025, 6, 1);

    let customer_id = store.seed_customer("C4");
    store.seed_balance(customer_id, snapshot(customer_id, "0", "0", "-2500"));

    let assessment = assess_customer(&store, customer_id, today, 15)
        .await
        .unwrap()
        .unwrap();

    assert!(assessment.classification.is_supplier);
    assert!(!assessment.classification.is_customer);
    assert_eq!(assessment.risk.total, 0);
    assert_eq!(assessment.risk.bucket, ClassificationBucket::Green);
}

#[tokio::test]
async fn imported_balances_feed_the_assessment() {
    init_tracing();
    let store = MemoryStore::new();
    let today = ymd(2025, 6, 1);

    let range = sheet(vec![
        ledger_header(),
        ledger_row("C5", "Epsilon AG", "16.612,48", "0,00"),
    ]);
    let outcome = import_range(&store, &range, &test_options()).await;
    assert!(outcome.error.is_none());

    let customer = store.customer_by_code("C5").unwrap();
    let assessment = assess_customer(&store, customer.customer_id, today, 15)
        .await
        .unwrap()
        .unwrap();

    assert!(assessment.classification.is_past_due);
    assert_eq!(
        assessment.classification.past_due_balance,
        Decimal::from_str("16612.48").unwrap()
    );
}
