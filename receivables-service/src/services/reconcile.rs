//! Reconciliation: merge a parsed candidate map into the persistent store.
//!
//! Idempotent by construction: customers upsert on `code`, balances on
//! `customer_id`. Candidates are processed in fixed-size batches with a short
//! courtesy pause between them. The first failing batch stops the run;
//! counters gathered so far are always returned so the operator sees the
//! partial impact.

use crate::config::ImportConfig;
use crate::import::rows::Candidate;
use crate::models::{NewBalance, NewCustomer};
use crate::services::store::LedgerStore;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Create/update tallies for one reconciliation run. Threaded explicitly
/// through the batch loop; this is the primary audit surface of an import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub records_processed: usize,
    pub customers_created: usize,
    pub customers_updated: usize,
    pub balances_created: usize,
    pub balances_updated: usize,
}

/// Summary plus the error that stopped the run, if any.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub summary: ReconcileSummary,
    pub error: Option<AppError>,
}

/// Merges candidates into the store batch by batch.
pub async fn reconcile<S: LedgerStore>(
    store: &S,
    candidates: BTreeMap<String, Candidate>,
    options: &ImportConfig,
) -> ReconcileOutcome {
    let mut summary = ReconcileSummary::default();
    let batch_size = options.batch_size.max(1);

    let candidates: Vec<(String, Candidate)> = candidates.into_iter().collect();
    let batch_count = candidates.len().div_ceil(batch_size);

    for (batch_idx, batch) in candidates.chunks(batch_size).enumerate() {
        match reconcile_batch(store, batch, &mut summary).await {
            Ok(()) => {
                debug!(
                    batch = batch_idx + 1,
                    of = batch_count,
                    records = batch.len(),
                    "Batch reconciled"
                );
            }
            Err(e) => {
                error!(
                    batch = batch_idx + 1,
                    of = batch_count,
                    error = %e,
                    "Batch failed, aborting remaining batches"
                );
                return ReconcileOutcome {
                    summary,
                    error: Some(e),
                };
            }
        }

        // Courtesy throttle between batches, not a correctness requirement.
        if batch_idx + 1 < batch_count && options.batch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.batch_delay_ms)).await;
        }
    }

    ReconcileOutcome {
        summary,
        error: None,
    }
}

async fn reconcile_batch<S: LedgerStore>(
    store: &S,
    batch: &[(String, Candidate)],
    summary: &mut ReconcileSummary,
) -> Result<(), AppError> {
    let codes: Vec<String> = batch.iter().map(|(code, _)| code.clone()).collect();

    // Split created vs updated against the pre-upsert store state.
    let existing: HashSet<String> = store
        .customers_by_codes(&codes)
        .await?
        .into_iter()
        .map(|c| c.code)
        .collect();

    let customer_rows: Vec<NewCustomer> = batch
        .iter()
        .map(|(_, candidate)| candidate.customer.clone())
        .collect();
    let upserted = store.upsert_customers(&customer_rows).await?;

    let mut ids_by_code: HashMap<String, Uuid> = upserted
        .into_iter()
        .map(|c| (c.code, c.customer_id))
        .collect();

    // A store that does not return upserted rows directly gets re-queried
    // once to recover the ids.
    let missing: Vec<String> = codes
        .iter()
        .filter(|code| !ids_by_code.contains_key(*code))
        .cloned()
        .collect();
    if !missing.is_empty() {
        for customer in store.customers_by_codes(&missing).await? {
            ids_by_code.insert(customer.code, customer.customer_id);
        }
    }

    let mut balance_rows: Vec<NewBalance> = Vec::with_capacity(batch.len());
    for (code, candidate) in batch {
        match ids_by_code.get(code) {
            Some(&customer_id) => balance_rows.push(NewBalance {
                customer_id,
                values: candidate.balance.clone(),
            }),
            // A single unresolved row must not abort the batch.
            None => warn!(code = %code, "Customer id unresolved after upsert, skipping balance"),
        }
    }

    // Tally only codes with a resolved id; an unresolved code never made it
    // into the store and must not inflate the audit counters.
    for (code, _) in batch {
        if !ids_by_code.contains_key(code) {
            continue;
        }
        if existing.contains(code) {
            summary.customers_updated += 1;
        } else {
            summary.customers_created += 1;
        }
    }

    let resolved_ids: Vec<Uuid> = balance_rows.iter().map(|b| b.customer_id).collect();
    let with_balance: HashSet<Uuid> = store
        .customer_ids_with_balance(&resolved_ids)
        .await?
        .into_iter()
        .collect();

    store.upsert_balances(&balance_rows).await?;

    for row in &balance_rows {
        if with_balance.contains(&row.customer_id) {
            summary.balances_updated += 1;
        } else {
            summary.balances_created += 1;
        }
    }

    summary.records_processed += batch.len();
    Ok(())
}
