//! Ledger import pipeline: workbook -> header resolution -> row processing
//! -> reconciliation against the store.

pub mod normalize;
pub mod rows;
pub mod schema;

use crate::config::ImportConfig;
use crate::import::normalize::cell_to_string;
use crate::import::rows::collect_candidates;
use crate::import::schema::ColumnMap;
use crate::services::reconcile::{reconcile, ReconcileSummary};
use crate::services::store::LedgerStore;
use calamine::{open_workbook_auto, Data, Range, Reader};
use service_core::error::AppError;
use std::path::Path;
use tracing::{error, info, instrument};

/// Operator-visible proof of what an import run did. There is no other audit
/// log; this summary is reported even when the run aborts partway.
#[derive(Debug, Default, Clone)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_skipped_empty: usize,
    pub rows_skipped_duplicate: usize,
    pub cells_defaulted: usize,
    pub records_processed: usize,
    pub customers_created: usize,
    pub customers_updated: usize,
    pub balances_created: usize,
    pub balances_updated: usize,
}

impl ImportSummary {
    fn merge_reconcile(&mut self, r: &ReconcileSummary) {
        self.records_processed = r.records_processed;
        self.customers_created = r.customers_created;
        self.customers_updated = r.customers_updated;
        self.balances_created = r.balances_created;
        self.balances_updated = r.balances_updated;
    }
}

/// Result of an import run. `error` is set on structural failure (bad schema,
/// failed batch); the summary always carries the counts gathered before it.
#[derive(Debug)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub error: Option<AppError>,
}

impl ImportOutcome {
    fn failed(summary: ImportSummary, error: AppError) -> Self {
        Self {
            summary,
            error: Some(error),
        }
    }
}

/// Imports the first worksheet of a spreadsheet file.
#[instrument(skip(store), fields(path = %path.as_ref().display()))]
pub async fn import_workbook<S: LedgerStore>(
    store: &S,
    path: impl AsRef<Path>,
    options: &ImportConfig,
) -> ImportOutcome {
    let mut workbook = match open_workbook_auto(path.as_ref()) {
        Ok(wb) => wb,
        Err(e) => {
            return ImportOutcome::failed(
                ImportSummary::default(),
                AppError::ImportError(anyhow::anyhow!(
                    "Cannot open workbook {}: {}",
                    path.as_ref().display(),
                    e
                )),
            );
        }
    };

    let sheet_name = match workbook.sheet_names().first().cloned() {
        Some(name) => name,
        None => {
            return ImportOutcome::failed(
                ImportSummary::default(),
                AppError::ImportError(anyhow::anyhow!("Workbook has no sheets")),
            );
        }
    };

    let range = match workbook.worksheet_range(&sheet_name) {
        Ok(range) => range,
        Err(e) => {
            return ImportOutcome::failed(
                ImportSummary::default(),
                AppError::ImportError(anyhow::anyhow!(
                    "Cannot read sheet '{}': {}",
                    sheet_name,
                    e
                )),
            );
        }
    };

    import_range(store, &range, options).await
}

/// Imports an already-loaded worksheet range. Split out from
/// [`import_workbook`] so callers and tests can feed in-memory sheets.
pub async fn import_range<S: LedgerStore>(
    store: &S,
    range: &Range<Data>,
    options: &ImportConfig,
) -> ImportOutcome {
    let mut summary = ImportSummary::default();

    let headers: Vec<String> = match range.rows().next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => {
            return ImportOutcome::failed(
                summary,
                AppError::ImportError(anyhow::anyhow!("Worksheet is empty")),
            );
        }
    };

    let columns = match ColumnMap::resolve(&headers) {
        Ok(columns) => columns,
        Err(e) => {
            error!(error = %e, "Header resolution failed, aborting import");
            return ImportOutcome::failed(summary, e);
        }
    };

    let candidates = collect_candidates(range, &columns, options.number_locale);
    summary.rows_read = candidates.rows_read;
    summary.rows_skipped_empty = candidates.rows_skipped_empty;
    summary.rows_skipped_duplicate = candidates.rows_skipped_duplicate;
    summary.cells_defaulted = candidates.cells_defaulted;

    info!(
        rows = summary.rows_read,
        candidates = candidates.records.len(),
        skipped_empty = summary.rows_skipped_empty,
        skipped_duplicate = summary.rows_skipped_duplicate,
        "Worksheet parsed, starting reconciliation"
    );

    let outcome = reconcile(store, candidates.records, options).await;
    summary.merge_reconcile(&outcome.summary);

    info!(
        records_processed = summary.records_processed,
        customers_created = summary.customers_created,
        customers_updated = summary.customers_updated,
        balances_created = summary.balances_created,
        balances_updated = summary.balances_updated,
        success = outcome.error.is_none(),
        "Import run finished"
    );

    ImportOutcome {
        summary,
        error: outcome.error,
    }
}
