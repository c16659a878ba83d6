//! Row processing: raw worksheet rows into a deduplicated candidate map.
//!
//! The whole file is parsed to completion before any store write happens;
//! the candidate map is the reconciler's unit of work.

use crate::import::normalize::{cell_to_string, normalize_date, normalize_number, NumberLocale};
use crate::import::schema::ColumnMap;
use crate::models::{BalanceValues, NewCustomer};
use calamine::{Data, Range};
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use tracing::warn;

/// One candidate customer/balance pair, keyed by code in [`CandidateSet`].
#[derive(Debug, Clone)]
pub struct Candidate {
    pub customer: NewCustomer,
    pub balance: BalanceValues,
}

/// Everything the row processor extracted from one worksheet.
#[derive(Debug, Default)]
pub struct CandidateSet {
    pub records: BTreeMap<String, Candidate>,
    pub rows_read: usize,
    pub rows_skipped_empty: usize,
    pub rows_skipped_duplicate: usize,
    pub cells_defaulted: usize,
}

fn cell<'a>(row: &'a [Data], idx: usize) -> &'a Data {
    row.get(idx).unwrap_or(&Data::Empty)
}

fn opt_cell<'a>(row: &'a [Data], idx: Option<usize>) -> &'a Data {
    idx.map(|i| cell(row, i)).unwrap_or(&Data::Empty)
}

fn opt_string(row: &[Data], idx: Option<usize>) -> Option<String> {
    let s = cell_to_string(opt_cell(row, idx));
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Iterates data rows (header excluded), skipping empty codes and within-file
/// duplicates (first occurrence wins). Value-level parse failures collapse to
/// 0/None and are counted, never aborting the file.
pub fn collect_candidates(
    range: &Range<Data>,
    columns: &ColumnMap,
    locale: Option<NumberLocale>,
) -> CandidateSet {
    let mut set = CandidateSet::default();

    for row in range.rows().skip(1) {
        set.rows_read += 1;

        let code = cell_to_string(cell(row, columns.code));
        if code.is_empty() {
            set.rows_skipped_empty += 1;
            continue;
        }
        if set.records.contains_key(&code) {
            warn!(code = %code, "Duplicate customer code within file, keeping first occurrence");
            set.rows_skipped_duplicate += 1;
            continue;
        }

        let mut defaulted = 0usize;
        let mut number = |idx: Option<usize>| {
            let parsed = normalize_number(opt_cell(row, idx), locale);
            if parsed.is_defaulted() {
                defaulted += 1;
            }
            parsed.into_inner()
        };
        let past_due_balance = number(columns.past_due_balance);
        let not_due_balance = number(columns.not_due_balance);
        let valor = number(columns.valor).to_i32().unwrap_or(0);

        // The total column is authoritative when it carries a value;
        // otherwise the total is derived from the two components.
        let total_balance = match columns.total_balance {
            Some(idx) if !matches!(cell(row, idx), Data::Empty) => {
                let parsed = normalize_number(cell(row, idx), locale);
                if parsed.is_defaulted() {
                    defaulted += 1;
                    past_due_balance + not_due_balance
                } else {
                    parsed.into_inner()
                }
            }
            _ => past_due_balance + not_due_balance,
        };

        let mut date = |idx: Option<usize>| {
            let parsed = normalize_date(opt_cell(row, idx));
            if parsed.is_defaulted() {
                defaulted += 1;
            }
            parsed.into_inner()
        };
        let past_due_date = date(columns.past_due_date);
        let not_due_date = date(columns.not_due_date);
        let reference_date = date(columns.reference_date);

        if defaulted > 0 {
            warn!(
                code = %code,
                cells = defaulted,
                "Unparseable cells defaulted to 0/null"
            );
            set.cells_defaulted += defaulted;
        }

        set.records.insert(
            code.clone(),
            Candidate {
                customer: NewCustomer {
                    code,
                    name: opt_string(row, Some(columns.name)),
                    sector_code: opt_string(row, columns.sector_code),
                    group_code: opt_string(row, columns.group_code),
                    region_code: opt_string(row, columns.region_code),
                    payment_term: opt_string(row, columns.payment_term),
                },
                balance: BalanceValues {
                    past_due_balance,
                    past_due_date,
                    not_due_balance,
                    not_due_date,
                    valor,
                    total_balance,
                    reference_date,
                },
            },
        );
    }

    set
}
