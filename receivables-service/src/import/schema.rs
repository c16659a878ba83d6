//! Header resolution for ledger exports.
//!
//! The accounting system does not guarantee column order or exact header
//! text, so semantic fields are located by case-insensitive substring
//! matching. Keywords are tried in priority order and the first header
//! containing one wins; there is no best-match scoring.

use service_core::error::AppError;

/// Resolved column indices for one worksheet. `code` and `name` are the only
/// hard requirements; everything else degrades to null/zero when absent.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub code: usize,
    pub name: usize,
    pub sector_code: Option<usize>,
    pub group_code: Option<usize>,
    pub region_code: Option<usize>,
    pub payment_term: Option<usize>,
    pub past_due_balance: Option<usize>,
    pub past_due_date: Option<usize>,
    pub not_due_balance: Option<usize>,
    pub not_due_date: Option<usize>,
    pub valor: Option<usize>,
    pub total_balance: Option<usize>,
    pub reference_date: Option<usize>,
}

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    for keyword in keywords {
        for (idx, header) in headers.iter().enumerate() {
            if header.to_lowercase().contains(keyword) {
                return Some(idx);
            }
        }
    }
    None
}

// Last-resort lookup for the generic labels. Substring matching would let
// "Sector Code" or "Group Name" satisfy the customer code/name requirement,
// so the bare words only match a header that is exactly that word.
fn find_exact(headers: &[String], label: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(label))
}

impl ColumnMap {
    /// Resolves the header row. A ledger without a customer code or name
    /// column is meaningless, so those two failing aborts the whole import.
    pub fn resolve(headers: &[String]) -> Result<ColumnMap, AppError> {
        let code = find_column(headers, &["customer code", "client code"])
            .or_else(|| find_exact(headers, "code"))
            .ok_or_else(|| {
                AppError::ImportError(anyhow::anyhow!(
                    "No customer code column found in header row: {:?}",
                    headers
                ))
            })?;
        let name = find_column(headers, &["customer name", "client name"])
            .or_else(|| find_exact(headers, "name"))
            .ok_or_else(|| {
                AppError::ImportError(anyhow::anyhow!(
                    "No customer name column found in header row: {:?}",
                    headers
                ))
            })?;

        Ok(ColumnMap {
            code,
            name,
            sector_code: find_column(headers, &["sector"]),
            group_code: find_column(headers, &["group"]),
            region_code: find_column(headers, &["region"]),
            payment_term: find_column(headers, &["payment term", "terms"]),
            past_due_balance: find_column(
                headers,
                &["past due balance", "overdue balance", "past due amount"],
            ),
            past_due_date: find_column(
                headers,
                &["past due balance due date", "past due date", "overdue date"],
            ),
            not_due_balance: find_column(
                headers,
                &["not due balance", "not yet due", "upcoming balance"],
            ),
            not_due_date: find_column(
                headers,
                &["not due balance due date", "not due date", "upcoming date"],
            ),
            valor: find_column(headers, &["valor"]),
            total_balance: find_column(headers, &["total balance", "balance total"]),
            reference_date: find_column(
                headers,
                &[
                    "reference document date",
                    "first document date",
                    "reference date",
                    "document date",
                ],
            ),
        })
    }
}
