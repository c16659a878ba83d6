//! receivables-service: accounts-receivable ledger import, reconciliation
//! and risk classification.
//!
//! The pipeline is sequential: a spreadsheet export is parsed to completion
//! into a candidate map (one record per customer code), then merged into the
//! store batch by batch, then the classification engine derives due-date
//! flags and a 0-100 risk score on demand from the stored snapshot.

pub mod config;
pub mod import;
pub mod models;
pub mod services;
