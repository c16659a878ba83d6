//! Cell value normalization for ledger spreadsheet exports.
//!
//! Exports arrive with locale-ambiguous numbers ("16.612,48" vs "16,612.48")
//! and dates as Excel serials, dotted strings or ISO strings. Everything here
//! is best-effort: a bad cell collapses to 0 / None and the import continues.
//! The [`Parsed`] wrapper keeps silently-defaulted cells distinguishable so
//! the row processor can log them.

use calamine::Data;
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Declared number locale for a whole import run. When set, the per-cell
/// separator heuristic is bypassed entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLocale {
    /// Dot as thousands separator, comma as decimal mark ("16.612,48").
    DotThousands,
    /// Comma as thousands separator, dot as decimal mark ("16,612.48").
    CommaThousands,
}

impl NumberLocale {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eu" | "dot-thousands" => Some(Self::DotThousands),
            "us" | "comma-thousands" => Some(Self::CommaThousands),
            _ => None,
        }
    }
}

/// Outcome of a best-effort conversion. The public contract collapses both
/// cases to the inner value; `Defaulted` marks cells that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<T> {
    Value(T),
    Defaulted(T),
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Parsed::Value(v) | Parsed::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Parsed::Defaulted(_))
    }
}

// Dot = thousands, comma = decimal ("16.612,48").
static DOT_THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(\.\d{3})*(,\d+)?$").unwrap());
// Comma = thousands, dot = decimal ("16,612.48").
static COMMA_THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})*(\.\d+)?$").unwrap());
// Single comma, no grouping ("1234,56").
static PLAIN_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+,\d+$").unwrap());

static ALL_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Converts a raw cell to a decimal amount. Already-numeric cells pass
/// through; empty cells are 0; strings go through the declared locale or the
/// separator heuristic; anything unparseable defaults to 0.
pub fn normalize_number(cell: &Data, locale: Option<NumberLocale>) -> Parsed<Decimal> {
    match cell {
        Data::Empty => Parsed::Value(Decimal::ZERO),
        Data::Int(i) => Parsed::Value(Decimal::from(*i)),
        Data::Float(f) => match Decimal::from_f64(*f) {
            Some(d) => Parsed::Value(d),
            None => Parsed::Defaulted(Decimal::ZERO),
        },
        Data::DateTime(dt) => match Decimal::from_f64(dt.as_f64()) {
            Some(d) => Parsed::Value(d),
            None => Parsed::Defaulted(Decimal::ZERO),
        },
        Data::String(s) => normalize_number_str(s, locale),
        _ => Parsed::Defaulted(Decimal::ZERO),
    }
}

fn normalize_number_str(raw: &str, locale: Option<NumberLocale>) -> Parsed<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return Parsed::Value(Decimal::ZERO);
    }

    let cleaned = match locale {
        Some(NumberLocale::DotThousands) => s.replace('.', "").replace(',', "."),
        Some(NumberLocale::CommaThousands) => s.replace(',', ""),
        None => {
            if DOT_THOUSANDS.is_match(s) {
                s.replace('.', "").replace(',', ".")
            } else if COMMA_THOUSANDS.is_match(s) {
                s.replace(',', "")
            } else if PLAIN_COMMA.is_match(s) {
                s.replace(',', ".")
            } else {
                s.to_string()
            }
        }
    };

    match Decimal::from_str(&cleaned) {
        Ok(d) => Parsed::Value(d),
        Err(_) => Parsed::Defaulted(Decimal::ZERO),
    }
}

/// Converts a raw cell to a calendar date. Serial numbers use the 1900 date
/// system with a single epoch rule (see [`serial_to_date`]); strings accept
/// `dd.mm.yyyy`, `yyyy-mm-dd`, all-digit serials and a few generic formats.
/// An absent cell is a legitimate None; an unparseable one defaults to None.
pub fn normalize_date(cell: &Data) -> Parsed<Option<NaiveDate>> {
    match cell {
        Data::Empty => Parsed::Value(None),
        Data::Int(i) => defaulted_unless(serial_to_date(*i as f64)),
        Data::Float(f) => defaulted_unless(serial_to_date(*f)),
        Data::DateTime(dt) => defaulted_unless(serial_to_date(dt.as_f64())),
        Data::DateTimeIso(s) => defaulted_unless(
            s.get(0..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        ),
        Data::String(s) => normalize_date_str(s),
        _ => Parsed::Defaulted(None),
    }
}

fn normalize_date_str(raw: &str) -> Parsed<Option<NaiveDate>> {
    let s = raw.trim();
    if s.is_empty() {
        return Parsed::Value(None);
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%d.%m.%Y") {
        return Parsed::Value(Some(d));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Parsed::Value(Some(d));
    }
    if ALL_DIGITS.is_match(s) {
        if let Some(d) = s.parse::<f64>().ok().and_then(serial_to_date) {
            return Parsed::Value(Some(d));
        }
        return Parsed::Defaulted(None);
    }
    // Generic fallbacks for exports that render full timestamps.
    if let Some(d) = s
        .get(0..10)
        .and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok())
    {
        return Parsed::Value(Some(d));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Parsed::Value(Some(d));
    }

    Parsed::Defaulted(None)
}

fn defaulted_unless(date: Option<NaiveDate>) -> Parsed<Option<NaiveDate>> {
    match date {
        Some(d) => Parsed::Value(Some(d)),
        None => Parsed::Defaulted(None),
    }
}

/// 1900-date-system serial to calendar date.
///
/// Epoch is 1899-12-31 (serial 1 = 1900-01-01); serials above 59 are shifted
/// back one day to absorb the phantom 1900-02-29 the 1900 system counts.
/// Serial 25569 lands on the Unix epoch. This is the only conversion rule:
/// no further day shifts are applied anywhere.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    // 2958465 = 9999-12-31; anything outside is not a plausible ledger date.
    if days <= 0 || days > 2_958_465 {
        return None;
    }
    let days = if days > 59 { days - 1 } else { days };
    NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_signed(Duration::days(days))
}

/// String form of a cell, for code/name/term columns.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Codes exported as numeric cells ("1001.0") keep integer form.
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
