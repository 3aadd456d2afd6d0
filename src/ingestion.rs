//! Normalization of raw ledger rows into typed transactions.
//!
//! A malformed row (missing date/amount/category, unparsable date or
//! amount) is counted and skipped; it never fails the batch.

use crate::error::{AnalyticsError, Result};
use crate::schema::{Category, LedgerRow, Transaction};
use chrono::NaiveDate;
use log::{debug, warn};

/// Outcome of normalizing one upload.
#[derive(Debug, Clone)]
pub struct NormalizedLedger {
    pub transactions: Vec<Transaction>,
    /// Rows dropped because a required field was missing or unparsable.
    pub excluded: usize,
}

/// Accepts `YYYY-MM-DD` and ISO datetimes (the date part before `T`).
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw.trim().split('T').next().unwrap_or("");
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| AnalyticsError::DateError(format!("Unparsable date '{}'", raw)))
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().replace(' ', "").replace(',', ".").parse().ok()
}

fn normalize_row(row: &LedgerRow) -> Option<Transaction> {
    let date = parse_date(row.date.as_deref()?).ok()?;
    let amount = parse_amount(row.amount.as_deref()?)?;
    let category = Category::from_label(row.category.as_deref()?.trim());

    Some(Transaction {
        date,
        amount,
        category,
        subcategory: row
            .subcategory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        counterparty: row
            .counterparty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        purpose: row.purpose.clone().unwrap_or_default(),
    })
}

/// Convert raw rows into transactions, counting every exclusion.
pub fn normalize_rows(rows: &[LedgerRow]) -> NormalizedLedger {
    let mut transactions = Vec::with_capacity(rows.len());
    let mut excluded = 0;

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row) {
            Some(tx) => transactions.push(tx),
            None => {
                excluded += 1;
                warn!("Excluding malformed ledger row {}", index + 1);
            }
        }
    }

    debug!(
        "Normalized {} rows: {} kept, {} excluded",
        rows.len(),
        transactions.len(),
        excluded
    );

    NormalizedLedger {
        transactions,
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, amount: &str, category: &str) -> LedgerRow {
        LedgerRow {
            date: Some(date.to_string()),
            amount: Some(amount.to_string()),
            category: Some(category.to_string()),
            subcategory: None,
            counterparty: Some("Acme".to_string()),
            purpose: Some("payment for services".to_string()),
        }
    }

    #[test]
    fn test_well_formed_rows_pass_through() {
        let rows = vec![
            row("2025-03-01", "10000", "client_receipt"),
            row("2025-03-02", "-3000.50", "rent"),
        ];
        let ledger = normalize_rows(&rows);
        assert_eq!(ledger.transactions.len(), 2);
        assert_eq!(ledger.excluded, 0);
        assert_eq!(ledger.transactions[0].category, Category::ClientReceipt);
        assert_eq!(ledger.transactions[1].amount, -3000.50);
    }

    #[test]
    fn test_iso_datetime_and_comma_decimal_accepted() {
        let rows = vec![row("2025-03-01T14:30:00", "1 234,56", "other")];
        let ledger = normalize_rows(&rows);
        assert_eq!(ledger.excluded, 0);
        assert_eq!(
            ledger.transactions[0].date,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(ledger.transactions[0].amount, 1234.56);
    }

    #[test]
    fn test_malformed_rows_counted_not_fatal() {
        let rows = vec![
            row("2025-03-01", "10000", "client_receipt"),
            row("not a date", "10000", "client_receipt"),
            row("2025-03-02", "ten thousand", "rent"),
            LedgerRow::default(),
        ];
        let ledger = normalize_rows(&rows);
        assert_eq!(ledger.transactions.len(), 1);
        assert_eq!(ledger.excluded, 3);
    }

    #[test]
    fn test_unknown_category_kept_as_unrecognized() {
        let rows = vec![row("2025-03-01", "-500", "pet grooming")];
        let ledger = normalize_rows(&rows);
        assert_eq!(ledger.excluded, 0);
        assert_eq!(
            ledger.transactions[0].category,
            Category::Unrecognized("pet grooming".to_string())
        );
    }
}
