//! Current-vs-previous period aggregation over one ledger snapshot.

use crate::error::{AnalyticsError, Result};
use crate::schema::Transaction;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Smallest window covering every transaction date in the snapshot.
    /// A single transaction yields a one-day period.
    pub fn spanning(transactions: &[Transaction]) -> Result<Self> {
        let start = transactions.iter().map(|tx| tx.date).min();
        let end = transactions.iter().map(|tx| tx.date).max();
        match (start, end) {
            (Some(start), Some(end)) => Period::new(start, end),
            _ => Err(AnalyticsError::EmptyLedger),
        }
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The immediately preceding window of equal length, ending the day
    /// before this one starts.
    pub fn preceding(&self) -> Self {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.duration_days() - 1);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Income/expense totals for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
    /// Expense magnitudes per category label.
    pub by_category: BTreeMap<String, f64>,
    pub transaction_count: usize,
}

/// Percentage changes against the previous period. Zero-base cases
/// report defined sentinels (0 when both sides are zero, otherwise
/// ±100), never a division by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodChange {
    pub income_change_pct: f64,
    pub expenses_change_pct: f64,
    pub balance_change_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub comparison: PeriodChange,
}

/// Sum one window of the snapshot. Income is the magnitude sum of
/// client receipts, expenses the magnitude sum of everything else.
pub fn aggregate_period(transactions: &[Transaction], period: Period) -> PeriodSummary {
    let in_window: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| period.contains(tx.date))
        .collect();

    let income: f64 = in_window
        .iter()
        .filter(|tx| tx.category.is_income())
        .map(|tx| tx.magnitude())
        .sum();
    let expenses: f64 = in_window
        .iter()
        .filter(|tx| tx.category.is_expense())
        .map(|tx| tx.magnitude())
        .sum();

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for tx in in_window.iter().filter(|tx| tx.category.is_expense()) {
        *by_category
            .entry(tx.category.label().to_string())
            .or_insert(0.0) += tx.magnitude();
    }

    PeriodSummary {
        start: period.start,
        end: period.end,
        income,
        expenses,
        balance: income - expenses,
        by_category,
        transaction_count: in_window.len(),
    }
}

fn change_pct(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current == 0.0 {
        0.0
    } else {
        100.0
    }
}

fn balance_change_pct(current: f64, previous: f64) -> f64 {
    if previous != 0.0 {
        (current - previous) / previous.abs() * 100.0
    } else if current == 0.0 {
        0.0
    } else if current > 0.0 {
        100.0
    } else {
        -100.0
    }
}

/// Compare the current window against the previous one. When no bounds
/// are supplied the current period spans the snapshot and the previous
/// period is the immediately preceding window of equal length.
pub fn compare_periods(
    transactions: &[Transaction],
    current: Option<Period>,
    previous: Option<Period>,
) -> Result<PeriodComparison> {
    let current = match current {
        Some(period) => period,
        None => Period::spanning(transactions)?,
    };
    let previous = previous.unwrap_or_else(|| current.preceding());

    let current_summary = aggregate_period(transactions, current);
    let previous_summary = aggregate_period(transactions, previous);

    let comparison = PeriodChange {
        income_change_pct: change_pct(current_summary.income, previous_summary.income),
        expenses_change_pct: change_pct(current_summary.expenses, previous_summary.expenses),
        balance_change_pct: balance_change_pct(
            current_summary.balance,
            previous_summary.balance,
        ),
    };

    Ok(PeriodComparison {
        current: current_summary,
        previous: previous_summary,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;

    fn tx(date: (i32, u32, u32), amount: f64, category: Category) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            category,
            subcategory: None,
            counterparty: None,
            purpose: String::new(),
        }
    }

    #[test]
    fn test_single_day_snapshot() {
        let transactions = vec![
            tx((2025, 3, 1), 10_000.0, Category::ClientReceipt),
            tx((2025, 3, 1), -3_000.0, Category::Rent),
        ];

        let result = compare_periods(&transactions, None, None).unwrap();
        assert_eq!(result.current.start, result.current.end);
        assert_eq!(
            Period::new(result.current.start, result.current.end)
                .unwrap()
                .duration_days(),
            1
        );
        assert_eq!(result.current.income, 10_000.0);
        assert_eq!(result.current.expenses, 3_000.0);
        assert_eq!(result.current.balance, 7_000.0);
    }

    #[test]
    fn test_balance_identity() {
        let transactions = vec![
            tx((2025, 3, 1), 12_000.0, Category::ClientReceipt),
            tx((2025, 3, 5), -2_000.0, Category::Salary),
            tx((2025, 3, 9), -500.0, Category::Other),
        ];
        let summary = aggregate_period(&transactions, Period::spanning(&transactions).unwrap());
        assert_eq!(summary.balance, summary.income - summary.expenses);
        assert_eq!(summary.by_category.get("salary"), Some(&2_000.0));
        assert_eq!(summary.by_category.get("other"), Some(&500.0));
    }

    #[test]
    fn test_preceding_period_has_equal_length() {
        let current = Period::new(
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
        )
        .unwrap();
        let previous = current.preceding();
        assert_eq!(previous.end, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(previous.duration_days(), current.duration_days());
    }

    #[test]
    fn test_zero_base_sentinels() {
        // All data in the current window: the previous window is empty.
        let transactions = vec![tx((2025, 3, 1), 5_000.0, Category::ClientReceipt)];
        let result = compare_periods(&transactions, None, None).unwrap();

        assert_eq!(result.previous.income, 0.0);
        assert_eq!(result.comparison.income_change_pct, 100.0);
        assert_eq!(result.comparison.expenses_change_pct, 0.0);
        assert_eq!(result.comparison.balance_change_pct, 100.0);
        assert!(result.comparison.income_change_pct.is_finite());
    }

    #[test]
    fn test_explicit_bounds_split_snapshot() {
        let transactions = vec![
            tx((2025, 2, 10), 8_000.0, Category::ClientReceipt),
            tx((2025, 2, 15), -1_000.0, Category::Advertising),
            tx((2025, 3, 10), 10_000.0, Category::ClientReceipt),
            tx((2025, 3, 15), -2_000.0, Category::Advertising),
        ];
        let current = Period::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 28).unwrap(),
        )
        .unwrap();
        let previous = Period::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        )
        .unwrap();

        let result = compare_periods(&transactions, Some(current), Some(previous)).unwrap();
        assert_eq!(result.current.income, 10_000.0);
        assert_eq!(result.previous.income, 8_000.0);
        assert!((result.comparison.income_change_pct - 25.0).abs() < 1e-9);
        assert!((result.comparison.expenses_change_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_is_an_error() {
        let result = compare_periods(&[], None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_period_rejected() {
        let result = Period::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        assert!(result.is_err());
    }
}
