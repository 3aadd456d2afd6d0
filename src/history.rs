//! Historical-statistics provider: the engine's read-only window onto
//! previously analyzed snapshots.
//!
//! The provider is an explicit, injected dependency. Consumers must
//! tolerate its absence: every statistic degrades to a neutral value
//! when no history is available. Two implementations ship with the
//! crate — an in-memory store for tests and embedding, and an
//! append-only JSONL file store whose reads and appends are serialized
//! through one mutex so a reader never observes a half-written entry.

use crate::error::{AnalyticsError, Result};
use crate::schema::{Category, Transaction};
use crate::utils::{mean, sample_std};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Placeholder the upstream parser emits for a missing counterparty.
const COUNTERPARTY_PLACEHOLDER: &str = "—";

/// Aggregate statistics over transaction magnitudes in one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryStatistics {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 when fewer than two observations.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Magnitude totals keyed by "YYYY-MM".
    pub monthly_totals: BTreeMap<String, f64>,
}

/// Per-calendar-month average magnitudes plus a crude trend slope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonalPattern {
    /// Mean transaction magnitude keyed by calendar month (1-12).
    /// Months with no observations are absent.
    pub monthly_avg: BTreeMap<u32, f64>,
    /// (last month's average - first month's average) / months present.
    pub trend: f64,
}

/// Read-only statistics contract consumed by the forecast engine and
/// the anomaly detectors.
pub trait TransactionHistory {
    fn category_statistics(&self, category: &Category, days_back: u32)
        -> Result<CategoryStatistics>;

    fn seasonal_pattern(&self, category: &Category, days_back: u32) -> Result<SeasonalPattern>;

    fn known_counterparties(&self, days_back: u32) -> Result<BTreeSet<String>>;
}

/// One persisted snapshot: the transactions of a completed analysis
/// plus free-form metadata (file name, tax regime, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub transactions: Vec<Transaction>,
}

fn compute_category_statistics<'a, I>(transactions: I, category: &Category) -> CategoryStatistics
where
    I: Iterator<Item = &'a Transaction>,
{
    let matching: Vec<&Transaction> = transactions.filter(|tx| tx.category == *category).collect();

    if matching.is_empty() {
        return CategoryStatistics::default();
    }

    let amounts: Vec<f64> = matching.iter().map(|tx| tx.magnitude()).collect();

    let mut monthly_totals: BTreeMap<String, f64> = BTreeMap::new();
    for tx in &matching {
        let key = format!("{:04}-{:02}", tx.date.year(), tx.date.month());
        *monthly_totals.entry(key).or_insert(0.0) += tx.magnitude();
    }

    CategoryStatistics {
        count: amounts.len(),
        total: amounts.iter().sum(),
        mean: mean(&amounts),
        std: sample_std(&amounts),
        min: amounts.iter().cloned().fold(f64::INFINITY, f64::min),
        max: amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        monthly_totals,
    }
}

fn compute_seasonal_pattern<'a, I>(transactions: I, category: &Category) -> SeasonalPattern
where
    I: Iterator<Item = &'a Transaction>,
{
    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for tx in transactions.filter(|tx| tx.category == *category) {
        by_month.entry(tx.date.month()).or_default().push(tx.magnitude());
    }

    let monthly_avg: BTreeMap<u32, f64> = by_month
        .into_iter()
        .map(|(month, amounts)| (month, mean(&amounts)))
        .collect();

    let trend = if monthly_avg.len() >= 2 {
        let values: Vec<f64> = monthly_avg.values().copied().collect();
        (values[values.len() - 1] - values[0]) / values.len() as f64
    } else {
        0.0
    };

    SeasonalPattern { monthly_avg, trend }
}

fn collect_counterparties<'a, I>(transactions: I) -> BTreeSet<String>
where
    I: Iterator<Item = &'a Transaction>,
{
    transactions
        .filter_map(|tx| tx.counterparty.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != COUNTERPARTY_PLACEHOLDER)
        .map(str::to_string)
        .collect()
}

/// In-memory history, mainly for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: Vec<HistoryEntry>,
    reference_time: Option<DateTime<Utc>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the "now" used for trailing-window cutoffs. Without a pin
    /// the wall clock is used, as a live deployment would.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    pub fn push_snapshot(&mut self, timestamp: DateTime<Utc>, transactions: Vec<Transaction>) {
        self.entries.push(HistoryEntry {
            timestamp,
            metadata: BTreeMap::new(),
            transactions,
        });
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    fn window(&self, days_back: u32) -> impl Iterator<Item = &Transaction> {
        let cutoff = self.now() - chrono::Duration::days(days_back as i64);
        self.entries
            .iter()
            .filter(move |entry| entry.timestamp >= cutoff)
            .flat_map(|entry| entry.transactions.iter())
    }
}

impl TransactionHistory for InMemoryHistory {
    fn category_statistics(
        &self,
        category: &Category,
        days_back: u32,
    ) -> Result<CategoryStatistics> {
        Ok(compute_category_statistics(self.window(days_back), category))
    }

    fn seasonal_pattern(&self, category: &Category, days_back: u32) -> Result<SeasonalPattern> {
        Ok(compute_seasonal_pattern(self.window(days_back), category))
    }

    fn known_counterparties(&self, days_back: u32) -> Result<BTreeSet<String>> {
        Ok(collect_counterparties(self.window(days_back)))
    }
}

/// Append-only JSONL history store. Each line is one `HistoryEntry`.
///
/// Reads parse the whole file and appends write a single line; both
/// run under the same mutex, so a concurrent append can never tear a
/// read (read-then-append discipline). Malformed lines are skipped
/// with a warning rather than poisoning the store.
pub struct JsonlHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
    reference_time: Option<DateTime<Utc>>,
}

impl JsonlHistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            reference_time: None,
        }
    }

    /// Pin the "now" used for trailing-window cutoffs (see
    /// [`InMemoryHistory::with_reference_time`]).
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Append one analyzed snapshot to the log.
    pub fn save_snapshot(
        &self,
        timestamp: DateTime<Utc>,
        transactions: &[Transaction],
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        let entry = HistoryEntry {
            timestamp,
            metadata,
            transactions: transactions.to_vec(),
        };
        let line = serde_json::to_string(&entry)?;

        let _guard = self.lock.lock().map_err(|_| {
            AnalyticsError::HistoryError("history store lock poisoned".to_string())
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn load_window(&self, days_back: u32) -> Result<Vec<Transaction>> {
        let cutoff = self.now() - chrono::Duration::days(days_back as i64);

        let _guard = self.lock.lock().map_err(|_| {
            AnalyticsError::HistoryError("history store lock poisoned".to_string())
        })?;

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut transactions = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) if entry.timestamp >= cutoff => {
                    transactions.extend(entry.transactions);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        "Skipping malformed history line {} in {}: {}",
                        line_no + 1,
                        self.path.display(),
                        err
                    );
                }
            }
        }
        Ok(transactions)
    }
}

impl TransactionHistory for JsonlHistoryStore {
    fn category_statistics(
        &self,
        category: &Category,
        days_back: u32,
    ) -> Result<CategoryStatistics> {
        let transactions = self.load_window(days_back)?;
        Ok(compute_category_statistics(transactions.iter(), category))
    }

    fn seasonal_pattern(&self, category: &Category, days_back: u32) -> Result<SeasonalPattern> {
        let transactions = self.load_window(days_back)?;
        Ok(compute_seasonal_pattern(transactions.iter(), category))
    }

    fn known_counterparties(&self, days_back: u32) -> Result<BTreeSet<String>> {
        let transactions = self.load_window(days_back)?;
        Ok(collect_counterparties(transactions.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(date: (i32, u32, u32), amount: f64, category: Category, counterparty: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            category,
            subcategory: None,
            counterparty: if counterparty.is_empty() {
                None
            } else {
                Some(counterparty.to_string())
            },
            purpose: String::new(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_category_statistics_over_magnitudes() {
        let mut history = InMemoryHistory::new().with_reference_time(fixed_now());
        history.push_snapshot(
            fixed_now() - chrono::Duration::days(10),
            vec![
                tx((2025, 6, 1), -1_000.0, Category::Rent, "Landlord LLC"),
                tx((2025, 6, 10), -3_000.0, Category::Rent, "Landlord LLC"),
                tx((2025, 5, 20), -2_000.0, Category::Rent, "Landlord LLC"),
                tx((2025, 6, 5), 9_000.0, Category::ClientReceipt, "Acme"),
            ],
        );

        let stats = history
            .category_statistics(&Category::Rent, 90)
            .unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.total - 6_000.0).abs() < 1e-9);
        assert!((stats.mean - 2_000.0).abs() < 1e-9);
        assert!((stats.std - 1_000.0).abs() < 1e-9);
        assert_eq!(stats.min, 1_000.0);
        assert_eq!(stats.max, 3_000.0);
        assert_eq!(stats.monthly_totals.get("2025-06"), Some(&4_000.0));
        assert_eq!(stats.monthly_totals.get("2025-05"), Some(&2_000.0));
    }

    #[test]
    fn test_empty_category_yields_default_statistics() {
        let history = InMemoryHistory::new().with_reference_time(fixed_now());
        let stats = history
            .category_statistics(&Category::Advertising, 90)
            .unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_window_cutoff_excludes_old_entries() {
        let mut history = InMemoryHistory::new().with_reference_time(fixed_now());
        history.push_snapshot(
            fixed_now() - chrono::Duration::days(120),
            vec![tx((2025, 2, 1), -500.0, Category::Rent, "Old LLC")],
        );
        history.push_snapshot(
            fixed_now() - chrono::Duration::days(5),
            vec![tx((2025, 6, 25), -700.0, Category::Rent, "New LLC")],
        );

        let stats = history.category_statistics(&Category::Rent, 90).unwrap();
        assert_eq!(stats.count, 1);

        let counterparties = history.known_counterparties(90).unwrap();
        assert!(counterparties.contains("New LLC"));
        assert!(!counterparties.contains("Old LLC"));
    }

    #[test]
    fn test_counterparty_placeholders_filtered() {
        let mut history = InMemoryHistory::new().with_reference_time(fixed_now());
        history.push_snapshot(
            fixed_now(),
            vec![
                tx((2025, 6, 1), -100.0, Category::Other, "—"),
                tx((2025, 6, 2), -100.0, Category::Other, ""),
                tx((2025, 6, 3), -100.0, Category::Other, "Real Partner"),
            ],
        );

        let counterparties = history.known_counterparties(90).unwrap();
        assert_eq!(counterparties.len(), 1);
        assert!(counterparties.contains("Real Partner"));
    }

    #[test]
    fn test_seasonal_pattern_monthly_averages() {
        let mut history = InMemoryHistory::new().with_reference_time(fixed_now());
        history.push_snapshot(
            fixed_now() - chrono::Duration::days(30),
            vec![
                tx((2025, 1, 10), 1_000.0, Category::ClientReceipt, "A"),
                tx((2025, 1, 20), 3_000.0, Category::ClientReceipt, "B"),
                tx((2025, 6, 1), 6_000.0, Category::ClientReceipt, "C"),
            ],
        );

        let pattern = history
            .seasonal_pattern(&Category::ClientReceipt, 365)
            .unwrap();
        assert_eq!(pattern.monthly_avg.get(&1), Some(&2_000.0));
        assert_eq!(pattern.monthly_avg.get(&6), Some(&6_000.0));
        assert!((pattern.trend - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_jsonl_store_round_trip_and_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = JsonlHistoryStore::new(&path).with_reference_time(fixed_now());

        store
            .save_snapshot(
                fixed_now() - chrono::Duration::days(3),
                &[
                    tx((2025, 6, 20), 12_000.0, Category::ClientReceipt, "Acme"),
                    tx((2025, 6, 21), -2_500.0, Category::Advertising, "AdNet"),
                ],
                BTreeMap::new(),
            )
            .unwrap();

        // Corrupt line in the middle must not break later reads.
        {
            use std::io::Write as _;
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json").unwrap();
        }

        store
            .save_snapshot(
                fixed_now() - chrono::Duration::days(1),
                &[tx((2025, 6, 28), -1_500.0, Category::Advertising, "AdNet")],
                BTreeMap::new(),
            )
            .unwrap();

        let stats = store
            .category_statistics(&Category::Advertising, 90)
            .unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.total - 4_000.0).abs() < 1e-9);

        let counterparties = store.known_counterparties(90).unwrap();
        assert_eq!(
            counterparties,
            BTreeSet::from(["Acme".to_string(), "AdNet".to_string()])
        );
    }

    #[test]
    fn test_jsonl_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path().join("absent.jsonl"))
            .with_reference_time(fixed_now());
        let stats = store.category_statistics(&Category::Rent, 90).unwrap();
        assert_eq!(stats.count, 0);
        assert!(store.known_counterparties(90).unwrap().is_empty());
    }
}
