//! # Ledger Analytics
//!
//! A library for turning a small business's dated transaction ledger
//! into derived analytics: period-over-period comparisons, a
//! profit-and-loss decomposition, seasonally-adjusted 30-day forecasts
//! with confidence bounds, anomaly flags, industry benchmark
//! comparisons, and a multi-regime tax plan.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: one uploaded, already-categorized batch of
//!   transactions; analyzed as a whole, never mutated.
//! - **History provider**: an injected [`TransactionHistory`] with
//!   trailing-window statistics from previous snapshots. Optional —
//!   every consumer degrades gracefully without it.
//! - **Best-effort response**: malformed rows are excluded and
//!   counted, thin statistics skip individual checks, and sections
//!   that cannot be computed carry `available: false`. Only an empty
//!   snapshot is a hard error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_analytics::*;
//! use chrono::NaiveDate;
//!
//! let transactions = vec![Transaction {
//!     date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     amount: 10_000.0,
//!     category: Category::ClientReceipt,
//!     subcategory: None,
//!     counterparty: Some("Acme".to_string()),
//!     purpose: "invoice 17".to_string(),
//! }];
//!
//! let report = analyze_transactions(&transactions, TaxRegime::RevenueBased, None)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod anomaly;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod forecast;
pub mod history;
pub mod ingestion;
pub mod period;
pub mod pnl;
pub mod report;
pub mod schema;
pub mod tax;
pub mod utils;

pub use anomaly::{detect_anomalies, Anomaly, AnomalyKind, AnomalySeverity, DetectorContext};
pub use benchmark::{build_benchmark_report, BenchmarkReport, BenchmarkStatus};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result};
pub use forecast::{build_forecast, ForecastReport};
pub use history::{
    CategoryStatistics, HistoryEntry, InMemoryHistory, JsonlHistoryStore, SeasonalPattern,
    TransactionHistory,
};
pub use ingestion::{normalize_rows, NormalizedLedger};
pub use period::{aggregate_period, compare_periods, Period, PeriodComparison, PeriodSummary};
pub use pnl::{build_pl_report, PlReport};
pub use report::{AnalysisReport, Recommendation, Severity, Summary};
pub use schema::{Category, LedgerRow, TaxRegime, Transaction};
pub use tax::{assess, build_tax_planning, TaxAssessment, TaxPlanningReport};

use log::{debug, info};

/// Orchestrates the full analysis of one snapshot.
///
/// Components run in dependency order: the period aggregator and P&L
/// builder work directly off the snapshot, the forecast feeds both the
/// anomaly detectors and the tax planner, and benchmarks consume the
/// P&L. All of it is pure computation over the inputs.
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: AnalyticsConfig::default(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        transactions: &[Transaction],
        regime: TaxRegime,
        history: Option<&dyn TransactionHistory>,
    ) -> Result<AnalysisReport> {
        if transactions.is_empty() {
            return Err(AnalyticsError::EmptyLedger);
        }

        info!(
            "Analyzing snapshot of {} transactions under the {} regime",
            transactions.len(),
            regime
        );

        let period_comparison = compare_periods(transactions, None, None)?;
        let pl_report = build_pl_report(transactions);

        let forecasts = build_forecast(&period_comparison.current, history, &self.config);

        let anomalies = detect_anomalies(&DetectorContext {
            transactions,
            current: &period_comparison.current,
            forecast: &forecasts,
            history,
            config: &self.config,
        });
        debug!("{} anomalies detected", anomalies.len());

        let benchmarking =
            build_benchmark_report(&pl_report, &period_comparison.current, &self.config);
        let tax_planning = build_tax_planning(&forecasts, regime);

        let assessment = assess(transactions, regime);
        let summary = Summary {
            mode: regime,
            transaction_count: transactions.len(),
            tax: assessment.tax,
            assessment,
        };

        Ok(AnalysisReport {
            summary,
            pl_report,
            period_comparison,
            forecasts,
            anomalies,
            benchmarking,
            tax_planning,
        })
    }
}

/// Analyze one snapshot with the default configuration.
pub fn analyze_transactions(
    transactions: &[Transaction],
    regime: TaxRegime,
    history: Option<&dyn TransactionHistory>,
) -> Result<AnalysisReport> {
    AnalyticsEngine::with_defaults().analyze(transactions, regime, history)
}
