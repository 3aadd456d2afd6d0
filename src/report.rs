//! Output value objects: the single structured result assembled from
//! every component. Plain serde data with no identity or lifecycle
//! beyond the response.

use crate::anomaly::Anomaly;
use crate::benchmark::BenchmarkReport;
use crate::forecast::ForecastReport;
use crate::period::PeriodComparison;
use crate::pnl::PlReport;
use crate::schema::TaxRegime;
use crate::tax::{TaxAssessment, TaxPlanningReport};
use serde::{Deserialize, Serialize};

/// Severity tag for heuristic recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

/// Headline figures of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub mode: TaxRegime,
    pub transaction_count: usize,
    /// Tax owed on this snapshot under the selected regime.
    pub tax: f64,
    pub assessment: TaxAssessment,
}

/// The complete analytics response for one uploaded snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: Summary,
    pub pl_report: PlReport,
    pub period_comparison: PeriodComparison,
    pub forecasts: ForecastReport,
    pub anomalies: Vec<Anomaly>,
    pub benchmarking: BenchmarkReport,
    pub tax_planning: TaxPlanningReport,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
