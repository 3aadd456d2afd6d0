//! Anomaly detection over one snapshot: four independent detectors run
//! in a fixed order over a shared context, so the merged finding list
//! is reproducible for identical inputs.

use crate::config::AnalyticsConfig;
use crate::forecast::ForecastReport;
use crate::history::TransactionHistory;
use crate::period::PeriodSummary;
use crate::schema::{Category, Transaction};
use crate::utils::{mean, population_std};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    StatisticalOutlier,
    NewCounterparty,
    CategoryDrift,
    AcquisitionCostDrift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: AnomalySeverity,
}

/// Everything a detector may look at. Detectors never mutate it.
pub struct DetectorContext<'a> {
    pub transactions: &'a [Transaction],
    pub current: &'a PeriodSummary,
    pub forecast: &'a ForecastReport,
    pub history: Option<&'a dyn TransactionHistory>,
    pub config: &'a AnalyticsConfig,
}

/// One predicate+explainer pair. Implementations must be pure and
/// order their findings deterministically.
trait Detector {
    fn detect(&self, ctx: &DetectorContext) -> Vec<Anomaly>;
}

fn placeholder_free(name: Option<&str>) -> Option<&str> {
    name.map(str::trim)
        .filter(|n| !n.is_empty() && *n != "—")
}

/// Flags individual transactions far above their category's typical
/// magnitude within the snapshot itself. Categories with too few
/// samples have no meaningful spread and are skipped.
struct StatisticalOutlierDetector;

impl Detector for StatisticalOutlierDetector {
    fn detect(&self, ctx: &DetectorContext) -> Vec<Anomaly> {
        let mut by_category: BTreeMap<&Category, Vec<&Transaction>> = BTreeMap::new();
        for tx in ctx.transactions {
            by_category.entry(&tx.category).or_default().push(tx);
        }

        let mut findings = Vec::new();
        for (category, txs) in by_category {
            if txs.len() < ctx.config.outlier_min_samples {
                continue;
            }
            let magnitudes: Vec<f64> = txs.iter().map(|tx| tx.magnitude()).collect();
            let m = mean(&magnitudes);
            let std = population_std(&magnitudes);
            if std == 0.0 {
                continue;
            }
            let flag_threshold = m + ctx.config.outlier_flag_sigma * std;
            let critical_threshold = m + ctx.config.outlier_critical_sigma * std;

            let mut flagged: Vec<&&Transaction> = txs
                .iter()
                .filter(|tx| tx.magnitude() > flag_threshold)
                .collect();
            flagged.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then(a.magnitude().total_cmp(&b.magnitude()))
            });

            for tx in flagged {
                let severity = if tx.magnitude() > critical_threshold {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                };
                findings.push(Anomaly {
                    kind: AnomalyKind::StatisticalOutlier,
                    description: format!(
                        "Transaction of {:.2} in category '{}' on {} far exceeds the category's typical size ({:.2} avg)",
                        tx.magnitude(),
                        category,
                        tx.date,
                        m
                    ),
                    severity,
                });
            }
        }
        findings
    }
}

/// Flags sizable total payments to counterparties never seen in the
/// trailing history window. Needs the history provider.
struct NewCounterpartyDetector;

impl Detector for NewCounterpartyDetector {
    fn detect(&self, ctx: &DetectorContext) -> Vec<Anomaly> {
        let Some(history) = ctx.history else {
            return Vec::new();
        };
        let known = match history.known_counterparties(ctx.config.statistics_days_back) {
            Ok(known) => known,
            Err(err) => {
                warn!("Known-counterparty set unavailable, skipping check: {}", err);
                return Vec::new();
            }
        };

        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for tx in ctx.transactions.iter().filter(|tx| tx.category.is_expense()) {
            if let Some(name) = placeholder_free(tx.counterparty.as_deref()) {
                if !known.contains(name) {
                    *totals.entry(name).or_insert(0.0) += tx.magnitude();
                }
            }
        }

        totals
            .into_iter()
            .filter(|(_, total)| *total > ctx.config.new_counterparty_flag_total)
            .map(|(name, total)| {
                let severity = if total > ctx.config.new_counterparty_critical_total {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                };
                Anomaly {
                    kind: AnomalyKind::NewCounterparty,
                    description: format!(
                        "Payments of {:.2} to previously unseen counterparty '{}'",
                        total, name
                    ),
                    severity,
                }
            })
            .collect()
    }
}

/// Flags categories whose average transaction size moved materially
/// against the trailing-window history.
struct CategoryDriftDetector;

impl Detector for CategoryDriftDetector {
    fn detect(&self, ctx: &DetectorContext) -> Vec<Anomaly> {
        let Some(history) = ctx.history else {
            return Vec::new();
        };

        let mut by_category: BTreeMap<&Category, Vec<f64>> = BTreeMap::new();
        for tx in ctx.transactions {
            by_category
                .entry(&tx.category)
                .or_default()
                .push(tx.magnitude());
        }

        let mut findings = Vec::new();
        for (category, magnitudes) in by_category {
            let stats =
                match history.category_statistics(category, ctx.config.statistics_days_back) {
                    Ok(stats) => stats,
                    Err(err) => {
                        warn!("Statistics unavailable for {}, skipping drift: {}", category, err);
                        continue;
                    }
                };
            if stats.count < ctx.config.outlier_min_samples || stats.mean <= 0.0 {
                continue;
            }

            let current_mean = mean(&magnitudes);
            let deviation = (current_mean - stats.mean).abs() / stats.mean;
            if deviation <= ctx.config.drift_flag_ratio {
                continue;
            }

            let severity = if deviation > ctx.config.drift_critical_ratio {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            };
            let direction = if current_mean > stats.mean { "up" } else { "down" };
            findings.push(Anomaly {
                kind: AnomalyKind::CategoryDrift,
                description: format!(
                    "Average '{}' transaction moved {} {:.0}% vs the trailing window ({:.2} now, {:.2} historically)",
                    category,
                    direction,
                    deviation * 100.0,
                    current_mean,
                    stats.mean
                ),
                severity,
            });
        }
        findings
    }
}

/// Flags customer-acquisition-cost degradation: CAC out of proportion
/// to projected revenue, or sharply up against the historical CAC
/// computed the same way over the trailing window.
struct AcquisitionCostDetector;

impl AcquisitionCostDetector {
    fn cac(income: f64, advertising: f64, ticket: f64) -> Option<f64> {
        if income <= 0.0 || advertising <= 0.0 {
            return None;
        }
        let customers = income / ticket;
        (customers > 0.0).then(|| advertising / customers)
    }
}

impl Detector for AcquisitionCostDetector {
    fn detect(&self, ctx: &DetectorContext) -> Vec<Anomaly> {
        let advertising = ctx
            .current
            .by_category
            .get(Category::Advertising.label())
            .copied()
            .unwrap_or(0.0);

        let Some(cac) = Self::cac(
            ctx.current.income,
            advertising,
            ctx.config.assumed_avg_ticket,
        ) else {
            return Vec::new();
        };

        // Revenue base is the forward 30-day projection, which is what
        // an acquisition spend level has to be sustainable against.
        let projected_revenue = ctx.forecast.forecast_30d_income;
        if projected_revenue > 0.0 && cac > ctx.config.cac_revenue_share_limit * projected_revenue
        {
            return vec![Anomaly {
                kind: AnomalyKind::AcquisitionCostDrift,
                description: format!(
                    "Estimated acquisition cost per customer ({:.2}) exceeds {:.0}% of projected 30-day revenue ({:.2})",
                    cac,
                    ctx.config.cac_revenue_share_limit * 100.0,
                    projected_revenue
                ),
                severity: AnomalySeverity::High,
            }];
        }

        let Some(history) = ctx.history else {
            return Vec::new();
        };
        let (hist_income, hist_advertising) = match (
            history.category_statistics(&Category::ClientReceipt, ctx.config.statistics_days_back),
            history.category_statistics(&Category::Advertising, ctx.config.statistics_days_back),
        ) {
            (Ok(income), Ok(advertising)) => (income.total, advertising.total),
            (Err(err), _) | (_, Err(err)) => {
                warn!("Historical CAC unavailable, skipping check: {}", err);
                return Vec::new();
            }
        };

        let Some(historical_cac) = Self::cac(
            hist_income,
            hist_advertising,
            ctx.config.assumed_avg_ticket,
        ) else {
            return Vec::new();
        };

        let growth = (cac - historical_cac) / historical_cac;
        if growth <= ctx.config.cac_growth_flag_ratio {
            return Vec::new();
        }

        let severity = if growth > ctx.config.cac_growth_critical_ratio {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        };
        vec![Anomaly {
            kind: AnomalyKind::AcquisitionCostDrift,
            description: format!(
                "Customer acquisition cost rose {:.0}% vs the trailing window ({:.2} now, {:.2} historically)",
                growth * 100.0,
                cac,
                historical_cac
            ),
            severity,
        }]
    }
}

/// Run all detectors in their fixed order and merge the findings.
pub fn detect_anomalies(ctx: &DetectorContext) -> Vec<Anomaly> {
    let detectors: [&dyn Detector; 4] = [
        &StatisticalOutlierDetector,
        &NewCounterpartyDetector,
        &CategoryDriftDetector,
        &AcquisitionCostDetector,
    ];

    detectors
        .iter()
        .flat_map(|detector| detector.detect(ctx))
        .collect()
}
