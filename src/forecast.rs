//! Seasonally-adjusted 30-day projection with confidence bounds.
//!
//! Deliberately a flat extrapolation: daily averages from the current
//! snapshot, scaled by a clamped seasonal factor from history. No
//! model fitting.

use crate::config::AnalyticsConfig;
use crate::history::TransactionHistory;
use crate::period::PeriodSummary;
use crate::report::{Recommendation, Severity};
use crate::schema::Category;
use crate::utils::mean;
use chrono::Datelike;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub income: ConfidenceInterval,
    pub expenses: ConfidenceInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalFactors {
    pub income: f64,
    pub expenses: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub period_days: i64,
    pub avg_daily_income: f64,
    pub avg_daily_expenses: f64,
    pub forecast_30d_income: f64,
    pub forecast_30d_expenses: f64,
    pub forecast_30d_balance: f64,
    pub confidence_intervals: ConfidenceIntervals,
    pub seasonal_factors: SeasonalFactors,
    pub recommendations: Vec<Recommendation>,
}

/// Seasonal factor for one set of monthly averages: the reference
/// month's average over the all-month average, clamped. 1.0 whenever
/// the history is too thin to say anything.
fn seasonal_factor(
    monthly_avg: &BTreeMap<u32, f64>,
    month: u32,
    config: &AnalyticsConfig,
) -> f64 {
    if monthly_avg.is_empty() {
        return 1.0;
    }
    let values: Vec<f64> = monthly_avg.values().copied().collect();
    let avg_all_months = mean(&values);
    if avg_all_months <= 0.0 {
        return 1.0;
    }
    match monthly_avg.get(&month) {
        Some(month_avg) => (month_avg / avg_all_months)
            .clamp(config.seasonal_factor_min, config.seasonal_factor_max),
        None => 1.0,
    }
}

fn income_monthly_avg(
    history: &dyn TransactionHistory,
    config: &AnalyticsConfig,
) -> BTreeMap<u32, f64> {
    match history.seasonal_pattern(&Category::ClientReceipt, config.seasonal_days_back) {
        Ok(pattern) => pattern.monthly_avg,
        Err(err) => {
            warn!("Seasonal pattern unavailable for income: {}", err);
            BTreeMap::new()
        }
    }
}

/// Monthly averages summed across every known expense category, so one
/// dominant category cannot be drowned out by empty ones.
fn expense_monthly_avg(
    history: &dyn TransactionHistory,
    config: &AnalyticsConfig,
) -> BTreeMap<u32, f64> {
    let mut combined: BTreeMap<u32, f64> = BTreeMap::new();
    for category in &Category::KNOWN_EXPENSES {
        match history.seasonal_pattern(category, config.seasonal_days_back) {
            Ok(pattern) => {
                for (month, avg) in pattern.monthly_avg {
                    *combined.entry(month).or_insert(0.0) += avg;
                }
            }
            Err(err) => {
                warn!("Seasonal pattern unavailable for {}: {}", category, err);
            }
        }
    }
    combined
}

fn income_std(history: &dyn TransactionHistory, config: &AnalyticsConfig) -> f64 {
    match history.category_statistics(&Category::ClientReceipt, config.statistics_days_back) {
        Ok(stats) => stats.std,
        Err(err) => {
            warn!("Category statistics unavailable for income: {}", err);
            0.0
        }
    }
}

/// Root-sum-square of per-category stds: the combined spread of
/// independent expense categories.
fn expense_std(history: &dyn TransactionHistory, config: &AnalyticsConfig) -> f64 {
    let mut variance_sum = 0.0;
    for category in &Category::KNOWN_EXPENSES {
        match history.category_statistics(category, config.statistics_days_back) {
            Ok(stats) => variance_sum += stats.std * stats.std,
            Err(err) => {
                warn!("Category statistics unavailable for {}: {}", category, err);
            }
        }
    }
    variance_sum.sqrt()
}

fn interval(forecast: f64, std: f64, config: &AnalyticsConfig) -> ConfidenceInterval {
    ConfidenceInterval {
        lower: forecast - config.confidence_z * std,
        upper: forecast + config.confidence_z * std,
    }
}

fn recommendations(
    forecast_income: f64,
    forecast_balance: f64,
    factors: &SeasonalFactors,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if forecast_balance < 0.0 {
        out.push(Recommendation {
            severity: Severity::Critical,
            message: format!(
                "Projected 30-day balance is negative ({:.0}). Build a cash reserve or defer discretionary spending.",
                forecast_balance
            ),
        });
    } else if forecast_income > 0.0 && forecast_balance < 0.1 * forecast_income {
        out.push(Recommendation {
            severity: Severity::Warning,
            message: format!(
                "Projected 30-day balance ({:.0}) is under 10% of projected income; margins are thin.",
                forecast_balance
            ),
        });
    } else {
        out.push(Recommendation {
            severity: Severity::Info,
            message: format!(
                "Projected 30-day balance is positive ({:.0}).",
                forecast_balance
            ),
        });
    }

    if factors.income >= 1.2 {
        out.push(Recommendation {
            severity: Severity::Info,
            message: format!(
                "Seasonally strong month for income (factor {:.2}); consider pulling purchases forward.",
                factors.income
            ),
        });
    } else if factors.income <= 0.8 {
        out.push(Recommendation {
            severity: Severity::Warning,
            message: format!(
                "Seasonally weak month for income (factor {:.2}); the projection already reflects the dip.",
                factors.income
            ),
        });
    }

    out
}

/// Project the next horizon from the current period's daily averages.
/// The reference month for seasonality is the snapshot's period-end
/// month, so identical inputs always produce identical output.
pub fn build_forecast(
    current: &PeriodSummary,
    history: Option<&dyn TransactionHistory>,
    config: &AnalyticsConfig,
) -> ForecastReport {
    let period_days = ((current.end - current.start).num_days() + 1).max(1);
    let avg_daily_income = current.income / period_days as f64;
    let avg_daily_expenses = current.expenses / period_days as f64;

    let reference_month = current.end.month();

    let (factors, income_sigma, expense_sigma) = match history {
        Some(history) => {
            let factors = SeasonalFactors {
                income: seasonal_factor(
                    &income_monthly_avg(history, config),
                    reference_month,
                    config,
                ),
                expenses: seasonal_factor(
                    &expense_monthly_avg(history, config),
                    reference_month,
                    config,
                ),
            };
            (
                factors,
                income_std(history, config),
                expense_std(history, config),
            )
        }
        None => (
            SeasonalFactors {
                income: 1.0,
                expenses: 1.0,
            },
            0.0,
            0.0,
        ),
    };

    let horizon = config.forecast_horizon_days as f64;
    let forecast_30d_income = avg_daily_income * horizon * factors.income;
    let forecast_30d_expenses = avg_daily_expenses * horizon * factors.expenses;
    let forecast_30d_balance = forecast_30d_income - forecast_30d_expenses;

    debug!(
        "Forecast: {:.2}/day income, {:.2}/day expenses, factors {:.2}/{:.2} over {} days",
        avg_daily_income, avg_daily_expenses, factors.income, factors.expenses, period_days
    );

    let recommendations = recommendations(forecast_30d_income, forecast_30d_balance, &factors);

    ForecastReport {
        period_days,
        avg_daily_income,
        avg_daily_expenses,
        forecast_30d_income,
        forecast_30d_expenses,
        forecast_30d_balance,
        confidence_intervals: ConfidenceIntervals {
            income: interval(forecast_30d_income, income_sigma, config),
            expenses: interval(forecast_30d_expenses, expense_sigma, config),
        },
        seasonal_factors: factors,
        recommendations,
    }
}
