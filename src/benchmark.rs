//! Comparison of current ratios against fixed small-business industry
//! reference values. The reference table is a set of business
//! constants, not runtime configuration.

use crate::config::AnalyticsConfig;
use crate::period::PeriodSummary;
use crate::pnl::PlReport;
use crate::schema::Category;
use crate::utils::ratio_pct;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Good,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub metric: String,
    /// Current value, percent.
    pub current: f64,
    /// Reference value, percent.
    pub benchmark: f64,
    pub status: BenchmarkStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub available: bool,
    pub comparisons: Vec<BenchmarkComparison>,
}

/// Reference ratios, all in percent of revenue except the CAC ratio,
/// which is a percent of the assumed average ticket.
const BENCHMARK_CAC_RATIO: f64 = 15.0;
const BENCHMARK_GROSS_MARGIN: f64 = 30.0;
const BENCHMARK_OPERATING_MARGIN: f64 = 15.0;
const BENCHMARK_ADVERTISING_RATIO: f64 = 10.0;
const BENCHMARK_SALARY_RATIO: f64 = 30.0;
const BENCHMARK_RENT_RATIO: f64 = 5.0;

enum Direction {
    /// Margins: higher is better.
    HigherIsBetter,
    /// Cost ratios: lower is better.
    LowerIsBetter,
}

fn compare(metric: &str, current: f64, benchmark: f64, direction: Direction) -> BenchmarkComparison {
    let favorable = match direction {
        Direction::HigherIsBetter => current >= benchmark,
        Direction::LowerIsBetter => current <= benchmark,
    };
    let message = if favorable {
        format!(
            "{} of {:.1}% is at or better than the {:.1}% industry reference",
            metric, current, benchmark
        )
    } else {
        format!(
            "{} of {:.1}% falls short of the {:.1}% industry reference",
            metric, current, benchmark
        )
    };
    BenchmarkComparison {
        metric: metric.to_string(),
        current,
        benchmark,
        status: if favorable {
            BenchmarkStatus::Good
        } else {
            BenchmarkStatus::Warning
        },
        message,
    }
}

fn category_total(current: &PeriodSummary, category: Category) -> f64 {
    current
        .by_category
        .get(category.label())
        .copied()
        .unwrap_or(0.0)
}

/// Build the benchmark section. Without revenue there is nothing to
/// normalize against and the section reports `available: false`.
pub fn build_benchmark_report(
    pl: &PlReport,
    current: &PeriodSummary,
    config: &AnalyticsConfig,
) -> BenchmarkReport {
    if pl.revenue <= 0.0 {
        return BenchmarkReport {
            available: false,
            comparisons: Vec::new(),
        };
    }

    let advertising = category_total(current, Category::Advertising);
    let salary = category_total(current, Category::Salary);
    let rent = category_total(current, Category::Rent);

    // CAC as a share of the first purchase it buys: advertising spend
    // per estimated customer over the assumed average ticket.
    let estimated_customers = pl.revenue / config.assumed_avg_ticket;
    let cac = if estimated_customers > 0.0 {
        advertising / estimated_customers
    } else {
        0.0
    };
    let cac_ratio = ratio_pct(cac, config.assumed_avg_ticket);

    let comparisons = vec![
        compare(
            "Customer acquisition cost ratio",
            cac_ratio,
            BENCHMARK_CAC_RATIO,
            Direction::LowerIsBetter,
        ),
        compare(
            "Gross margin",
            pl.gross_margin,
            BENCHMARK_GROSS_MARGIN,
            Direction::HigherIsBetter,
        ),
        compare(
            "Operating margin",
            pl.operating_margin,
            BENCHMARK_OPERATING_MARGIN,
            Direction::HigherIsBetter,
        ),
        compare(
            "Advertising ratio",
            ratio_pct(advertising, pl.revenue),
            BENCHMARK_ADVERTISING_RATIO,
            Direction::LowerIsBetter,
        ),
        compare(
            "Salary ratio",
            ratio_pct(salary, pl.revenue),
            BENCHMARK_SALARY_RATIO,
            Direction::LowerIsBetter,
        ),
        compare(
            "Rent ratio",
            ratio_pct(rent, pl.revenue),
            BENCHMARK_RENT_RATIO,
            Direction::LowerIsBetter,
        ),
    ];

    BenchmarkReport {
        available: true,
        comparisons,
    }
}
