//! Tax computations: the assessment of the uploaded snapshot under the
//! selected regime, and an annualized comparison of both simplified
//! regimes based on the 30-day forecast.

use crate::forecast::ForecastReport;
use crate::report::{Recommendation, Severity};
use crate::schema::{TaxRegime, Transaction};
use crate::utils::{ratio_pct, round2};
use serde::{Deserialize, Serialize};

/// Tax owed on the current snapshot under one regime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub regime: TaxRegime,
    pub tax_base: f64,
    pub rate_pct: f64,
    pub tax: f64,
}

/// Assess the snapshot: revenue mode taxes gross income, margin mode
/// taxes income minus expenses. The tax is floored at zero and rounded
/// to currency precision.
pub fn assess(transactions: &[Transaction], regime: TaxRegime) -> TaxAssessment {
    let income: f64 = transactions
        .iter()
        .filter(|tx| tx.category.is_income())
        .map(|tx| tx.magnitude())
        .sum();
    let expenses: f64 = transactions
        .iter()
        .filter(|tx| tx.category.is_expense())
        .map(|tx| tx.magnitude())
        .sum();

    let tax_base = match regime {
        TaxRegime::RevenueBased => income,
        TaxRegime::MarginBased => income - expenses,
    };
    let tax = (tax_base * regime.rate()).max(0.0);

    TaxAssessment {
        regime,
        tax_base: round2(tax_base),
        rate_pct: regime.rate() * 100.0,
        tax: round2(tax),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualForecast {
    pub income: f64,
    pub expenses: f64,
}

/// One regime's projected annual liability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxScenario {
    pub regime: TaxRegime,
    pub tax_base: f64,
    pub tax: f64,
    pub effective_rate_pct: f64,
}

/// Uniform quarterly split of the annual projection; deliberately not
/// seasonally adjusted even though the 30-day forecast is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyForecast {
    pub income: f64,
    pub expenses: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxPlanningReport {
    pub available: bool,
    pub annual_forecast: AnnualForecast,
    pub tax_scenarios: Vec<TaxScenario>,
    pub optimal_scenario: Option<TaxScenario>,
    pub potential_savings: f64,
    pub quarterly_forecast: QuarterlyForecast,
    pub recommendations: Vec<Recommendation>,
}

fn scenario(regime: TaxRegime, annual_income: f64, annual_expenses: f64) -> TaxScenario {
    let tax_base = match regime {
        TaxRegime::RevenueBased => annual_income,
        TaxRegime::MarginBased => (annual_income - annual_expenses).max(0.0),
    };
    let tax = round2(tax_base * regime.rate());
    TaxScenario {
        regime,
        tax_base: round2(tax_base),
        tax,
        effective_rate_pct: ratio_pct(tax, annual_income),
    }
}

/// Annualize the 30-day projection (x12, a deliberate simplification)
/// and compare both regimes. The optimal regime is the one with the
/// minimum tax, so `potential_savings` is never negative.
pub fn build_tax_planning(
    forecast: &ForecastReport,
    current_regime: TaxRegime,
) -> TaxPlanningReport {
    let annual_income = forecast.forecast_30d_income * 12.0;
    let annual_expenses = forecast.forecast_30d_expenses * 12.0;

    if annual_income <= 0.0 {
        return TaxPlanningReport {
            available: false,
            annual_forecast: AnnualForecast {
                income: 0.0,
                expenses: round2(annual_expenses),
            },
            tax_scenarios: Vec::new(),
            optimal_scenario: None,
            potential_savings: 0.0,
            quarterly_forecast: QuarterlyForecast {
                income: 0.0,
                expenses: round2(annual_expenses / 4.0),
                tax: 0.0,
            },
            recommendations: vec![Recommendation {
                severity: Severity::Info,
                message: "No projected income; tax planning is not applicable.".to_string(),
            }],
        };
    }

    let scenarios = vec![
        scenario(TaxRegime::RevenueBased, annual_income, annual_expenses),
        scenario(TaxRegime::MarginBased, annual_income, annual_expenses),
    ];

    let optimal = scenarios
        .iter()
        .min_by(|a, b| a.tax.total_cmp(&b.tax))
        .cloned();
    let current = scenarios
        .iter()
        .find(|s| s.regime == current_regime)
        .cloned();

    let (potential_savings, recommendations) = match (&optimal, &current) {
        (Some(optimal), Some(current)) => {
            let savings = round2(current.tax - optimal.tax);
            let mut recs = Vec::new();
            if savings > 0.0 {
                recs.push(Recommendation {
                    severity: Severity::Warning,
                    message: format!(
                        "Switching from {} to {} would save about {:.2} per year.",
                        current.regime, optimal.regime, savings
                    ),
                });
            } else {
                recs.push(Recommendation {
                    severity: Severity::Info,
                    message: format!(
                        "The selected {} regime is already the cheaper option.",
                        current.regime
                    ),
                });
            }
            if optimal.regime == TaxRegime::MarginBased {
                recs.push(Recommendation {
                    severity: Severity::Info,
                    message: "The margin-based regime requires documented proof for every deducted expense.".to_string(),
                });
            }
            (savings, recs)
        }
        _ => (0.0, Vec::new()),
    };

    let quarterly_tax = current.as_ref().map(|s| s.tax / 4.0).unwrap_or(0.0);

    TaxPlanningReport {
        available: true,
        annual_forecast: AnnualForecast {
            income: round2(annual_income),
            expenses: round2(annual_expenses),
        },
        tax_scenarios: scenarios,
        optimal_scenario: optimal,
        potential_savings,
        quarterly_forecast: QuarterlyForecast {
            income: round2(annual_income / 4.0),
            expenses: round2(annual_expenses / 4.0),
            tax: round2(quarterly_tax),
        },
        recommendations,
    }
}
