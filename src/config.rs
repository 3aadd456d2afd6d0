use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};

/// Tunable constants for the analytics engine. Everything a deployment
/// might want to adjust lives here and is injected, never read from
/// ambient state. `Default` reproduces the reference behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Reference value of an average customer ticket, used to estimate
    /// customer counts for acquisition-cost metrics.
    pub assumed_avg_ticket: f64,

    /// Trailing window for category statistics and known counterparties.
    pub statistics_days_back: u32,

    /// Trailing window for seasonal patterns.
    pub seasonal_days_back: u32,

    /// Forecast horizon in days.
    pub forecast_horizon_days: u32,

    /// Bounds for the seasonal factor applied to daily baselines.
    pub seasonal_factor_min: f64,
    pub seasonal_factor_max: f64,

    /// z-score for the normal-approximation confidence interval.
    pub confidence_z: f64,

    /// Statistical-outlier detector: flag above `mean + flag_sigma * std`,
    /// escalate above `mean + critical_sigma * std`. Categories with
    /// fewer samples than `min_samples` are skipped.
    pub outlier_flag_sigma: f64,
    pub outlier_critical_sigma: f64,
    pub outlier_min_samples: usize,

    /// New-counterparty detector: total payment thresholds.
    pub new_counterparty_flag_total: f64,
    pub new_counterparty_critical_total: f64,

    /// Category-drift detector: relative deviation thresholds.
    pub drift_flag_ratio: f64,
    pub drift_critical_ratio: f64,

    /// Acquisition-cost detector: CAC share of revenue that is always
    /// flagged, and relative CAC growth thresholds against history.
    pub cac_revenue_share_limit: f64,
    pub cac_growth_flag_ratio: f64,
    pub cac_growth_critical_ratio: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            assumed_avg_ticket: 5_000.0,
            statistics_days_back: 90,
            seasonal_days_back: 365,
            forecast_horizon_days: 30,
            seasonal_factor_min: 0.5,
            seasonal_factor_max: 2.0,
            confidence_z: 1.96,
            outlier_flag_sigma: 2.5,
            outlier_critical_sigma: 4.0,
            outlier_min_samples: 4,
            new_counterparty_flag_total: 10_000.0,
            new_counterparty_critical_total: 50_000.0,
            drift_flag_ratio: 0.30,
            drift_critical_ratio: 0.60,
            cac_revenue_share_limit: 0.30,
            cac_growth_flag_ratio: 0.20,
            cac_growth_critical_ratio: 0.50,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.assumed_avg_ticket <= 0.0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "assumed_avg_ticket must be positive, got {}",
                self.assumed_avg_ticket
            )));
        }

        if self.seasonal_factor_min <= 0.0 || self.seasonal_factor_min > self.seasonal_factor_max {
            return Err(AnalyticsError::InvalidConfig(format!(
                "seasonal factor bounds [{}, {}] are not a valid positive range",
                self.seasonal_factor_min, self.seasonal_factor_max
            )));
        }

        if self.forecast_horizon_days == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "forecast_horizon_days must be at least 1".to_string(),
            ));
        }

        if self.outlier_min_samples < 2 {
            return Err(AnalyticsError::InvalidConfig(
                "outlier_min_samples must be at least 2 for a defined std".to_string(),
            ));
        }

        let non_negative = [
            ("confidence_z", self.confidence_z),
            ("outlier_flag_sigma", self.outlier_flag_sigma),
            ("outlier_critical_sigma", self.outlier_critical_sigma),
            ("new_counterparty_flag_total", self.new_counterparty_flag_total),
            (
                "new_counterparty_critical_total",
                self.new_counterparty_critical_total,
            ),
            ("drift_flag_ratio", self.drift_flag_ratio),
            ("drift_critical_ratio", self.drift_critical_ratio),
            ("cac_revenue_share_limit", self.cac_revenue_share_limit),
            ("cac_growth_flag_ratio", self.cac_growth_flag_ratio),
            ("cac_growth_critical_ratio", self.cac_growth_critical_ratio),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_ticket() {
        let config = AnalyticsConfig {
            assumed_avg_ticket: 0.0,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_seasonal_bounds() {
        let config = AnalyticsConfig {
            seasonal_factor_min: 3.0,
            seasonal_factor_max: 2.0,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
