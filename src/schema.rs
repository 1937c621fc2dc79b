use crate::error::{RevenueDashboardError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One day of recorded revenue. The store keeps at most one record per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueRecord {
    #[schemars(description = "Calendar date of the entry (YYYY-MM-DD). Day granularity only.")]
    pub date: NaiveDate,

    #[schemars(
        description = "Revenue recorded for the day. Never negative. Zero means the day has no revenue and is treated as absent upstream."
    )]
    pub amount: f64,

    #[schemars(description = "Number of staff present that day.")]
    pub headcount: u32,
}

impl RevenueRecord {
    pub fn new(date: NaiveDate, amount: f64, headcount: u32) -> Self {
        Self {
            date,
            amount,
            headcount,
        }
    }

    pub fn is_worked(&self) -> bool {
        self.amount > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(
        description = "When the mean of all positive amounts in a batch exceeds this value, every amount is divided by `currency_correction_divisor`. Corrects rows ingested in minor units."
    )]
    pub currency_correction_threshold: f64,

    #[schemars(description = "Divisor applied by the currency-unit correction (100 for cents).")]
    pub currency_correction_divisor: f64,

    #[schemars(
        description = "Growth applied to the prior-year month total to build the monthly objective. 0.05 means +5%."
    )]
    pub monthly_growth_factor: f64,

    #[schemars(
        description = "Fixed annual revenue target. When absent, the target is derived from the prior fiscal year total and `annual_growth_factor`."
    )]
    pub annual_target: Option<f64>,

    #[schemars(description = "Growth applied to the prior fiscal year total when deriving the annual target.")]
    pub annual_growth_factor: f64,

    #[schemars(description = "How long a loaded record snapshot stays fresh, in seconds.")]
    pub cache_ttl_secs: u64,

    #[schemars(description = "Placeholder shown in exported tables for days without revenue.")]
    pub missing_value_placeholder: String,

    #[schemars(description = "Number of table rows per page in paginated reports.")]
    pub rows_per_page: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            currency_correction_threshold: 1000.0,
            currency_correction_divisor: 100.0,
            monthly_growth_factor: 0.0,
            annual_target: None,
            annual_growth_factor: 0.0,
            cache_ttl_secs: 60,
            missing_value_placeholder: "-".to_string(),
            rows_per_page: 31,
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.currency_correction_threshold.is_finite() || self.currency_correction_threshold <= 0.0 {
            return Err(RevenueDashboardError::InvalidConfig(format!(
                "currency_correction_threshold must be positive, got {}",
                self.currency_correction_threshold
            )));
        }

        if !self.currency_correction_divisor.is_finite() || self.currency_correction_divisor <= 0.0 {
            return Err(RevenueDashboardError::InvalidConfig(format!(
                "currency_correction_divisor must be positive, got {}",
                self.currency_correction_divisor
            )));
        }

        for (name, factor) in [
            ("monthly_growth_factor", self.monthly_growth_factor),
            ("annual_growth_factor", self.annual_growth_factor),
        ] {
            if !factor.is_finite() || factor <= -1.0 {
                return Err(RevenueDashboardError::InvalidConfig(format!(
                    "{} must be greater than -1.0, got {}",
                    name, factor
                )));
            }
        }

        if let Some(target) = self.annual_target {
            if !target.is_finite() || target < 0.0 {
                return Err(RevenueDashboardError::InvalidConfig(format!(
                    "annual_target must be non-negative, got {}",
                    target
                )));
            }
        }

        if self.rows_per_page == 0 {
            return Err(RevenueDashboardError::InvalidConfig(
                "rows_per_page must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = DashboardConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("currency_correction_threshold"));
        assert!(schema_json.contains("monthly_growth_factor"));
        assert!(schema_json.contains("cache_ttl_secs"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            DashboardConfig::from_json_str(r#"{ "monthly_growth_factor": 0.05, "annual_target": 250000.0 }"#)
                .unwrap();
        assert_eq!(config.monthly_growth_factor, 0.05);
        assert_eq!(config.annual_target, Some(250000.0));
        assert_eq!(config.currency_correction_threshold, 1000.0);
        assert_eq!(config.missing_value_placeholder, "-");
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(DashboardConfig::from_json_str(r#"{ "currency_correction_divisor": 0.0 }"#).is_err());
        assert!(DashboardConfig::from_json_str(r#"{ "monthly_growth_factor": -1.5 }"#).is_err());
        assert!(DashboardConfig::from_json_str(r#"{ "annual_target": -10.0 }"#).is_err());
        assert!(DashboardConfig::from_json_str(r#"{ "rows_per_page": 0 }"#).is_err());
        assert!(DashboardConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_record_serialization() {
        let record = RevenueRecord::new(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), 100.0, 2);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("2024-07-01"));

        let back: RevenueRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(back.is_worked());
    }
}
