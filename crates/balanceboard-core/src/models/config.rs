//! Configuration models for balanceboard settings

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// balanceboard settings (from settings.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Fixed UTC offset that defines the billing day, e.g. "+08:00"
    #[serde(default)]
    pub utc_offset: Option<String>,

    /// Forecasting parameters
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Usage alert configuration
    #[serde(default)]
    pub alerts: AlertConfig,
}

impl Settings {
    /// Billing-day offset, falling back to UTC+8 (the billing provider's zone)
    pub fn offset(&self) -> Result<FixedOffset, CoreError> {
        match self.utc_offset.as_deref() {
            Some(value) => parse_utc_offset(value),
            None => Ok(default_offset()),
        }
    }
}

/// Tunables of the intraday forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastConfig {
    /// Holt level smoothing factor
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Holt trend smoothing factor
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Minutes between two predicted points (matches the collector cadence)
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,

    /// Balance at or below this counts as depleted when locating the end time
    #[serde(default = "default_depletion_epsilon")]
    pub depletion_epsilon: f64,

    /// When set, a rising Holt trend is replaced by `-floor` per step.
    /// None projects rising balances unmodified.
    #[serde(default)]
    pub rising_trend_floor: Option<f64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            step_minutes: default_step_minutes(),
            depletion_epsilon: default_depletion_epsilon(),
            rising_trend_floor: None,
        }
    }
}

impl ForecastConfig {
    /// Reject values the smoothing math cannot work with
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.alpha) || !(0.0..=1.0).contains(&self.beta) {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "alpha and beta must be within [0, 1] (got {}, {})",
                    self.alpha, self.beta
                ),
            });
        }
        if self.step_minutes == 0 || self.step_minutes > 60 {
            return Err(CoreError::InvalidConfig {
                message: format!("stepMinutes must be 1-60 (got {})", self.step_minutes),
            });
        }
        if let Some(floor) = self.rising_trend_floor {
            if floor < 0.0 {
                return Err(CoreError::InvalidConfig {
                    message: format!("risingTrendFloor must be >= 0 (got {})", floor),
                });
            }
        }
        Ok(())
    }
}

/// Daily usage alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    /// Usage percentages that trigger an alert, ascending
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,

    /// Predicted spend above budget * ratio turns the status into a reminder
    #[serde(default = "default_reminder_ratio")]
    pub reminder_ratio: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            reminder_ratio: default_reminder_ratio(),
        }
    }
}

fn default_alpha() -> f64 {
    0.3
}

fn default_beta() -> f64 {
    0.1
}

fn default_step_minutes() -> u32 {
    5
}

fn default_depletion_epsilon() -> f64 {
    0.01
}

fn default_thresholds() -> Vec<f64> {
    vec![50.0, 80.0, 95.0]
}

fn default_reminder_ratio() -> f64 {
    0.8
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or(Utc.fix())
}

/// Parse "+HH:MM", "-HH:MM", "+HHMM" or "Z" into a fixed offset
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, CoreError> {
    let invalid = || CoreError::InvalidOffset {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.forecast.alpha, 0.3);
        assert_eq!(settings.forecast.beta, 0.1);
        assert_eq!(settings.forecast.step_minutes, 5);
        assert!(settings.forecast.rising_trend_floor.is_none());
        assert_eq!(settings.alerts.thresholds, vec![50.0, 80.0, 95.0]);
        assert_eq!(settings.offset().unwrap().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_settings_partial_override() {
        let json = r#"{"utcOffset":"-05:00","forecast":{"alpha":0.5,"risingTrendFloor":0.001}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.forecast.alpha, 0.5);
        assert_eq!(settings.forecast.beta, 0.1);
        assert_eq!(settings.forecast.rising_trend_floor, Some(0.001));
        assert_eq!(settings.offset().unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_utc_offset_formats() {
        assert_eq!(parse_utc_offset("+08:00").unwrap().local_minus_utc(), 28800);
        assert_eq!(parse_utc_offset("+0530").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("-03:30").unwrap().local_minus_utc(), -12600);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("08:00").is_err());
        assert!(parse_utc_offset("+8").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn test_forecast_config_validation() {
        assert!(ForecastConfig::default().validate().is_ok());

        let bad_alpha = ForecastConfig {
            alpha: 1.5,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());

        let bad_step = ForecastConfig {
            step_minutes: 0,
            ..Default::default()
        };
        assert!(bad_step.validate().is_err());
    }
}
