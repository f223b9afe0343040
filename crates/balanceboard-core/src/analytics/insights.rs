//! Forecast status and usage alerts
//!
//! Rule-based mapping from a forecast to a qualitative status, and
//! once-per-day usage threshold alerts for the push notifier.

use crate::models::AlertConfig;
use balanceboard_types::ForecastResult;
use serde::{Deserialize, Serialize};

/// Qualitative state of today's forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    /// No forecast to judge (gray)
    Unavailable,
    /// Depletion predicted (red)
    Warning,
    /// Predicted spend above the reminder ratio of the budget (orange)
    Reminder,
    /// Spend comfortably within budget (green)
    Normal,
}

impl PredictionStatus {
    /// Derive the status of `forecast` against `daily_budget`
    pub fn derive(
        forecast: Option<&ForecastResult>,
        daily_budget: f64,
        reminder_ratio: f64,
    ) -> Self {
        let Some(forecast) = forecast else {
            return PredictionStatus::Unavailable;
        };

        if forecast.will_exceed_budget || forecast.predicted_end_time.is_some() {
            PredictionStatus::Warning
        } else if forecast.predicted_spent > daily_budget * reminder_ratio {
            PredictionStatus::Reminder
        } else {
            PredictionStatus::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PredictionStatus::Unavailable => "no forecast",
            PredictionStatus::Warning => "warning",
            PredictionStatus::Reminder => "reminder",
            PredictionStatus::Normal => "normal",
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Alert,
    /// The highest configured threshold
    Critical,
}

/// A usage threshold crossed for the first time today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAlert {
    pub threshold: f64,
    pub usage_percentage: f64,
    pub severity: AlertSeverity,
}

impl UsageAlert {
    pub fn title(&self) -> &'static str {
        match self.severity {
            AlertSeverity::Alert => "Usage Alert",
            AlertSeverity::Critical => "Usage Critical",
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Daily usage has reached {:.1}% ({:.0}% threshold)",
            self.usage_percentage, self.threshold
        )
    }
}

/// Thresholds already notified today
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedThresholds {
    notified: Vec<u64>,
}

impl NotifiedThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new day
    pub fn reset(&mut self) {
        self.notified.clear();
    }

    pub fn contains(&self, threshold: f64) -> bool {
        self.notified.contains(&threshold.to_bits())
    }

    fn mark(&mut self, threshold: f64) {
        if !self.contains(threshold) {
            self.notified.push(threshold.to_bits());
        }
    }
}

/// Check `usage_percentage` against the configured thresholds
///
/// Fires for the highest crossed threshold that has not been notified yet
/// and marks it, together with every lower threshold, as notified. A jump
/// from 40% to 96% therefore produces one critical alert, not three.
pub fn evaluate_usage_alert(
    usage_percentage: f64,
    notified: &mut NotifiedThresholds,
    config: &AlertConfig,
) -> Option<UsageAlert> {
    let mut thresholds = config.thresholds.clone();
    thresholds.sort_by(|a, b| a.total_cmp(b));
    let highest = thresholds.last().copied()?;

    let crossed = thresholds
        .iter()
        .copied()
        .filter(|t| usage_percentage >= *t)
        .collect::<Vec<_>>();
    let top = crossed.last().copied()?;

    if notified.contains(top) {
        return None;
    }

    for threshold in &crossed {
        notified.mark(*threshold);
    }

    let severity = if top >= highest {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Alert
    };

    tracing::info!(threshold = top, usage_percentage, "Usage threshold crossed");

    Some(UsageAlert {
        threshold: top,
        usage_percentage,
        severity,
    })
}
