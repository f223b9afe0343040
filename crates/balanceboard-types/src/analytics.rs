//! Forecast output types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much history backed a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Strategy that produced the predicted part of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForecastMethod {
    /// Holt double exponential smoothing
    ExponentialSmoothing,
    /// Autoregressive model on first differences
    AutoRegressive,
    /// Mean slope over the most recent samples
    MovingAverage,
}

impl ForecastMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMethod::ExponentialSmoothing => "exponential smoothing",
            ForecastMethod::AutoRegressive => "autoregressive",
            ForecastMethod::MovingAverage => "moving average",
        }
    }
}

/// A point of the prediction series, either observed or generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub hour_of_day: f64,
    pub timestamp: DateTime<Utc>,
    pub balance: Option<f64>,
    pub pay_as_you_go_balance: Option<f64>,
    pub is_predicted: bool,
}

/// Forecast for the remainder of one day
///
/// Computed fresh on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Expected spend by midnight (budget - final predicted balance), >= 0
    pub predicted_spent: f64,
    /// Wall-clock depletion time ("HH:mm"), if depletion is predicted
    pub predicted_end_time: Option<String>,
    pub will_exceed_budget: bool,
    /// Observed points followed by predicted points, sorted by hour
    pub prediction_series: Vec<ForecastPoint>,
    pub confidence: Confidence,
    /// None when no strategy could produce a forecast
    #[serde(default)]
    pub method: Option<ForecastMethod>,
}

impl ForecastResult {
    /// Result for an empty day
    pub fn empty() -> Self {
        Self {
            predicted_spent: 0.0,
            predicted_end_time: None,
            will_exceed_budget: false,
            prediction_series: Vec::new(),
            confidence: Confidence::Low,
            method: None,
        }
    }

    /// Result when there is data but too little to extrapolate from
    pub fn insufficient(daily_budget: f64, last_balance: f64) -> Self {
        Self {
            predicted_spent: (daily_budget - last_balance).max(0.0),
            predicted_end_time: None,
            will_exceed_budget: last_balance <= 0.0,
            prediction_series: Vec::new(),
            confidence: Confidence::Low,
            method: None,
        }
    }

    /// True if a strategy produced predicted points
    pub fn is_available(&self) -> bool {
        self.method.is_some()
    }

    /// Generated points only
    pub fn predicted_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.prediction_series.iter().filter(|p| p.is_predicted)
    }

    /// Observed points only
    pub fn observed_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.prediction_series.iter().filter(|p| !p.is_predicted)
    }
}
