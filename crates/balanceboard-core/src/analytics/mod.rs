//! Analytics for the daily balance
//!
//! Provides the same-day balance forecast, day statistics and usage history,
//! forecast status, and usage threshold alerts.

use balanceboard_types::ForecastResult;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::models::Settings;
use crate::parsers::DayObservations;

pub mod daily;
pub mod forecasting;
pub mod insights;
pub mod smoothing;


pub use daily::{
    DEFAULT_HISTORY_DAYS, DailyUsage, DayStats, compute_day_stats, compute_history, total_consumed,
};
pub use forecasting::{Forecaster, forecast_balance};
pub use insights::{
    AlertSeverity, NotifiedThresholds, PredictionStatus, UsageAlert, evaluate_usage_alert,
};
pub use smoothing::{ProjectionParams, STRATEGY_CHAIN, Strategy, holt_trend};

/// Everything the dashboard shows for one day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub date: NaiveDate,
    /// Budget of the latest snapshot, 0 when the day is empty
    pub daily_budget: f64,
    pub stats: Option<DayStats>,
    pub forecast: ForecastResult,
    pub status: PredictionStatus,
    /// Timestamp of computation
    pub computed_at: DateTime<Utc>,
}

impl DayReport {
    /// Compute the report of the day starting at `day_start`
    ///
    /// Sync and cheap (one pass per strategy over at most 288 samples).
    pub fn compute(
        day: &DayObservations,
        day_start: DateTime<FixedOffset>,
        settings: &Settings,
    ) -> Self {
        let daily_budget = day.daily_budget.unwrap_or(0.0);
        let forecast = Forecaster::new(settings.forecast.clone()).forecast(
            &day.observations,
            daily_budget,
            day_start,
        );

        // An empty day has nothing to judge
        let status = PredictionStatus::derive(
            (!day.is_empty()).then_some(&forecast),
            daily_budget,
            settings.alerts.reminder_ratio,
        );

        Self {
            date: day_start.date_naive(),
            daily_budget,
            stats: compute_day_stats(&day.observations),
            forecast,
            status,
            computed_at: Utc::now(),
        }
    }
}
