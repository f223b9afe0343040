//! Same-day balance forecasting
//!
//! Predicts the balance trajectory from the last observation until local
//! midnight, the spend by day-end and the probable depletion time. The
//! projection comes from the first strategy of [`STRATEGY_CHAIN`] that yields
//! anything (Holt smoothing, then AR, then moving average).

use super::smoothing::{ProjectionParams, STRATEGY_CHAIN, Strategy, confidence_for};
use crate::models::ForecastConfig;
use balanceboard_types::{Confidence, ForecastMethod, ForecastPoint, ForecastResult, Observation};
use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

/// Hours in the forecasting day
const DAY_HOURS: f64 = 24.0;
/// Steps landing within this many hours of midnight belong to the next day
const MIDNIGHT_TOLERANCE: f64 = 1e-9;

/// Intraday balance forecaster
///
/// Holds only configuration; every call is a pure function of its inputs,
/// so one instance can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

/// Projected paths of both balances, already cut at depletion
#[derive(Debug, Clone)]
struct Projection {
    method: ForecastMethod,
    confidence: Confidence,
    primary: Vec<f64>,
    secondary: Vec<f64>,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Forecast the rest of the day
    ///
    /// `observations` are the samples of the day starting at `day_start`
    /// (local midnight); they need not be sorted. `day_start` only decides
    /// the wall-clock rendering of the depletion time.
    ///
    /// # Returns
    /// - an empty low-confidence result for no observations
    /// - the current spend with low confidence when no strategy applies
    /// - a full prediction series otherwise
    pub fn forecast(
        &self,
        observations: &[Observation],
        daily_budget: f64,
        day_start: DateTime<FixedOffset>,
    ) -> ForecastResult {
        self.forecast_with_chain(&STRATEGY_CHAIN, observations, daily_budget, day_start)
    }

    fn forecast_with_chain(
        &self,
        chain: &[(ForecastMethod, Strategy)],
        observations: &[Observation],
        daily_budget: f64,
        day_start: DateTime<FixedOffset>,
    ) -> ForecastResult {
        let mut sorted = observations.to_vec();
        sorted.sort_by_key(|o| o.timestamp);

        let Some(last) = sorted.last() else {
            debug!("No observations, empty forecast");
            return ForecastResult::empty();
        };

        let balances: Vec<f64> = sorted.iter().map(|o| o.balance).collect();
        let pay_as_you_go: Vec<f64> = sorted.iter().map(|o| o.pay_as_you_go_balance).collect();
        let tracks_pay_as_you_go = pay_as_you_go.iter().any(|v| *v != 0.0);

        let step_minutes = f64::from(self.config.step_minutes.max(1));
        let remaining_minutes = (DAY_HOURS - last.hour_of_day) * 60.0;
        let steps = if remaining_minutes > 0.0 {
            (remaining_minutes / step_minutes).ceil() as usize
        } else {
            0
        };

        let params = ProjectionParams {
            steps,
            step_scale: cadence_scale(&sorted, step_minutes),
            alpha: self.config.alpha,
            beta: self.config.beta,
            rising_trend_floor: self.config.rising_trend_floor,
        };

        debug!(
            observations = sorted.len(),
            last_hour = last.hour_of_day,
            last_balance = last.balance,
            steps,
            step_scale = params.step_scale,
            "Forecasting balance"
        );

        let Some(projection) = project(chain, &balances, &pay_as_you_go, &params) else {
            debug!("Insufficient data, no strategy produced a forecast");
            return ForecastResult::insufficient(daily_budget, last.balance);
        };

        let final_balance = projection
            .primary
            .last()
            .copied()
            .unwrap_or(last.balance);
        let predicted_spent = (daily_budget - final_balance).max(0.0);
        let will_exceed_budget = final_balance <= 0.0;

        let step_hours = step_minutes / 60.0;
        let step_duration = Duration::minutes(i64::from(self.config.step_minutes.max(1)));

        let predicted_end_time = if will_exceed_budget {
            projection
                .primary
                .iter()
                .position(|balance| *balance <= self.config.depletion_epsilon)
                .and_then(|index| {
                    let step = index + 1;
                    let hour = last.hour_of_day + step_hours * step as f64;
                    (hour <= DAY_HOURS + MIDNIGHT_TOLERANCE).then(|| {
                        let at = last.timestamp + step_duration * step as i32;
                        at.with_timezone(day_start.offset()).format("%H:%M").to_string()
                    })
                })
        } else {
            None
        };

        let mut series: Vec<ForecastPoint> = sorted
            .iter()
            .map(|o| ForecastPoint {
                hour_of_day: o.hour_of_day,
                timestamp: o.timestamp,
                balance: Some(o.balance),
                pay_as_you_go_balance: tracks_pay_as_you_go.then_some(o.pay_as_you_go_balance),
                is_predicted: false,
            })
            .collect();

        for (index, (&balance, &secondary)) in projection
            .primary
            .iter()
            .zip(&projection.secondary)
            .enumerate()
        {
            let step = index + 1;
            let hour = last.hour_of_day + step_hours * step as f64;
            if hour >= DAY_HOURS - MIDNIGHT_TOLERANCE {
                break;
            }

            series.push(ForecastPoint {
                hour_of_day: hour,
                timestamp: last.timestamp + step_duration * step as i32,
                balance: Some(balance),
                pay_as_you_go_balance: tracks_pay_as_you_go.then_some(secondary),
                is_predicted: true,
            });
        }

        series.sort_by(|a, b| a.hour_of_day.total_cmp(&b.hour_of_day));

        debug!(
            method = projection.method.label(),
            confidence = projection.confidence.label(),
            predicted_spent,
            will_exceed_budget,
            end_time = predicted_end_time.as_deref().unwrap_or("-"),
            points = series.len(),
            "Forecast complete"
        );

        ForecastResult {
            predicted_spent,
            predicted_end_time,
            will_exceed_budget,
            prediction_series: series,
            confidence: projection.confidence,
            method: Some(projection.method),
        }
    }
}

/// Forecast with the default configuration
pub fn forecast_balance(
    observations: &[Observation],
    daily_budget: f64,
    day_start: DateTime<FixedOffset>,
) -> ForecastResult {
    Forecaster::default().forecast(observations, daily_budget, day_start)
}

/// Run the strategy chain on both series
///
/// The first strategy whose primary path is non-empty wins; the secondary
/// series goes through the same strategy. Both paths stop at the first step
/// where every balance is depleted.
fn project(
    chain: &[(ForecastMethod, Strategy)],
    primary: &[f64],
    secondary: &[f64],
    params: &ProjectionParams,
) -> Option<Projection> {
    chain.iter().find_map(|&(method, strategy)| {
        let primary_path = strategy(primary, params).filter(|path| !path.is_empty())?;
        let secondary_path =
            strategy(secondary, params).unwrap_or_else(|| vec![0.0; primary_path.len()]);

        let (primary_path, secondary_path) = truncate_at_depletion(primary_path, secondary_path);
        debug!(method = method.label(), steps = primary_path.len(), "Strategy selected");

        Some(Projection {
            method,
            confidence: confidence_for(method, primary.len()),
            primary: primary_path,
            secondary: secondary_path,
        })
    })
}

/// Keep both paths up to and including the first step where both are <= 0
fn truncate_at_depletion(mut primary: Vec<f64>, mut secondary: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    let len = primary.len().min(secondary.len());
    let keep = (0..len)
        .find(|&i| primary[i] <= 0.0 && secondary[i] <= 0.0)
        .map_or(len, |i| i + 1);

    primary.truncate(keep);
    secondary.truncate(keep);
    (primary, secondary)
}

/// Ratio between the forecast step and the typical observation interval
///
/// Trends are learned per observation; at the native 5-minute cadence the
/// ratio is 1. The typical interval is the median gap between consecutive
/// samples, so a collector outage does not dilute the trend. Duplicate or
/// single timestamps fall back to 1.
fn cadence_scale(sorted: &[Observation], step_minutes: f64) -> f64 {
    let mut intervals: Vec<f64> = sorted
        .windows(2)
        .map(|w| w[1].timestamp.signed_duration_since(w[0].timestamp))
        .map(|gap| gap.num_milliseconds() as f64 / 1000.0)
        .filter(|secs| *secs > 0.0)
        .collect();

    if intervals.is_empty() {
        return 1.0;
    }

    intervals.sort_by(|a, b| a.total_cmp(b));
    let mid = intervals.len() / 2;
    let median = if intervals.len() % 2 == 0 {
        (intervals[mid - 1] + intervals[mid]) / 2.0
    } else {
        intervals[mid]
    };

    step_minutes * 60.0 / median
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day_start() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 0, 0, 0)
            .unwrap()
    }

    fn obs(hour: f64, balance: f64) -> Observation {
        let ts = day_start().to_utc() + Duration::seconds((hour * 3600.0).round() as i64);
        Observation::at(ts, day_start(), balance, 0.0, 20.0)
    }

    #[test]
    fn test_truncate_stops_when_both_depleted() {
        let (p, s) = truncate_at_depletion(vec![2.0, 0.0, 0.0, 0.0], vec![3.0, 1.0, 0.0, 0.0]);
        assert_eq!(p, vec![2.0, 0.0, 0.0]);
        assert_eq!(s, vec![3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_truncate_single_series() {
        let (p, _) = truncate_at_depletion(vec![2.0, 1.0, 0.0, 0.0], vec![0.0; 4]);
        assert_eq!(p, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_cadence_scale() {
        let five_minute = [obs(9.0, 10.0), obs(9.0 + 5.0 / 60.0, 9.9)];
        assert!((cadence_scale(&five_minute, 5.0) - 1.0).abs() < 1e-9);

        let hourly = [obs(8.0, 10.0), obs(9.0, 9.0), obs(10.0, 8.0)];
        assert!((cadence_scale(&hourly, 5.0) - 1.0 / 12.0).abs() < 1e-12);

        let duplicate = [obs(8.0, 10.0), obs(8.0, 9.0)];
        assert_eq!(cadence_scale(&duplicate, 5.0), 1.0);
    }

    #[test]
    fn test_cadence_scale_ignores_collector_gap() {
        // Three samples after midnight, an outage, then an hour at 5 minutes
        let mut gapped: Vec<_> = (0..3).map(|i| obs(i as f64 * 5.0 / 60.0, 20.0)).collect();
        gapped.extend((0..13).map(|i| obs(12.0 + i as f64 * 5.0 / 60.0, 18.0 - i as f64 * 0.2)));

        assert!((cadence_scale(&gapped, 5.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cadence_scale_even_count_uses_middle_pair() {
        // gaps of 5, 10, 10, 60 minutes: median 10
        let observations = [
            obs(8.0, 10.0),
            obs(8.0 + 5.0 / 60.0, 9.9),
            obs(8.0 + 15.0 / 60.0, 9.8),
            obs(8.0 + 25.0 / 60.0, 9.7),
            obs(9.0 + 25.0 / 60.0, 9.6),
        ];
        assert!((cadence_scale(&observations, 5.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_depletion_exactly_at_midnight_keeps_end_time() {
        // alpha = beta = 1 makes the trend the exact last difference
        let forecaster = Forecaster::new(ForecastConfig {
            alpha: 1.0,
            beta: 1.0,
            ..Default::default()
        });
        let observations = [obs(23.0 + 45.0 / 60.0, 0.75), obs(23.0 + 50.0 / 60.0, 0.5)];

        let result = forecaster.forecast(&observations, 20.0, day_start());

        assert!(result.will_exceed_budget);
        assert_eq!(result.predicted_end_time.as_deref(), Some("00:00"));
        assert!(result.prediction_series.iter().all(|p| p.hour_of_day < 24.0));
    }

    #[test]
    fn test_chain_falls_back_to_autoregressive() {
        let observations: Vec<_> = (0..6)
            .map(|i| obs(20.0 + i as f64 * 5.0 / 60.0, 6.0 - i as f64 * 0.1))
            .collect();

        let result = Forecaster::default().forecast_with_chain(
            &STRATEGY_CHAIN[1..],
            &observations,
            20.0,
            day_start(),
        );

        assert_eq!(result.method, Some(ForecastMethod::AutoRegressive));
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.predicted_points().count() > 0);
    }

    #[test]
    fn test_chain_skips_inapplicable_autoregressive() {
        // 4 points: AR has no fitting row, moving average takes over
        let observations: Vec<_> = (0..4)
            .map(|i| obs(12.0 + i as f64 * 5.0 / 60.0, 10.0 - i as f64 * 0.2))
            .collect();

        let result = Forecaster::default().forecast_with_chain(
            &STRATEGY_CHAIN[1..],
            &observations,
            20.0,
            day_start(),
        );

        assert_eq!(result.method, Some(ForecastMethod::MovingAverage));
        assert_eq!(result.confidence, Confidence::Low);
        let first = result.predicted_points().next().unwrap();
        assert!((first.balance.unwrap() - 9.2).abs() < 1e-9);
    }

    #[test]
    fn test_no_steps_left_is_insufficient() {
        // Malformed input: last sample claims to be past midnight
        let mut late = obs(23.0, 5.0);
        late.hour_of_day = 24.5;
        let observations = vec![obs(22.0, 6.0), late];

        let result = forecast_balance(&observations, 20.0, day_start());

        assert!(result.method.is_none());
        assert_eq!(result.predicted_spent, 15.0);
        assert!(result.prediction_series.is_empty());
    }
}
