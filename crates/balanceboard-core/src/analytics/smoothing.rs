//! Projection strategies for the intraday balance forecaster
//!
//! Each strategy takes one balance series (ascending by time) and returns the
//! projected path for the remaining steps of the day, or `None` when it does
//! not apply to that much history. Paths start from the last actual value,
//! are clamped at 0 and always have `params.steps` entries; cutting them at
//! depletion is left to the caller so two series can stop in lockstep.

use balanceboard_types::{Confidence, ForecastMethod};

/// Highest autoregressive order
pub const AR_MAX_ORDER: usize = 3;
/// Number of most recent lag rows used to fit the AR coefficients
pub const AR_FIT_WINDOW: usize = 5;
/// Samples averaged by the moving-average strategy
pub const MA_WINDOW: usize = 3;

/// Parameters shared by every strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// Number of steps until midnight
    pub steps: usize,
    /// Converts a per-observation change into a per-step change
    pub step_scale: f64,
    pub alpha: f64,
    pub beta: f64,
    pub rising_trend_floor: Option<f64>,
}

/// A projection strategy: `None` means "not applicable"
pub type Strategy = fn(&[f64], &ProjectionParams) -> Option<Vec<f64>>;

/// Strategies in priority order
pub const STRATEGY_CHAIN: [(ForecastMethod, Strategy); 3] = [
    (ForecastMethod::ExponentialSmoothing, exponential_smoothing as Strategy),
    (ForecastMethod::AutoRegressive, autoregressive as Strategy),
    (ForecastMethod::MovingAverage, moving_average as Strategy),
];

/// Confidence tier of a forecast made by `method` from `history_len` samples
pub fn confidence_for(method: ForecastMethod, history_len: usize) -> Confidence {
    match method {
        ForecastMethod::ExponentialSmoothing if history_len >= 5 => Confidence::High,
        ForecastMethod::ExponentialSmoothing => Confidence::Medium,
        ForecastMethod::AutoRegressive => Confidence::Medium,
        ForecastMethod::MovingAverage => Confidence::Low,
    }
}

/// Trend learned by Holt's linear exponential smoothing
///
/// Walks the history once; only the final trend (change per observation) is
/// kept. Requires at least 2 values.
pub fn holt_trend(values: &[f64], alpha: f64, beta: f64) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let &second = rest.first()?;

    let mut level = first;
    let mut trend = second - first;

    for &value in rest {
        let prev_level = level;
        level = alpha * value + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }

    Some(trend)
}

/// Holt double exponential smoothing, extrapolated from the last actual value
///
/// `predicted[i] = max(0, last + trend * i)`. Starting from the last observed
/// value rather than the smoothed level keeps the chart continuous.
pub fn exponential_smoothing(values: &[f64], params: &ProjectionParams) -> Option<Vec<f64>> {
    let trend = holt_trend(values, params.alpha, params.beta)?;
    let last = *values.last()?;

    let mut per_step = trend * params.step_scale;
    if per_step > 0.0 {
        if let Some(floor) = params.rising_trend_floor {
            per_step = -floor;
        }
    }

    tracing::trace!(trend, per_step, last, "Holt projection");

    Some(
        (1..=params.steps)
            .map(|i| (last + per_step * i as f64).max(0.0))
            .collect(),
    )
}

/// Simplified autoregressive model on first differences
///
/// Order is `min(3, n - 1)`. Each coefficient is fitted on its own lag by
/// least squares over the last [`AR_FIT_WINDOW`] rows, which favours the most
/// recent regime. Predicted differences are fed back as lags.
pub fn autoregressive(values: &[f64], params: &ProjectionParams) -> Option<Vec<f64>> {
    if values.len() < 4 {
        return None;
    }

    let order = AR_MAX_ORDER.min(values.len() - 1);
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() <= order {
        return None;
    }

    // Row t: lags diffs[t-1..=t-order] explain diffs[t]
    let rows: Vec<(Vec<f64>, f64)> = (order..diffs.len())
        .map(|t| ((1..=order).map(|lag| diffs[t - lag]).collect(), diffs[t]))
        .collect();
    let recent = &rows[rows.len().saturating_sub(AR_FIT_WINDOW)..];

    let phi: Vec<f64> = (0..order)
        .map(|j| {
            let (num, den) = recent
                .iter()
                .fold((0.0, 0.0), |(num, den), (x, y)| (num + x[j] * y, den + x[j] * x[j]));
            if den != 0.0 { num / den } else { 0.0 }
        })
        .collect();

    tracing::trace!(order, ?phi, "AR coefficients");

    // Oldest first, newest last
    let mut lags: Vec<f64> = diffs[diffs.len() - order..].to_vec();
    let mut current = *values.last()?;
    let mut path = Vec::with_capacity(params.steps);

    for _ in 0..params.steps {
        let predicted_diff: f64 = phi
            .iter()
            .zip(lags.iter().rev())
            .map(|(coef, lag)| coef * lag)
            .sum();

        current = (current + predicted_diff * params.step_scale).max(0.0);
        path.push(current);

        lags.rotate_left(1);
        if let Some(newest) = lags.last_mut() {
            *newest = predicted_diff;
        }
    }

    Some(path)
}

/// Mean change over the last [`MA_WINDOW`] samples, applied cumulatively
pub fn moving_average(values: &[f64], params: &ProjectionParams) -> Option<Vec<f64>> {
    if values.len() < 3 {
        return None;
    }

    let window = MA_WINDOW.min(values.len());
    let recent = &values[values.len() - window..];
    let total_change: f64 = recent.windows(2).map(|w| w[1] - w[0]).sum();
    let avg_change = total_change / (window - 1) as f64;
    let per_step = avg_change * params.step_scale;

    let mut current = *values.last()?;
    let path = (0..params.steps)
        .map(|_| {
            current = (current + per_step).max(0.0);
            current
        })
        .collect();

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(steps: usize) -> ProjectionParams {
        ProjectionParams {
            steps,
            step_scale: 1.0,
            alpha: 0.3,
            beta: 0.1,
            rising_trend_floor: None,
        }
    }

    #[test]
    fn test_holt_trend_needs_two_points() {
        assert!(holt_trend(&[], 0.3, 0.1).is_none());
        assert!(holt_trend(&[5.0], 0.3, 0.1).is_none());
        assert!(holt_trend(&[5.0, 4.0], 0.3, 0.1).is_some());
    }

    #[test]
    fn test_holt_trend_linear_series() {
        let trend = holt_trend(&[20.0, 16.0, 12.0, 8.0, 4.0], 0.3, 0.1).unwrap();
        assert!((trend + 4.0).abs() < 1e-9, "trend was {}", trend);
    }

    #[test]
    fn test_exponential_smoothing_starts_from_last_value() {
        let path = exponential_smoothing(&[10.0, 9.0, 8.0], &params(3)).unwrap();
        let trend = holt_trend(&[10.0, 9.0, 8.0], 0.3, 0.1).unwrap();

        assert_eq!(path.len(), 3);
        assert!((path[0] - (8.0 + trend)).abs() < 1e-12);
        assert!((path[2] - (8.0 + trend * 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_smoothing_clamps_at_zero() {
        let path = exponential_smoothing(&[3.0, 2.0, 1.0], &params(5)).unwrap();
        assert!(path.iter().all(|v| *v >= 0.0));
        assert_eq!(*path.last().unwrap(), 0.0);
    }

    #[test]
    fn test_rising_trend_projected_by_default() {
        let path = exponential_smoothing(&[5.0, 6.0, 7.0], &params(2)).unwrap();
        assert!(path[1] > path[0]);
        assert!(path[0] > 7.0);
    }

    #[test]
    fn test_rising_trend_floor_replaces_positive_trend() {
        let mut p = params(2);
        p.rising_trend_floor = Some(0.01);

        let path = exponential_smoothing(&[5.0, 6.0, 7.0], &p).unwrap();
        assert!((path[0] - 6.99).abs() < 1e-12);
        assert!((path[1] - 6.98).abs() < 1e-12);
    }

    #[test]
    fn test_step_scale_slows_sparse_history() {
        let mut p = params(12);
        // hourly samples, 5-minute steps
        p.step_scale = 5.0 / 60.0;

        let path = exponential_smoothing(&[20.0, 16.0, 12.0, 8.0, 4.0], &p).unwrap();
        assert!((path[0] - (4.0 - 4.0 / 12.0)).abs() < 1e-9);
        assert!(path[11].abs() < 1e-9);
    }

    #[test]
    fn test_autoregressive_needs_enough_lags() {
        assert!(autoregressive(&[4.0, 3.0, 2.0], &params(3)).is_none());
        // 4 values: order 3, 3 diffs, no fitting row
        assert!(autoregressive(&[4.0, 3.0, 2.0, 1.0], &params(3)).is_none());
        assert!(autoregressive(&[5.0, 4.0, 3.0, 2.0, 1.5], &params(3)).is_some());
    }

    #[test]
    fn test_autoregressive_constant_decline() {
        // Constant differences give phi_j = 1 for every lag, so the first
        // predicted difference is 3 * -1.
        let values = [10.0, 9.0, 8.0, 7.0, 6.0, 5.0];
        let path = autoregressive(&values, &params(2)).unwrap();

        assert_eq!(path.len(), 2);
        assert!((path[0] - 2.0).abs() < 1e-12);
        assert_eq!(path[1], 0.0);
    }

    #[test]
    fn test_autoregressive_flat_series_stays_flat() {
        let path = autoregressive(&[7.0; 6], &params(4)).unwrap();
        assert!(path.iter().all(|v| (*v - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_moving_average_uses_recent_window() {
        // Only the last 3 values count: mean change -0.5
        let values = [100.0, 50.0, 10.0, 9.5, 9.0];
        let path = moving_average(&values, &params(3)).unwrap();

        assert_eq!(path, vec![8.5, 8.0, 7.5]);
    }

    #[test]
    fn test_moving_average_needs_three_points() {
        assert!(moving_average(&[2.0, 1.0], &params(3)).is_none());
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(confidence_for(ForecastMethod::ExponentialSmoothing, 5), Confidence::High);
        assert_eq!(confidence_for(ForecastMethod::ExponentialSmoothing, 4), Confidence::Medium);
        assert_eq!(confidence_for(ForecastMethod::AutoRegressive, 10), Confidence::Medium);
        assert_eq!(confidence_for(ForecastMethod::MovingAverage, 10), Confidence::Low);
    }
}
