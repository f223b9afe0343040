//! Output formatting for the CLI commands
//!
//! Every formatter returns the full text to print, either a table or pretty
//! JSON, so commands stay trivially testable.

use anyhow::{Context, Result};
use balanceboard_core::analytics::{
    AlertSeverity, DailyUsage, DayReport, NotifiedThresholds, PredictionStatus, UsageAlert,
    evaluate_usage_alert, total_consumed,
};
use balanceboard_core::error::ErrorSeverity;
use balanceboard_core::models::{AlertConfig, Observation};
use balanceboard_core::{CoreError, LoadReport};
use balanceboard_types::{ForecastPoint, ForecastResult};
use chrono::{FixedOffset, NaiveDate};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Arguments
// ============================================================================

/// Parse a `YYYY-MM-DD` day
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Settings file to read: the explicit one, else the default location
///
/// Without a usable default (no home directory) this records a warning and
/// returns None, so the caller runs on default settings.
pub fn settings_path(
    explicit: Option<&Path>,
    default: Result<PathBuf, CoreError>,
    report: &mut LoadReport,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    match default {
        Ok(path) => Some(path),
        Err(e) => {
            report.add_warning("settings", format!("{}, using default settings", e));
            None
        }
    }
}

/// Warnings first, then errors with their hints; empty when all went well
pub fn format_load_report(report: &LoadReport) -> String {
    let mut out = String::new();

    for warning in report.warnings() {
        out.push_str(&format!("warning: {}: {}\n", warning.source, warning.message));
    }

    for error in report
        .errors
        .iter()
        .filter(|e| e.severity == ErrorSeverity::Error)
    {
        out.push_str(&format!("error: {}: {}\n", error.source, error.message));
        if let Some(suggestion) = &error.suggestion {
            out.push_str(&format!("  hint: {}\n", suggestion));
        }
    }

    out
}

/// Predicted points shown per hour in the forecast table
pub fn rows_per_hour(step_minutes: u32) -> usize {
    (60 / step_minutes.clamp(1, 60)) as usize
}

// ============================================================================
// Forecast
// ============================================================================

/// Render the forecast of `report`
///
/// The table keeps one predicted point every `stride` steps plus the last
/// one, so the depletion point is always visible.
pub fn format_forecast(report: &DayReport, stride: usize, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(&report.forecast)
            .context("Failed to serialize forecast");
    }

    let forecast = &report.forecast;
    let mut out = String::new();
    out.push_str(&format!("balanceboard - Forecast for {}\n", report.date));
    out.push_str("================================\n\n");

    if !forecast.is_available() {
        out.push_str(&format!("Status:           {}\n", report.status.label()));
        if report.stats.is_none() {
            out.push_str("No observations for this day.\n");
        } else {
            out.push_str("Not enough observations to forecast yet.\n");
        }
        return Ok(out);
    }

    out.push_str(&summary_lines(report.daily_budget, forecast, report.status));
    out.push('\n');
    out.push_str(&format_prediction_table(forecast, stride));
    Ok(out)
}

fn summary_lines(budget: f64, forecast: &ForecastResult, status: PredictionStatus) -> String {
    let method = forecast.method.map_or("-", |m| m.label());
    format!(
        "Budget:           ${:.2}\n\
         Predicted spend:  ${:.2}\n\
         Exceeds budget:   {}\n\
         Depletion at:     {}\n\
         Confidence:       {} ({})\n\
         Status:           {}\n",
        budget,
        forecast.predicted_spent,
        if forecast.will_exceed_budget { "yes" } else { "no" },
        forecast.predicted_end_time.as_deref().unwrap_or("-"),
        forecast.confidence.label(),
        method,
        status.label(),
    )
}

fn format_prediction_table(forecast: &ForecastResult, stride: usize) -> String {
    let predicted: Vec<&ForecastPoint> = forecast.predicted_points().collect();
    let stride = stride.max(1);
    let last = predicted.len().saturating_sub(1);

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Time").fg(Color::Cyan),
            Cell::new("Balance").fg(Color::Cyan),
            Cell::new("Pay-as-you-go").fg(Color::Cyan),
        ]);

    for (index, point) in predicted.iter().enumerate() {
        if (index + 1) % stride != 0 && index != last {
            continue;
        }

        let balance = point.balance.unwrap_or(0.0);
        let balance_cell = if balance <= 0.0 {
            Cell::new(format!("{:.2}", balance)).fg(Color::Red)
        } else {
            Cell::new(format!("{:.2}", balance))
        };

        table.add_row(vec![
            Cell::new(format_hour(point.hour_of_day)),
            balance_cell,
            Cell::new(
                point
                    .pay_as_you_go_balance
                    .map_or("-".to_string(), |v| format!("{:.2}", v)),
            ),
        ]);
    }

    table.to_string()
}

/// Fractional hour of day as `HH:MM`
fn format_hour(hour_of_day: f64) -> String {
    let minutes = (hour_of_day * 60.0).round().max(0.0) as u32;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

// ============================================================================
// Stats
// ============================================================================

pub fn format_stats(report: &DayReport, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(report).context("Failed to serialize report");
    }

    let Some(stats) = &report.stats else {
        return Ok(format!("No observations for {}.", report.date));
    };

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Day").fg(Color::Cyan),
            Cell::new("Budget").fg(Color::Cyan),
            Cell::new("Consumed").fg(Color::Cyan),
            Cell::new("Usage").fg(Color::Cyan),
            Cell::new("Balance").fg(Color::Cyan),
            Cell::new("Samples").fg(Color::Cyan),
            Cell::new("Forecast").fg(Color::Cyan),
        ])
        .add_row(vec![
            Cell::new(report.date.to_string()),
            Cell::new(format!("${:.2}", stats.budget)),
            Cell::new(format!("${:.4}", stats.consumed)),
            Cell::new(format!("{:.1}%", stats.usage_percentage)),
            Cell::new(format!("${:.2}", stats.final_balance)),
            Cell::new(stats.observation_count),
            Cell::new(report.status.label()).fg(status_color(report.status)),
        ]);

    Ok(format!("{}\n{}", table, stats.summary()))
}

fn status_color(status: PredictionStatus) -> Color {
    match status {
        PredictionStatus::Unavailable => Color::Grey,
        PredictionStatus::Warning => Color::Red,
        PredictionStatus::Reminder => Color::Yellow,
        PredictionStatus::Normal => Color::Green,
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// An alert with the local time of the observation that raised it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedAlert {
    pub time: String,
    #[serde(flatten)]
    pub alert: UsageAlert,
}

/// Feed the day's observations through the alert evaluator in order
///
/// Same as what the collector notifies live: each threshold at most once.
pub fn replay_alerts(
    observations: &[Observation],
    config: &AlertConfig,
    offset: FixedOffset,
) -> Vec<TimedAlert> {
    let mut notified = NotifiedThresholds::new();
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.timestamp);

    sorted
        .into_iter()
        .filter_map(|obs| {
            let budget = obs.implied_budget();
            if budget <= 0.0 {
                return None;
            }
            let usage = obs.daily_spent / budget * 100.0;
            evaluate_usage_alert(usage, &mut notified, config).map(|alert| TimedAlert {
                time: obs.timestamp.with_timezone(&offset).format("%H:%M").to_string(),
                alert,
            })
        })
        .collect()
}

pub fn format_alerts(alerts: &[TimedAlert], json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(alerts).context("Failed to serialize alerts");
    }

    if alerts.is_empty() {
        return Ok("No usage thresholds crossed.".to_string());
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Time").fg(Color::Cyan),
            Cell::new("Alert").fg(Color::Cyan),
            Cell::new("Message").fg(Color::Cyan),
        ]);

    for timed in alerts {
        let color = match timed.alert.severity {
            AlertSeverity::Critical => Color::Red,
            AlertSeverity::Alert => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(&timed.time),
            Cell::new(timed.alert.title()).fg(color),
            Cell::new(timed.alert.message()),
        ]);
    }

    Ok(table.to_string())
}

// ============================================================================
// History
// ============================================================================

pub fn format_history(history: &[DailyUsage], json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(history).context("Failed to serialize history");
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Day").fg(Color::Cyan),
            Cell::new("Consumed").fg(Color::Cyan),
            Cell::new("Usage").fg(Color::Cyan),
            Cell::new("Expired").fg(Color::Cyan),
            Cell::new("Samples").fg(Color::Cyan),
        ]);

    for day in history {
        let row = match &day.stats {
            Some(stats) => vec![
                Cell::new(day.date.to_string()),
                Cell::new(format!("${:.2}", stats.consumed)),
                Cell::new(format!("{:.1}%", stats.usage_percentage)),
                Cell::new(format!("${:.2}", stats.expired)),
                Cell::new(stats.observation_count),
            ],
            None => vec![
                Cell::new(day.date.to_string()).fg(Color::DarkGrey),
                Cell::new("$0.00").fg(Color::DarkGrey),
                Cell::new("-").fg(Color::DarkGrey),
                Cell::new("-").fg(Color::DarkGrey),
                Cell::new(0).fg(Color::DarkGrey),
            ],
        };
        table.add_row(row);
    }

    let active = history.iter().filter(|d| d.stats.is_some()).count();
    let total = total_consumed(history);
    let average = if active > 0 { total / active as f64 } else { 0.0 };

    Ok(format!(
        "{}\nTotal: ${:.2} over {} active of {} days (average ${:.2} per active day)",
        table,
        total,
        active,
        history.len(),
        average
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use balanceboard_core::analytics::compute_history;
    use balanceboard_core::models::{BalanceSnapshot, Settings};
    use balanceboard_core::parsers::DayObservations;
    use chrono::{DateTime, Duration, TimeZone};

    fn day_start() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 0, 0, 0)
            .unwrap()
    }

    fn draining(count: usize, per_sample: f64) -> Vec<Observation> {
        (0..count)
            .map(|i| {
                let ts = day_start().to_utc() + Duration::minutes(9 * 60 + 5 * i as i64);
                Observation::at(ts, day_start(), 20.0 - per_sample * i as f64, 0.0, 20.0)
            })
            .collect()
    }

    fn report(observations: Vec<Observation>) -> DayReport {
        let day = DayObservations {
            daily_budget: observations.first().map(|_| 20.0),
            observations,
        };
        DayReport::compute(&day, day_start(), &Settings::default())
    }

    #[test]
    fn test_settings_path_without_home_falls_back() {
        let mut report = LoadReport::new();

        let path = settings_path(None, Err(CoreError::HomeNotFound), &mut report);

        assert!(path.is_none());
        assert_eq!(report.warnings().count(), 1);
        assert!(report.errors[0].message.contains("using default settings"));
    }

    #[test]
    fn test_settings_path_prefers_explicit() {
        let mut report = LoadReport::new();
        let explicit = PathBuf::from("/etc/balanceboard.json");

        let path = settings_path(Some(&explicit), Err(CoreError::HomeNotFound), &mut report);

        assert_eq!(path, Some(explicit));
        assert!(!report.has_errors());
    }

    #[test]
    fn test_format_load_report_merges_sources() {
        let mut report = LoadReport::new();
        settings_path(None, Err(CoreError::HomeNotFound), &mut report);

        let mut snapshot_report = LoadReport::new();
        snapshot_report.add_error(balanceboard_core::LoadError::from_core_error(
            "snapshots",
            &CoreError::FileNotFound {
                path: PathBuf::from("/data/snapshots.json"),
            },
        ));
        report.merge(snapshot_report);

        let out = format_load_report(&report);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("warning: settings:"));
        assert!(lines[1].starts_with("error: snapshots: File not found"));
        assert!(lines[2].starts_with("  hint:"));
        assert!(format_load_report(&LoadReport::new()).is_empty());
    }

    #[test]
    fn test_format_history() {
        let snapshots = vec![
            BalanceSnapshot {
                timestamp: day_start().to_utc() + Duration::hours(9),
                balance: 20.0,
                pay_as_you_go_balance: None,
                daily_budget: 20.0,
            },
            BalanceSnapshot {
                timestamp: day_start().to_utc() + Duration::hours(20),
                balance: 8.0,
                pay_as_you_go_balance: None,
                daily_budget: 20.0,
            },
        ];
        let history = compute_history(
            &snapshots,
            day_start().date_naive(),
            3,
            *day_start().offset(),
        );

        let out = format_history(&history, false).unwrap();
        assert!(out.contains("2026-10-17"));
        assert!(out.contains("60.0%"));
        assert!(
            out.ends_with("Total: $12.00 over 1 active of 3 days (average $12.00 per active day)")
        );

        let value: serde_json::Value =
            serde_json::from_str(&format_history(&history, true).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert!(value[0]["stats"].is_null());
        assert_eq!(value[2]["date"], "2026-10-19");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-10-19").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
        assert!(parse_date("19/10/2026").is_err());
    }

    #[test]
    fn test_rows_per_hour() {
        assert_eq!(rows_per_hour(5), 12);
        assert_eq!(rows_per_hour(0), 60);
        assert_eq!(rows_per_hour(90), 1);
    }

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(13.0), "13:00");
        assert_eq!(format_hour(9.5), "09:30");
        assert_eq!(format_hour(23.0 + 55.0 / 60.0), "23:55");
    }

    #[test]
    fn test_format_forecast_table() {
        let out = format_forecast(&report(draining(12, 0.5)), 12, false).unwrap();

        assert!(out.contains("Forecast for 2026-10-19"));
        assert!(out.contains("Exceeds budget:   yes"));
        assert!(out.contains("Status:           warning"));
        assert!(out.contains("Pay-as-you-go"));
    }

    #[test]
    fn test_format_forecast_json() {
        let out = format_forecast(&report(draining(6, 0.1)), 12, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert!(value["predictedSpent"].is_number());
        assert_eq!(value["method"], "exponentialSmoothing");
    }

    #[test]
    fn test_format_forecast_empty_day() {
        let out = format_forecast(&report(Vec::new()), 12, false).unwrap();
        assert!(out.contains("No observations for this day."));
        assert!(out.contains("no forecast"));
    }

    #[test]
    fn test_format_stats() {
        let out = format_stats(&report(draining(5, 1.0)), false).unwrap();
        assert!(out.contains("20.0%"));
        assert!(out.contains("Usage: $4.0000 (20.0%), expired: $16.00"));

        let out = format_stats(&report(Vec::new()), false).unwrap();
        assert_eq!(out, "No observations for 2026-10-19.");
    }

    #[test]
    fn test_replay_alerts_fire_once() {
        // 1.0 per sample: 50% at sample 10, 80% at 16, 95% at 19
        let observations = draining(21, 1.0);
        let alerts =
            replay_alerts(&observations, &AlertConfig::default(), *day_start().offset());

        let thresholds: Vec<f64> = alerts.iter().map(|a| a.alert.threshold).collect();
        assert_eq!(thresholds, vec![50.0, 80.0, 95.0]);
        assert_eq!(alerts[0].time, "09:50");
    }

    #[test]
    fn test_format_alerts() {
        assert_eq!(format_alerts(&[], false).unwrap(), "No usage thresholds crossed.");

        let offset = *day_start().offset();
        let alerts = replay_alerts(&draining(12, 1.0), &AlertConfig::default(), offset);
        let out = format_alerts(&alerts, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["threshold"], 50.0);
        assert_eq!(value[0]["severity"], "alert");
    }
}
