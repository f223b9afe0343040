//! Per-day consumption statistics and the usage history

use crate::parsers::{day_start_for, observations_for_day};
use balanceboard_types::{BalanceSnapshot, Observation};
use chrono::{Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Days shown by the usage history by default
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// What happened to the daily budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub budget: f64,
    /// Balance of the latest observation
    pub final_balance: f64,
    /// budget - final balance
    pub consumed: f64,
    /// Unused balance forfeited at the midnight reset
    pub expired: f64,
    /// consumed / budget * 100, 0 for a zero budget
    pub usage_percentage: f64,
    pub observation_count: usize,
}

impl DayStats {
    /// One-line daily summary, as pushed after the midnight reset
    pub fn summary(&self) -> String {
        format!(
            "Usage: ${:.4} ({:.1}%), expired: ${:.2}",
            self.consumed, self.usage_percentage, self.expired
        )
    }
}

/// Compute the day's statistics, `None` for a day without observations
///
/// The budget comes from the earliest observation (balance + spent), the
/// final balance from the latest one.
pub fn compute_day_stats(observations: &[Observation]) -> Option<DayStats> {
    let first = observations.iter().min_by_key(|o| o.timestamp)?;
    let last = observations.iter().max_by_key(|o| o.timestamp)?;

    let budget = first.implied_budget();
    let final_balance = last.balance;
    let consumed = budget - final_balance;
    let usage_percentage = if budget > 0.0 {
        consumed / budget * 100.0
    } else {
        0.0
    };

    Some(DayStats {
        budget,
        final_balance,
        consumed,
        expired: final_balance.max(0.0),
        usage_percentage,
        observation_count: observations.len(),
    })
}

/// One day of the usage history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    /// None for a day without snapshots
    pub stats: Option<DayStats>,
}

impl DailyUsage {
    /// Amount consumed, 0 for a day without snapshots
    pub fn consumed(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, |s| s.consumed)
    }

    pub fn usage_percentage(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, |s| s.usage_percentage)
    }
}

/// Per-day statistics of the `days` days ending at `end_date`, oldest first
///
/// Every date of the window is present; days without snapshots carry no
/// stats and count as zero usage.
pub fn compute_history(
    snapshots: &[BalanceSnapshot],
    end_date: NaiveDate,
    days: u32,
    offset: FixedOffset,
) -> Vec<DailyUsage> {
    let history: Vec<DailyUsage> = (0..days)
        .rev()
        .filter_map(|back| end_date.checked_sub_days(Days::new(u64::from(back))))
        .map(|date| {
            let day = observations_for_day(snapshots, day_start_for(date, offset));
            DailyUsage {
                date,
                stats: compute_day_stats(&day.observations),
            }
        })
        .collect();

    debug!(
        %end_date,
        days,
        active = history.iter().filter(|d| d.stats.is_some()).count(),
        "Computed usage history"
    );

    history
}

/// Total consumed over a history
pub fn total_consumed(history: &[DailyUsage]) -> f64 {
    history.iter().map(DailyUsage::consumed).sum()
}
