//! Snapshot file parser and day slicing
//!
//! The collector writes one `BalanceSnapshot` every 5 minutes. The forecaster
//! only ever looks at a single billing day, so this module turns a snapshot
//! list into the ordered observations of one explicit local day.

use crate::error::{CoreError, LoadError, LoadReport};
use balanceboard_types::{BalanceSnapshot, Observation};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::path::Path;
use tracing::{debug, warn};

/// Observations of one day plus the budget that applies to it
#[derive(Debug, Clone, Default)]
pub struct DayObservations {
    /// Sorted ascending by timestamp
    pub observations: Vec<Observation>,
    /// Budget of the most recent snapshot of the day
    pub daily_budget: Option<f64>,
}

impl DayObservations {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Local midnight of `date` in `offset`
pub fn day_start_for(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let midnight = date.and_time(NaiveTime::MIN);
    let utc_midnight = midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    offset.from_utc_datetime(&utc_midnight)
}

/// Local date of the most recent snapshot
pub fn latest_day(snapshots: &[BalanceSnapshot], offset: FixedOffset) -> Option<NaiveDate> {
    snapshots
        .iter()
        .map(|s| s.timestamp)
        .max()
        .map(|ts| ts.with_timezone(&offset).date_naive())
}

/// Keep the snapshots inside `[day_start, day_start + 24h)` and convert them
pub fn observations_for_day(
    snapshots: &[BalanceSnapshot],
    day_start: DateTime<FixedOffset>,
) -> DayObservations {
    let start: DateTime<Utc> = day_start.to_utc();
    let end = start + Duration::hours(24);

    let mut today: Vec<&BalanceSnapshot> = snapshots
        .iter()
        .filter(|s| s.timestamp >= start && s.timestamp < end)
        .collect();
    today.sort_by_key(|s| s.timestamp);

    let daily_budget = today.last().map(|s| s.daily_budget);

    let observations = today
        .iter()
        .map(|s| {
            Observation::at(
                s.timestamp,
                day_start,
                s.balance,
                s.pay_as_you_go_balance.unwrap_or(0.0),
                s.daily_budget,
            )
        })
        .collect::<Vec<_>>();

    debug!(
        day = %day_start.date_naive(),
        kept = observations.len(),
        total = snapshots.len(),
        "Sliced snapshots to day"
    );

    DayObservations {
        observations,
        daily_budget,
    }
}

/// Parser for collector snapshot files (JSON array of snapshots)
pub struct SnapshotParser;

impl Default for SnapshotParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse(&self, path: &Path) -> Result<Vec<BalanceSnapshot>, CoreError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::from_io(path, e))?;

        serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })
    }

    /// Parse with graceful degradation: failures become an empty list
    pub async fn parse_graceful(
        &self,
        path: &Path,
        report: &mut LoadReport,
    ) -> Vec<BalanceSnapshot> {
        match self.parse(path).await {
            Ok(snapshots) => {
                debug!(?path, count = snapshots.len(), "Loaded snapshots");
                report.snapshots_loaded += snapshots.len();
                snapshots
            }
            Err(e) => {
                warn!(?path, error = %e, "Failed to load snapshots");
                report.add_error(LoadError::from_core_error("snapshots", &e));
                Vec::new()
            }
        }
    }
}
