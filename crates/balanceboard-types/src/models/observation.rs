use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One intraday balance observation of the forecasting day.
///
/// Immutable once recorded. `hour_of_day` is measured from the local
/// midnight of the day the observation belongs to, so 14:30 is `14.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Fractional hour in [0, 24)
    pub hour_of_day: f64,
    /// Subscription balance
    pub balance: f64,
    /// Secondary balance, 0 when the account has none
    #[serde(default)]
    pub pay_as_you_go_balance: f64,
    /// Amount spent so far today (budget - balance)
    pub daily_spent: f64,
}

impl Observation {
    /// Build an observation relative to the local midnight `day_start`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use balanceboard_types::Observation;
    ///
    /// let tz = FixedOffset::east_opt(8 * 3600).unwrap();
    /// let day_start = tz.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
    /// let at = tz.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
    ///
    /// let obs = Observation::at(at.to_utc(), day_start, 12.0, 0.0, 20.0);
    /// assert_eq!(obs.hour_of_day, 14.5);
    /// assert_eq!(obs.daily_spent, 8.0);
    /// ```
    pub fn at(
        timestamp: DateTime<Utc>,
        day_start: DateTime<FixedOffset>,
        balance: f64,
        pay_as_you_go_balance: f64,
        daily_budget: f64,
    ) -> Self {
        let elapsed = timestamp.signed_duration_since(day_start.to_utc());
        let hour_of_day = elapsed.num_seconds() as f64 / 3600.0;

        Self {
            timestamp,
            hour_of_day,
            balance,
            pay_as_you_go_balance,
            daily_spent: daily_budget - balance,
        }
    }

    /// Budget implied by this observation (balance + spent)
    pub fn implied_budget(&self) -> f64 {
        self.balance + self.daily_spent
    }
}
