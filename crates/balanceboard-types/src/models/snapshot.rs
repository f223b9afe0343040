use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw balance reading as stored by the collector (one every 5 minutes).
///
/// This is the on-disk shape of a snapshot file entry:
///
/// ```json
/// { "timestamp": "2026-10-19T01:05:00Z", "balance": 18.42,
///   "payAsYouGoBalance": 3.10, "dailyBudget": 20.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    /// When the billing endpoint was polled
    pub timestamp: DateTime<Utc>,
    /// Subscription balance (resets daily to the budget)
    pub balance: f64,
    /// Pay-as-you-go balance, absent for accounts without one
    #[serde(default)]
    pub pay_as_you_go_balance: Option<f64>,
    /// Daily quota configured on the plan at polling time
    pub daily_budget: f64,
}
