//! Data models for balanceboard

pub mod config;

pub use balanceboard_types::models::{BalanceSnapshot, Observation};
pub use config::{AlertConfig, ForecastConfig, Settings, parse_utc_offset};
