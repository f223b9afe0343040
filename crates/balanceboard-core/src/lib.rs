//! balanceboard-core - Core library for balanceboard
//!
//! Provides snapshot ingestion, settings, the intraday balance forecaster,
//! day statistics and usage alerts.

pub mod analytics;
pub mod error;
pub mod models;
pub mod parsers;

pub use analytics::{DayReport, DayStats, Forecaster, PredictionStatus, forecast_balance};
pub use error::{CoreError, LoadError, LoadReport};
pub use models::Settings;
pub use parsers::{DayObservations, SettingsParser, SnapshotParser};
