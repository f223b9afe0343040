//! balanceboard-types - Shared data types for balanceboard
//!
//! This crate contains pure data structures without heavy dependencies.
//! No tokio, no async runtime - just serde-serializable types.
//!
//! Used by:
//! - balanceboard-core (forecasting, statistics, ingestion)
//! - balanceboard (CLI output)

pub mod analytics;
pub mod models;

// Re-export analytics types
pub use analytics::{Confidence, ForecastMethod, ForecastPoint, ForecastResult};

// Re-export model types
pub use models::{BalanceSnapshot, Observation};
