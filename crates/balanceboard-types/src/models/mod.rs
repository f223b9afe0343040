//! Data models for balance observations

pub mod observation;
pub mod snapshot;

pub use observation::Observation;
pub use snapshot::BalanceSnapshot;
