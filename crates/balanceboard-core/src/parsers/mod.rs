//! Parsers for balanceboard data files

pub mod settings;
pub mod snapshots;

pub use settings::SettingsParser;
pub use snapshots::{
    DayObservations, SnapshotParser, day_start_for, latest_day, observations_for_day,
};
