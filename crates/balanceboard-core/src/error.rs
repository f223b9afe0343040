//! Error types for balanceboard-core
//!
//! Forecasting itself never fails; these cover the file and configuration
//! edges around it, with a load report for graceful degradation.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for balanceboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid UTC offset '{value}' (expected +HH:MM or -HH:MM)")]
    InvalidOffset { value: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

impl CoreError {
    /// Map an io error on `path` to the matching variant
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            CoreError::FileNotFound { path }
        } else {
            CoreError::FileRead { path, source }
        }
    }
}

/// Severity level for errors during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, can continue with degraded functionality
    Warning,
    /// Significant but not fatal
    Error,
}

/// Individual error entry in load report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion) = match error {
            CoreError::FileNotFound { path } => (
                format!("File not found: {}", path.display()),
                Some(format!("Check if file exists: ls {}", path.display())),
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
            ),
            CoreError::JsonParse { path, message, .. } => (
                format!("Invalid JSON in {}: {}", path.display(), message),
                Some("Validate JSON syntax with: jq . <file>".to_string()),
            ),
            CoreError::InvalidOffset { .. } => (
                error.to_string(),
                Some("Use a fixed offset such as +08:00".to_string()),
            ),
            _ => (error.to_string(), None),
        };

        Self {
            source,
            message,
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Report of errors encountered while loading snapshots and settings
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub settings_loaded: bool,
    pub snapshots_loaded: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: LoadReport) {
        self.errors.extend(other.errors);
        self.settings_loaded = self.settings_loaded || other.settings_loaded;
        self.snapshots_loaded += other.snapshots_loaded;
    }
}
