//! Settings and configuration errors.

use thiserror::Error;

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised at the settings validation boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("failed to parse [{key}] from value [{value}]: not an integer")]
    NotAnInteger { key: String, value: String },

    #[error("failed to parse value [{value}] for setting [{key}] must be >= {min}")]
    BelowMinimum { key: String, value: i64, min: i32 },

    #[error("unknown setting [{0}]")]
    Unknown(String),

    #[error("setting [{0}] is not dynamically updateable")]
    NotDynamic(String),

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
