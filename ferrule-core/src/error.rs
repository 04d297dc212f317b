//! Error types for Ferrule

use thiserror::Error;

/// The main error type for Ferrule operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-sqlx connection implementation
    #[error("Driver error: {message}")]
    Driver { message: String },

    /// Runtime settings were read before `config::init`
    #[error("Runtime settings have not been initialized")]
    NotInitialized,

    /// `config::init` was called more than once
    #[error("Runtime settings are already initialized")]
    AlreadyInitialized,

    /// Invalid runtime configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Caller supplied invalid builder input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The system clock moved backwards past the tolerated window
    #[error("Clock moved backwards by {millis} ms, refusing to generate id")]
    ClockMovedBackwards { millis: i64 },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row could not be mapped onto the target type
    #[error("Mapping error: {message}")]
    Mapping { message: String },
}

/// Broad classification of an [`Error`], used to decide whether to retry,
/// fix the call site, or surface the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid setup
    Configuration,
    /// Invalid builder input or an unsafe request
    Usage,
    /// Driver, database or row mapping failure
    Database,
    /// Clock anomaly during key generation
    Clock,
}

/// Convenience Result type for Ferrule operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotInitialized | Error::AlreadyInitialized | Error::Configuration { .. } => {
                ErrorKind::Configuration
            }
            Error::InvalidInput { .. } => ErrorKind::Usage,
            Error::ClockMovedBackwards { .. } => ErrorKind::Clock,
            Error::Database(_)
            | Error::Driver { .. }
            | Error::Serialization(_)
            | Error::Mapping { .. } => ErrorKind::Database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = Error::invalid_input("IN list must not be empty");
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert_eq!(err.to_string(), "Invalid input: IN list must not be empty");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_configuration_errors() {
        let err = Error::configuration("worker id 40 out of range 0..=31");
        assert_eq!(
            err.to_string(),
            "Configuration error: worker id 40 out of range 0..=31"
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(Error::NotInitialized.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_clock_error() {
        let err = Error::ClockMovedBackwards { millis: 12 };
        assert_eq!(
            err.to_string(),
            "Clock moved backwards by 12 ms, refusing to generate id"
        );
        assert_eq!(err.kind(), ErrorKind::Clock);
    }

    #[test]
    fn test_driver_error_is_database_kind() {
        let err = Error::driver("connection reset");
        assert_eq!(err.to_string(), "Driver error: connection reset");
        assert_eq!(err.kind(), ErrorKind::Database);
    }
}
