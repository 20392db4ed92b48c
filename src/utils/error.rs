use crate::domain::model::Source;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("{origin} source failed: {message}")]
    SourceError { origin: Source, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("A sync run is already in progress")]
    SyncInProgress,

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Source,
    Storage,
    Configuration,
    Data,
    Concurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn source_failure(origin: Source, message: impl Into<String>) -> Self {
        SyncError::SourceError {
            origin,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ApiError(_) => ErrorCategory::Network,
            SyncError::SourceError { .. } => ErrorCategory::Source,
            SyncError::IoError(_) | SyncError::DatabaseError(_) | SyncError::CsvError(_) => {
                ErrorCategory::Storage
            }
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SyncError::SerializationError(_) | SyncError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            SyncError::SyncInProgress => ErrorCategory::Concurrency,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 上游暫時失敗，重跑通常可以解決
            ErrorCategory::Network | ErrorCategory::Source | ErrorCategory::Concurrency => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::ApiError(_) => "Check network connectivity and the source endpoint, then retry the sync",
            SyncError::SourceError { .. } => {
                "Verify the source credentials and that the upstream service is reachable; the existing ledger was left untouched"
            }
            SyncError::IoError(_) => "Check that the file exists and the process has permission to access it",
            SyncError::SerializationError(_) => "Check that the snapshot or API payload matches the expected record format",
            SyncError::DatabaseError(_) => {
                "Check the database path and disk space; the previous ledger is kept because the write was rolled back"
            }
            SyncError::CsvError(_) => "Check the export path is writable",
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. } => "Fix the configuration file and run again",
            SyncError::MissingConfigError { .. } => {
                "Add the missing setting to the configuration file or export the referenced environment variable"
            }
            SyncError::SyncInProgress => "Wait for the running sync to finish before starting another one",
            SyncError::ProcessingError { .. } => "Inspect the logs with --verbose for the offending record",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::ApiError(e) if e.is_timeout() => {
                "The request to an upstream service timed out".to_string()
            }
            SyncError::SourceError { origin, message } => {
                format!("Could not fetch data from {}: {}", origin, message)
            }
            SyncError::SyncInProgress => "Another sync is already running".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_failures_are_retryable() {
        let err = SyncError::source_failure(Source::Wave, "HTTP 503");
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("Wave"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = SyncError::MissingConfigError {
            field: "wave.api_token".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_in_progress_message() {
        let err = SyncError::SyncInProgress;
        assert_eq!(err.category(), ErrorCategory::Concurrency);
        assert_eq!(err.user_friendly_message(), "Another sync is already running");
    }
}
