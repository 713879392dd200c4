use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("HTTP status {status} after {attempts} attempt(s)")]
    HttpStatus { status: u16, attempts: u32 },

    #[error("API reported failure: {}", errors.join("; "))]
    Api { errors: Vec<String> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EtlError::Timeout(err)
        } else {
            EtlError::Transport(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::Transport(_) | EtlError::Timeout(_) | EtlError::HttpStatus { .. } => {
                ErrorCategory::Network
            }
            EtlError::Api { .. } => ErrorCategory::Api,
            EtlError::IoError(_) => ErrorCategory::Storage,
            EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Api | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::Transport(_) => "Check network connectivity and the API endpoint URL",
            EtlError::Timeout(_) => "Increase --timeout-seconds or retry later",
            EtlError::HttpStatus { .. } => "The provider is unavailable, retry the run later",
            EtlError::Api { .. } => "Verify the API key and the requested method",
            EtlError::IoError(_) => "Check that the output directory is writable",
            EtlError::SerializationError(_) => "The provider returned an unexpected payload",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Fix the configuration and run again",
        }
    }

    /// Process exit code for a failed run.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the provider API: {}", self),
            ErrorCategory::Api => format!("The provider API rejected the request: {}", self),
            ErrorCategory::Storage => format!("Could not write output files: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_joins_messages() {
        let err = EtlError::Api {
            errors: vec!["API key expired".to_string(), "Access denied".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "API reported failure: API key expired; Access denied"
        );
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[test]
    fn test_status_errors_are_network_errors() {
        let err = EtlError::HttpStatus {
            status: 503,
            attempts: 5,
        };
        assert_eq!(err.to_string(), "HTTP status 503 after 5 attempt(s)");
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::MissingConfigError {
            field: "source.api_key".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}
