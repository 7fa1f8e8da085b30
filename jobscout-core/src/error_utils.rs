use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Upstream(e) => {
                error!("Upstream error details: {:?}", e);
            }
            CoreError::Snapshot(e) => {
                error!("Snapshot error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Upstream(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Upstream(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Upstream(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Search(SearchError::MissingApiKey) => {
                "No search API key configured; discovery will find nothing.".to_string()
            }
            CoreError::Search(SearchError::Provider { message }) => {
                format!("The search provider reported: {}", message)
            }
            CoreError::Snapshot(SnapshotError::WriteFailed { path, .. }) => {
                format!("Could not write job snapshot to {}.", path)
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::AlreadyRunning => {
                "A scrape is already running; wait for it to finish.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Upstream(_) => "UPSTREAM".to_string(),
            CoreError::Search(_) => "SEARCH".to_string(),
            CoreError::Snapshot(_) => "SNAPSHOT".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
            CoreError::AlreadyRunning => "ALREADY_RUNNING".to_string(),
        }
    }
}

impl ErrorExt for UpstreamError {
    fn log_error(&self) -> &Self {
        error!("UpstreamError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("UpstreamError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::RateLimitExceeded { .. } => true,
            UpstreamError::RequestTimeout => true,
            UpstreamError::ConnectionFailed { .. } => true,
            UpstreamError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            UpstreamError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            UpstreamError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            UpstreamError::Forbidden { resource } => {
                format!("Access denied to {}.", resource)
            }
            UpstreamError::NotFound { resource } => format!("Could not find: {}", resource),
            UpstreamError::OrganizationNotFound { organization } => {
                format!("Job board '{}' does not exist.", organization)
            }
            UpstreamError::RequestTimeout => "Request timed out. Please try again.".to_string(),
            UpstreamError::CircuitOpen { target } => format!(
                "{} is failing repeatedly; requests are paused for a while.",
                target
            ),
            _ => "Job board request failed. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            UpstreamError::RateLimitExceeded { .. } => "UPSTREAM_RATE_LIMIT".to_string(),
            UpstreamError::Forbidden { .. } => "UPSTREAM_FORBIDDEN".to_string(),
            UpstreamError::NotFound { .. } => "UPSTREAM_NOT_FOUND".to_string(),
            UpstreamError::OrganizationNotFound { .. } => "UPSTREAM_ORG_NOT_FOUND".to_string(),
            UpstreamError::Rejected { .. } => "UPSTREAM_REJECTED".to_string(),
            UpstreamError::RequestTimeout => "UPSTREAM_TIMEOUT".to_string(),
            UpstreamError::ConnectionFailed { .. } => "UPSTREAM_CONNECTION_FAILED".to_string(),
            UpstreamError::InvalidResponse { .. } => "UPSTREAM_INVALID_RESPONSE".to_string(),
            UpstreamError::ServerError { .. } => "UPSTREAM_SERVER_ERROR".to_string(),
            UpstreamError::CircuitOpen { .. } => "UPSTREAM_CIRCUIT_OPEN".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors are typically not retryable
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => {
                "Configuration file not found. Please check the path.".to_string()
            }
            ConfigError::InvalidFormat { .. } => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::Parse(_) => {
                "Configuration file could not be parsed. Please check the TOML syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
