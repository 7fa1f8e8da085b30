use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("A scrape run is already in progress")]
    AlreadyRunning,
}

/// Outcome of a request against a job board or the search provider.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Organization not found: {organization}")]
    OrganizationNotFound { organization: String },

    #[error("Request rejected with status {status_code}: {resource}")]
    Rejected { status_code: u16, resource: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Invalid response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Circuit breaker open for {target}")]
    CircuitOpen { target: String },
}

#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Search API key is not configured")]
    MissingApiKey,

    #[error("Search provider returned an error: {message}")]
    Provider { message: String },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to write snapshot to {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Failed to read snapshot from {path}: {reason}")]
    ReadFailed { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
