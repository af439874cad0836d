use thiserror::Error;

/// Application-wide error types for jobscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Page content could not be interpreted.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Writing to the output sink failed.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Run input is invalid.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::HttpStatus { status, .. } => *status >= 500,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::SinkError(e.to_string())
    }
}

/// Classified outcome of a failed Source Adapter invocation.
///
/// The orchestrator only ever looks at the variant: a block is counted in
/// `blockedEvents`, anything else in `errors`.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source answered with an anti-bot defense (captcha, traffic wall).
    #[error("Blocked: {reason}")]
    Blocked { reason: String },

    /// Navigation, fetch or parse failure.
    #[error(transparent)]
    Failed(#[from] AppError),
}

impl SourceError {
    pub fn blocked(reason: impl Into<String>) -> Self {
        SourceError::Blocked {
            reason: reason.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, SourceError::Blocked { .. })
    }
}
