//! Error types for RiskPulse

use thiserror::Error;

/// Failure of a single call to the scoring service.
///
/// Every variant is recoverable: callers decide whether and when to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Scoring service error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        FetchError::Network(msg.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            body: body.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FetchError::Parse(msg.into())
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status { .. } => "status",
            FetchError::Parse(_) => "parse",
        }
    }
}

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum RiskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RiskError {
    pub fn config(msg: impl Into<String>) -> Self {
        RiskError::Config(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        RiskError::Protocol(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        RiskError::Internal(msg.into())
    }
}

/// Result type alias for RiskPulse operations
pub type RiskResult<T> = Result<T, RiskError>;
