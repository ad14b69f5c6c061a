//! Environment configuration
//!
//! Everything is read once at process start. Unset variables fall back to
//! defaults suited to a local scoring service on port 8000.

use std::env;
use std::time::Duration;

use crate::RiskError;

/// Default base URL of the scoring service
pub const DEFAULT_SCORING_URL: &str = "http://localhost:8000";

/// Default hard timeout for a single upstream call
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(10);

/// Default stats poll cadence per session
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Default heartbeat cadence per session
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(15000);

/// Where and how to reach the scoring service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCORING_URL.to_string(),
            timeout: DEFAULT_SCORING_TIMEOUT,
        }
    }
}

impl ScoringConfig {
    /// Load from the environment
    ///
    /// Reads:
    /// - SCORING_SERVICE_URL: base URL of the scoring service
    /// - SCORING_TIMEOUT_SECS: per-request timeout in seconds
    pub fn from_env() -> Result<Self, RiskError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RiskError> {
        let base_url = lookup("SCORING_SERVICE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_SCORING_URL.to_string());

        let timeout = match lookup("SCORING_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("SCORING_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_SCORING_TIMEOUT,
        };

        Ok(Self { base_url, timeout })
    }
}

/// Cadence of the per-session loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl StreamConfig {
    /// Load from the environment
    ///
    /// Reads:
    /// - STREAM_POLL_INTERVAL_MS
    /// - STREAM_HEARTBEAT_INTERVAL_MS
    pub fn from_env() -> Result<Self, RiskError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RiskError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("STREAM_POLL_INTERVAL_MS") {
            config.poll_interval =
                Duration::from_millis(parse_positive("STREAM_POLL_INTERVAL_MS", &raw)?);
        }
        if let Some(raw) = lookup("STREAM_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval =
                Duration::from_millis(parse_positive("STREAM_HEARTBEAT_INTERVAL_MS", &raw)?);
        }

        Ok(config)
    }
}

/// Intervals and timeouts must be non-zero
fn parse_positive(field: &str, raw: &str) -> Result<u64, RiskError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(RiskError::config(format!("{} must be greater than zero", field))),
        Ok(value) => Ok(value),
        Err(e) => Err(RiskError::config(format!("Invalid {}: {}", field, e))),
    }
}
