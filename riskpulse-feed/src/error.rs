//! Error types for the feed

use thiserror::Error;

/// Errors surfaced by the distribution context
#[derive(Debug, Error)]
pub enum FeedError {
    /// Could not reach the stream endpoint
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Stream endpoint answered with a non-success status
    #[error("Stream rejected with status {0}")]
    Status(u16),

    /// Established stream broke
    #[error("Stream error: {0}")]
    Stream(String),

    /// A handle was used after its provider went away
    #[error("Feed accessed outside its provider")]
    OutsideProvider,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
