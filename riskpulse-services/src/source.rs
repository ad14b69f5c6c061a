//! Upstream stats source abstraction
//!
//! The hub only needs "give me the current stats or tell me it failed".
//! Production sessions poll the scoring service; tests script the answers.

use async_trait::async_trait;
use riskpulse_core::{FetchError, StatsSnapshot};
use riskpulse_scoring::ScoringClient;

/// Something that can produce the current aggregate statistics
#[async_trait]
pub trait StatsSource: Send + Sync + 'static {
    /// Single attempt; must not retry internally
    async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError>;
}

#[async_trait]
impl StatsSource for ScoringClient {
    async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
        ScoringClient::fetch_stats(self).await
    }
}
