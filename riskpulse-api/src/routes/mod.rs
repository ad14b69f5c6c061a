//! API route definitions

mod customers;
mod health;
mod stream;

use axum::Router;
use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(stream::routes())
        .merge(health::routes())
        .merge(customers::routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use riskpulse_core::{FetchError, ScoringConfig, StatsSnapshot, StreamConfig};
    use riskpulse_scoring::ScoringClient;
    use riskpulse_services::{StatsSource, StreamingHub};

    use crate::AppState;

    pub const STATS: &str = r#"{"summary":{"totalCustomers":1000,"criticalRisk":12}}"#;

    pub struct FixedSource;

    #[async_trait]
    impl StatsSource for FixedSource {
        async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
            Ok(StatsSnapshot::from_json(STATS).unwrap())
        }
    }

    /// State whose hub streams `STATS` and whose scoring client talks to `scoring_url`
    pub fn state(scoring_url: &str) -> AppState {
        let scoring = ScoringClient::new(&ScoringConfig {
            base_url: scoring_url.to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        AppState {
            hub: Arc::new(StreamingHub::new(Arc::new(FixedSource), StreamConfig::default())),
            scoring: Arc::new(scoring),
        }
    }
}
