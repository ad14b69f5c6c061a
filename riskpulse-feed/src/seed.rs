//! One-time direct stats fetch used to seed a feed before its first event

use std::time::Duration;

use reqwest::Client;
use riskpulse_core::StatsSnapshot;
use tracing::{debug, warn};

const SEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Stats endpoint served next to a stream endpoint
///
/// `http://host/api/stream` becomes `http://host/api/stats`.
pub fn stats_url_for(stream_url: &str) -> String {
    match stream_url.strip_suffix("/stream") {
        Some(base) => format!("{}/stats", base),
        None => format!("{}/stats", stream_url.trim_end_matches('/')),
    }
}

/// Best-effort fetch; any failure is logged and yields `None`
pub async fn fetch_seed(url: &str) -> Option<StatsSnapshot> {
    let client = match Client::builder().timeout(SEED_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to create seed client: {}", e);
            return None;
        }
    };

    let response = match client.get(url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!("Seed fetch rejected with status {}", response.status());
            return None;
        }
        Err(e) => {
            warn!("Seed fetch failed: {}", e);
            return None;
        }
    };

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Seed body unreadable: {}", e);
            return None;
        }
    };

    match StatsSnapshot::from_slice(&body) {
        Ok(snapshot) => {
            debug!("Seeded stats from {}", url);
            Some(snapshot)
        }
        Err(e) => {
            warn!("Seed payload is not JSON: {}", e);
            None
        }
    }
}
