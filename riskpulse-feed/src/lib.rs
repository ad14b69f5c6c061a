//! Live stats distribution for RiskPulse consumers
//!
//! A [`FeedProvider`] holds one subscription to the API's event stream and
//! republishes the latest dashboard stats to every mounted [`FeedHandle`].
//!
//! Environment variables:
//! - `RISKPULSE_STREAM_URL` - stream endpoint (default `http://localhost:3001/api/stream`)
//! - `RISKPULSE_MAX_RECONNECTS` - consecutive reconnect limit, 0 for unlimited

pub mod error;
pub mod provider;
pub mod seed;
pub mod source;
pub mod state;

pub use error::FeedError;
pub use provider::{FeedConfig, FeedHandle, FeedMetricsSnapshot, FeedProvider, DEFAULT_STREAM_URL};
pub use seed::{fetch_seed, stats_url_for};
pub use source::{EventSource, HttpEventSource, WireStream};
pub use state::DistributionState;
