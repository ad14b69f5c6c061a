//! Live streaming services for RiskPulse
//!
//! This crate provides the streaming hub that polls the scoring service on
//! behalf of each connected dashboard and pushes stats and heartbeats down
//! an isolated per-client session.

pub mod hub;
pub mod source;

pub use hub::{HubHealth, HubMetrics, HubMetricsSnapshot, SessionId, SessionStream, StreamingHub};
pub use source::StatsSource;
