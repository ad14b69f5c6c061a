//! Core types for RiskPulse
//!
//! This crate defines the shared data structures used across the portfolio
//! risk monitor: the opaque stats snapshot, the live stream protocol,
//! connection lifecycle and environment configuration.

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod snapshot;

pub use config::{ScoringConfig, StreamConfig};
pub use connection::ConnectionState;
pub use error::{FetchError, RiskError, RiskResult};
pub use event::{
    EventKind, SessionEvent, StreamEvent, WireEvent, DASHBOARD_STATS_EVENT, PING_EVENT,
};
pub use snapshot::StatsSnapshot;
