//! Hub-wide counters
//!
//! Sessions never share mutable state with each other; these atomics are
//! the only thing they all touch, and only to record what happened.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use riskpulse_core::{EventKind, FetchError};
use serde::Serialize;

/// Stale threshold - if sessions are open but no stats were delivered for
/// this long, the upstream is considered stale
const STALE_THRESHOLD_SECS: u64 = 60;

/// Point-in-time view of the hub counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubMetricsSnapshot {
    pub active_sessions: u64,
    pub sessions_opened: u64,
    pub stats_events: u64,
    pub heartbeat_events: u64,
    pub poll_successes: u64,
    pub poll_failures: u64,
    pub dropped_events: u64,
}

impl HubMetricsSnapshot {
    /// Events actually written to any session channel
    pub fn events_emitted(&self) -> u64 {
        self.stats_events + self.heartbeat_events
    }
}

/// Health summary served by the API
#[derive(Debug, Clone, Serialize)]
pub struct HubHealth {
    #[serde(flatten)]
    pub metrics: HubMetricsSnapshot,
    pub last_stats_time: Option<DateTime<Utc>>,
    pub is_stale: bool,
    pub healthy: bool,
}

/// Atomic counters shared by every session of a hub
#[derive(Debug, Default)]
pub struct HubMetrics {
    active_sessions: AtomicU64,
    sessions_opened: AtomicU64,
    stats_events: AtomicU64,
    heartbeat_events: AtomicU64,
    poll_successes: AtomicU64,
    poll_failures: AtomicU64,
    dropped_events: AtomicU64,
    last_stats_epoch_ms: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_event(&self, kind: EventKind) {
        match kind {
            EventKind::DashboardStats => {
                self.stats_events.fetch_add(1, Ordering::SeqCst);
                self.last_stats_epoch_ms.store(now_ms(), Ordering::SeqCst);
            }
            EventKind::Ping => {
                self.heartbeat_events.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_events.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_poll(&self, result: Result<(), &FetchError>) {
        match result {
            Ok(()) => self.poll_successes.fetch_add(1, Ordering::SeqCst),
            Err(_) => self.poll_failures.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            active_sessions: self.active_sessions.load(Ordering::SeqCst),
            sessions_opened: self.sessions_opened.load(Ordering::SeqCst),
            stats_events: self.stats_events.load(Ordering::SeqCst),
            heartbeat_events: self.heartbeat_events.load(Ordering::SeqCst),
            poll_successes: self.poll_successes.load(Ordering::SeqCst),
            poll_failures: self.poll_failures.load(Ordering::SeqCst),
            dropped_events: self.dropped_events.load(Ordering::SeqCst),
        }
    }

    pub fn health(&self) -> HubHealth {
        let metrics = self.snapshot();
        let last_ms = self.last_stats_epoch_ms.load(Ordering::SeqCst);

        let last_stats_time = if last_ms > 0 {
            DateTime::from_timestamp(
                (last_ms / 1000) as i64,
                ((last_ms % 1000) * 1_000_000) as u32,
            )
        } else {
            None
        };

        // Nobody connected means nobody polling, which is not staleness
        let is_stale = if metrics.active_sessions == 0 || last_ms == 0 {
            false
        } else {
            now_ms().saturating_sub(last_ms) > STALE_THRESHOLD_SECS * 1000
        };

        HubHealth {
            metrics,
            last_stats_time,
            is_stale,
            healthy: !is_stale,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
