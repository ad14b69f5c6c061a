//! Stream event types for live dashboard updates
//!
//! These types define the protocol between the streaming hub and the
//! distribution context. On the wire every event is a server-sent event
//! with an `event` name, an `id` and a JSON `data` field.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::{RiskError, StatsSnapshot};

/// Wire name of the stats event
pub const DASHBOARD_STATS_EVENT: &str = "dashboard_stats";

/// Wire name of the heartbeat event
pub const PING_EVENT: &str = "ping";

/// Data carried by a heartbeat
const EMPTY_DATA: &str = "{}";

/// Discriminator of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Aggregate dashboard statistics
    DashboardStats,
    /// Keep-alive heartbeat
    Ping,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DashboardStats => DASHBOARD_STATS_EVENT,
            EventKind::Ping => PING_EVENT,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            DASHBOARD_STATS_EVENT => Ok(EventKind::DashboardStats),
            PING_EVENT => Ok(EventKind::Ping),
            _ => Err(format!("Unknown event kind: {}", s)),
        }
    }
}

/// A single event on a connection's stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Fresh statistics from the scoring service
    Stats(StatsSnapshot),
    /// Content-free keep-alive
    Heartbeat,
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Stats(_) => EventKind::DashboardStats,
            StreamEvent::Heartbeat => EventKind::Ping,
        }
    }

    /// JSON text for the `data` field
    pub fn data(&self) -> &str {
        match self {
            StreamEvent::Stats(snapshot) => snapshot.as_str(),
            StreamEvent::Heartbeat => EMPTY_DATA,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, StreamEvent::Heartbeat)
    }

    pub fn as_stats(&self) -> Option<&StatsSnapshot> {
        match self {
            StreamEvent::Stats(snapshot) => Some(snapshot),
            StreamEvent::Heartbeat => None,
        }
    }
}

/// An event stamped with its position in the session and emission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Per-session sequence number, starting at 1
    pub seq: u64,
    pub emitted_at: DateTime<Utc>,
    pub event: StreamEvent,
}

/// Raw event as read from or written to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    /// The SSE `event` field
    pub kind: String,
    /// The SSE `id` field
    pub id: Option<String>,
    /// The SSE `data` field
    pub data: String,
}

impl WireEvent {
    /// Decode into a stream event
    ///
    /// Unknown event kinds yield `Ok(None)` so newer servers can add kinds
    /// without breaking older consumers.
    pub fn decode(&self) -> Result<Option<StreamEvent>, RiskError> {
        let kind = match self.kind.parse::<EventKind>() {
            Ok(kind) => kind,
            Err(_) => return Ok(None),
        };

        match kind {
            EventKind::DashboardStats => {
                let snapshot = StatsSnapshot::from_json(&self.data).map_err(|e| {
                    RiskError::protocol(format!("Invalid {} payload: {}", kind, e))
                })?;
                Ok(Some(StreamEvent::Stats(snapshot)))
            }
            EventKind::Ping => Ok(Some(StreamEvent::Heartbeat)),
        }
    }
}

impl From<&SessionEvent> for WireEvent {
    fn from(event: &SessionEvent) -> Self {
        Self {
            kind: event.event.kind().as_str().to_string(),
            id: Some(event.seq.to_string()),
            data: event.event.data().to_string(),
        }
    }
}
