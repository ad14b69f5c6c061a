//! Connection lifecycle shared by hub sessions and feed subscriptions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RiskError;

/// Lifecycle of a single streaming connection
///
/// `Closed` is terminal. Reconnecting creates a new connection that starts
/// again at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Request issued, stream not yet established
    Connecting,
    /// Stream established and delivering events
    Open,
    /// Transport error or explicit close
    Closed,
}

impl ConnectionState {
    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Connecting, Open) | (Connecting, Closed) | (Open, Open) | (Open, Closed)
        )
    }

    /// Apply a transition, rejecting anything out of a terminal state
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), RiskError> {
        if !self.can_transition_to(next) {
            return Err(RiskError::internal(format!(
                "Illegal connection transition: {} -> {}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }

    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }

    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
