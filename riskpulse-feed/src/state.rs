//! Distributed dashboard state

use riskpulse_core::StatsSnapshot;

/// Latest value shared with every consumer of a feed
///
/// Replaced atomically on every update; consumers only ever see a complete
/// value. "No stats yet" and "not connected" are ordinary states to render,
/// not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionState {
    /// Most recent stats, absent until the first event or a manual seed
    pub stats: Option<StatsSnapshot>,
    /// Whether the stream is currently open
    pub connected: bool,
}

impl DistributionState {
    pub fn has_stats(&self) -> bool {
        self.stats.is_some()
    }
}
