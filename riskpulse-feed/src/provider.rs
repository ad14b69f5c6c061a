//! Process-wide distribution context for live dashboard stats
//!
//! One `FeedProvider` owns at most one live subscription to the server
//! stream. Consumers mount by calling [`FeedProvider::subscribe`] and read
//! through the returned [`FeedHandle`]:
//!
//! - the first mounted handle starts the subscription
//! - dropping the last handle, or calling [`FeedProvider::shutdown`], tears
//!   it down and marks the feed disconnected
//! - a handle used after its provider is gone fails with
//!   [`FeedError::OutsideProvider`]
//!
//! When the stream breaks the subscription reconnects on its own with
//! exponential backoff (1s doubling, capped at 30s). Every reconnect is a
//! brand new connection starting at `Connecting`.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use parking_lot::Mutex;
use riskpulse_core::{ConnectionState, StatsSnapshot, StreamEvent, WireEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::source::{EventSource, HttpEventSource};
use crate::{DistributionState, FeedError};

/// Default stream endpoint of a local API server
pub const DEFAULT_STREAM_URL: &str = "http://localhost:3001/api/stream";

/// Reconnect delay base
const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);

/// Reconnect delay ceiling
const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(30);

/// Max consecutive reconnect attempts
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for a feed subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Server stream endpoint
    pub url: String,
    pub auto_reconnect: bool,
    /// Consecutive failed connections tolerated before giving up, 0 for no limit
    pub max_reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load from the environment
    ///
    /// Reads:
    /// - RISKPULSE_STREAM_URL: stream endpoint
    /// - RISKPULSE_MAX_RECONNECTS: consecutive reconnect limit (0 = unlimited)
    pub fn from_env() -> Result<Self, FeedError> {
        let mut config = Self::default();

        if let Ok(url) = env::var("RISKPULSE_STREAM_URL") {
            config.url = url;
        }
        if let Ok(raw) = env::var("RISKPULSE_MAX_RECONNECTS") {
            config.max_reconnect_attempts = raw
                .trim()
                .parse()
                .map_err(|e| FeedError::Config(format!("Invalid RISKPULSE_MAX_RECONNECTS: {}", e)))?;
        }

        Ok(config)
    }
}

/// Counters describing what the subscription has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMetricsSnapshot {
    pub connects: u64,
    pub stats_applied: u64,
    pub heartbeats: u64,
    pub decode_failures: u64,
}

#[derive(Debug, Default)]
struct FeedMetrics {
    connects: AtomicU64,
    stats_applied: AtomicU64,
    heartbeats: AtomicU64,
    decode_failures: AtomicU64,
}

impl FeedMetrics {
    fn snapshot(&self) -> FeedMetricsSnapshot {
        FeedMetricsSnapshot {
            connects: self.connects.load(Ordering::SeqCst),
            stats_applied: self.stats_applied.load(Ordering::SeqCst),
            heartbeats: self.heartbeats.load(Ordering::SeqCst),
            decode_failures: self.decode_failures.load(Ordering::SeqCst),
        }
    }
}

/// The single writer side of the distributed state
///
/// Writes from a subscription pass its token and are dropped once that
/// subscription has been torn down. The check runs under the watch lock,
/// so a teardown that resets `connected` always wins.
struct FeedState {
    state_tx: watch::Sender<DistributionState>,
    last_event_at: Mutex<Option<DateTime<Utc>>>,
    metrics: FeedMetrics,
}

impl FeedState {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(DistributionState::default());
        Self {
            state_tx,
            last_event_at: Mutex::new(None),
            metrics: FeedMetrics::default(),
        }
    }

    fn set_connected(&self, connected: bool, token: Option<&CancellationToken>) {
        self.state_tx.send_if_modified(|state| {
            if token.is_some_and(|t| t.is_cancelled()) || state.connected == connected {
                return false;
            }
            state.connected = connected;
            true
        });
    }

    fn set_stats(&self, stats: Option<StatsSnapshot>) {
        self.state_tx.send_modify(|state| state.stats = stats);
    }

    /// Apply one inbound event; decode failures keep the previous state
    fn apply(&self, wire: &WireEvent, token: &CancellationToken) {
        *self.last_event_at.lock() = Some(Utc::now());

        match wire.decode() {
            Ok(Some(StreamEvent::Stats(snapshot))) => {
                let applied = self.state_tx.send_if_modified(|state| {
                    if token.is_cancelled() {
                        return false;
                    }
                    state.stats = Some(snapshot);
                    true
                });
                if applied {
                    self.metrics.stats_applied.fetch_add(1, Ordering::SeqCst);
                }
            }
            Ok(Some(StreamEvent::Heartbeat)) => {
                self.metrics.heartbeats.fetch_add(1, Ordering::SeqCst);
            }
            Ok(None) => {
                debug!("Ignoring unknown event kind: {}", wire.kind);
            }
            Err(e) => {
                self.metrics.decode_failures.fetch_add(1, Ordering::SeqCst);
                debug!("Dropping undecodable event: {}", e);
            }
        }
    }
}

/// Mount bookkeeping, guarded by one lock
#[derive(Default)]
struct Mount {
    subscribers: usize,
    running: Option<(CancellationToken, JoinHandle<()>)>,
    shut_down: bool,
}

struct Shared {
    source: Arc<dyn EventSource>,
    config: FeedConfig,
    state: Arc<FeedState>,
    mount: Mutex<Mount>,
}

impl Shared {
    fn mount(&self) {
        let mut mount = self.mount.lock();
        mount.subscribers += 1;

        if mount.running.is_none() && !mount.shut_down {
            let token = CancellationToken::new();
            let task = tokio::spawn(run_subscription(
                Arc::clone(&self.source),
                self.config.clone(),
                Arc::clone(&self.state),
                token.clone(),
            ));
            mount.running = Some((token, task));
            debug!("Feed mounted, subscription started");
        }
    }

    fn unmount(&self) {
        let mut mount = self.mount.lock();
        mount.subscribers = mount.subscribers.saturating_sub(1);

        if mount.subscribers == 0 {
            self.teardown(&mut mount);
            debug!("Last feed consumer unmounted");
        }
    }

    fn teardown(&self, mount: &mut Mount) {
        if let Some((token, task)) = mount.running.take() {
            token.cancel();
            task.abort();
        }
        self.state.set_connected(false, None);
    }
}

/// Owner of the single live subscription
pub struct FeedProvider {
    shared: Arc<Shared>,
}

impl FeedProvider {
    pub fn new(source: Arc<dyn EventSource>, config: FeedConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                config,
                state: Arc::new(FeedState::new()),
                mount: Mutex::new(Mount::default()),
            }),
        }
    }

    /// Provider backed by the HTTP event stream at `config.url`
    pub fn http(config: FeedConfig) -> Result<Self, FeedError> {
        let source = HttpEventSource::new(config.url.clone())?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// Mount a consumer; the first one opens the stream
    pub fn subscribe(&self) -> FeedHandle {
        let rx = self.shared.state.state_tx.subscribe();
        self.shared.mount();
        FeedHandle {
            shared: Arc::downgrade(&self.shared),
            rx,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.mount.lock().subscribers
    }

    /// Whether a subscription task is currently running
    pub fn is_mounted(&self) -> bool {
        self.shared.mount.lock().running.is_some()
    }

    pub fn metrics(&self) -> FeedMetricsSnapshot {
        self.shared.state.metrics.snapshot()
    }

    /// Close the stream for good and mark the feed disconnected
    pub fn shutdown(&self) {
        let mut mount = self.shared.mount.lock();
        mount.shut_down = true;
        self.shared.teardown(&mut mount);
        info!("Feed shut down");
    }
}

impl Drop for FeedProvider {
    fn drop(&mut self) {
        let mut mount = self.shared.mount.lock();
        mount.shut_down = true;
        self.shared.teardown(&mut mount);
    }
}

impl std::fmt::Debug for FeedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedProvider")
            .field("config", &self.shared.config)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Read access to the distributed state for one consumer
///
/// Cloning a handle mounts another consumer.
pub struct FeedHandle {
    shared: Weak<Shared>,
    rx: watch::Receiver<DistributionState>,
}

impl FeedHandle {
    fn shared(&self) -> Result<Arc<Shared>, FeedError> {
        self.shared.upgrade().ok_or(FeedError::OutsideProvider)
    }

    /// Current state
    pub fn state(&self) -> Result<DistributionState, FeedError> {
        self.shared()?;
        Ok(self.rx.borrow().clone())
    }

    /// Latest stats, `None` until the first event arrives
    pub fn stats(&self) -> Result<Option<StatsSnapshot>, FeedError> {
        self.shared()?;
        Ok(self.rx.borrow().stats.clone())
    }

    pub fn is_connected(&self) -> Result<bool, FeedError> {
        self.shared()?;
        Ok(self.rx.borrow().connected)
    }

    /// Time of the last event of any kind, for staleness checks
    pub fn last_event_at(&self) -> Result<Option<DateTime<Utc>>, FeedError> {
        let shared = self.shared()?;
        let last = *shared.state.last_event_at.lock();
        Ok(last)
    }

    /// Seed or override the stats, e.g. from a one-time direct fetch
    pub fn set_stats(&self, stats: Option<StatsSnapshot>) -> Result<(), FeedError> {
        self.shared()?.state.set_stats(stats);
        Ok(())
    }

    /// Whether the state changed since this handle last looked
    pub fn has_changed(&self) -> Result<bool, FeedError> {
        self.shared()?;
        self.rx.has_changed().map_err(|_| FeedError::OutsideProvider)
    }

    /// Wait for the next update and return it
    pub async fn changed(&mut self) -> Result<DistributionState, FeedError> {
        self.shared()?;
        self.rx
            .changed()
            .await
            .map_err(|_| FeedError::OutsideProvider)?;
        self.shared()?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

impl Clone for FeedHandle {
    fn clone(&self) -> Self {
        if let Some(shared) = self.shared.upgrade() {
            shared.mount();
        }
        Self {
            shared: self.shared.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.unmount();
        }
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("state", &*self.rx.borrow())
            .finish()
    }
}

/// Backoff before reconnect attempt `attempt` (1-based)
pub(crate) fn reconnect_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    RECONNECT_DELAY_BASE
        .saturating_mul(1u32 << exponent)
        .min(RECONNECT_DELAY_MAX)
}

/// Connection loop with reconnection logic
async fn run_subscription(
    source: Arc<dyn EventSource>,
    config: FeedConfig,
    state: Arc<FeedState>,
    token: CancellationToken,
) {
    let mut reconnect_attempts = 0u32;

    loop {
        let mut connection = ConnectionState::Connecting;

        let connected = tokio::select! {
            _ = token.cancelled() => break,
            result = source.connect() => result,
        };

        match connected {
            Ok(mut stream) => {
                let _ = connection.transition(ConnectionState::Open);
                reconnect_attempts = 0;
                state.metrics.connects.fetch_add(1, Ordering::SeqCst);
                state.set_connected(true, Some(&token));
                info!("[Feed] Connected to {}", config.url);

                loop {
                    let next = tokio::select! {
                        _ = token.cancelled() => None,
                        next = stream.next() => Some(next),
                    };

                    match next {
                        None => break,
                        Some(Some(Ok(wire))) => {
                            let _ = connection.transition(ConnectionState::Open);
                            state.apply(&wire, &token);
                        }
                        Some(Some(Err(e))) => {
                            warn!("[Feed] Stream error: {}", e);
                            break;
                        }
                        Some(None) => {
                            info!("[Feed] Stream ended");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("[Feed] Connection failed: {}", e);
            }
        }

        let _ = connection.transition(ConnectionState::Closed);
        state.set_connected(false, Some(&token));

        if token.is_cancelled() || !config.auto_reconnect {
            break;
        }

        reconnect_attempts += 1;
        if config.max_reconnect_attempts > 0 && reconnect_attempts > config.max_reconnect_attempts
        {
            error!("[Feed] Max reconnect attempts reached");
            break;
        }

        let delay = reconnect_delay(reconnect_attempts);
        info!(
            "[Feed] Reconnecting in {:?} (attempt {})",
            delay, reconnect_attempts
        );

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("[Feed] Subscription stopped");
}
