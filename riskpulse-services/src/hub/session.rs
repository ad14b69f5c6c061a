//! Per-connection session
//!
//! A session owns one outbound channel and two tasks (stats poll and
//! heartbeat). Both tasks hang off one cancellation token. Dropping the
//! `SessionStream` cancels the token, aborts both tasks and closes the
//! channel in a single step.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures_util::Stream;
use parking_lot::Mutex;
use riskpulse_core::{ConnectionState, SessionEvent, StreamEvent};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::metrics::HubMetrics;
use crate::source::StatsSource;

/// Events buffered per session before new ones are dropped
const SESSION_BUFFER: usize = 32;

/// Unique identifier for a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Write side of a session, shared by its two tasks
///
/// The sequence lock serializes writers so sequence numbers follow channel
/// order, and it is also taken on close so nothing is written once
/// teardown has started.
struct SessionSink {
    id: SessionId,
    tx: mpsc::Sender<SessionEvent>,
    seq: Mutex<u64>,
    token: CancellationToken,
    metrics: Arc<HubMetrics>,
}

impl SessionSink {
    /// Write an event; failures are swallowed and reported as `false`
    fn emit(&self, event: StreamEvent) -> bool {
        let mut seq = self.seq.lock();
        if self.token.is_cancelled() {
            return false;
        }

        let kind = event.kind();
        let stamped = SessionEvent {
            seq: *seq + 1,
            emitted_at: Utc::now(),
            event,
        };

        match self.tx.try_send(stamped) {
            Ok(()) => {
                *seq += 1;
                self.metrics.record_event(kind);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(session = %self.id, %kind, "Session buffer full, dropping event");
                self.metrics.record_dropped();
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session = %self.id, %kind, "Session channel closed, discarding event");
                self.metrics.record_dropped();
                self.token.cancel();
                false
            }
        }
    }

    fn close(&self) {
        let _seq = self.seq.lock();
        self.token.cancel();
    }
}

/// Outbound event stream of one connected client
///
/// Yields events in send order. Ends when the session is torn down.
pub struct SessionStream {
    id: SessionId,
    rx: mpsc::Receiver<SessionEvent>,
    sink: Arc<SessionSink>,
    tasks: Vec<JoinHandle<()>>,
    state: ConnectionState,
    metrics: Arc<HubMetrics>,
}

impl SessionStream {
    /// Start both loops for a new session
    pub(crate) fn spawn(
        id: SessionId,
        source: Arc<dyn StatsSource>,
        poll_interval: Duration,
        heartbeat_interval: Duration,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        let sink = Arc::new(SessionSink {
            id,
            tx,
            seq: Mutex::new(0),
            token: CancellationToken::new(),
            metrics: Arc::clone(&metrics),
        });

        let mut state = ConnectionState::Connecting;
        metrics.session_opened();

        let tasks = vec![
            tokio::spawn(run_poll_loop(Arc::clone(&sink), source, poll_interval)),
            tokio::spawn(run_heartbeat_loop(Arc::clone(&sink), heartbeat_interval)),
        ];

        // Connecting -> Open is always legal
        let _ = state.transition(ConnectionState::Open);
        info!("Stream session opened: {}", id);

        Self {
            id,
            rx,
            sink,
            tasks,
            state,
            metrics,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Tear the session down explicitly
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.state.is_closed() {
            return;
        }

        self.sink.close();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.rx.close();

        let _ = self.state.transition(ConnectionState::Closed);
        self.metrics.session_closed();
        info!("Stream session closed: {}", self.id);
    }
}

impl Stream for SessionStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.state.is_closed() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStream")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

/// Poll the stats source every `period`, first tick immediately
///
/// The fetch is awaited inside the loop, so a slow upstream delays the next
/// tick instead of overlapping it.
async fn run_poll_loop(sink: Arc<SessionSink>, source: Arc<dyn StatsSource>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            _ = sink.token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = sink.token.cancelled() => break,
            result = source.fetch_stats() => result,
        };

        sink.metrics.record_poll(result.as_ref().map(|_| ()));

        match result {
            Ok(snapshot) => {
                if consecutive_failures > 0 {
                    info!(
                        session = %sink.id,
                        "Stats poll recovered after {} failed cycle(s)",
                        consecutive_failures
                    );
                    consecutive_failures = 0;
                }
                sink.emit(StreamEvent::Stats(snapshot));
            }
            Err(e) => {
                consecutive_failures += 1;
                if consecutive_failures == 1 {
                    warn!(session = %sink.id, error = %e, "Stats poll failed, skipping cycle");
                } else {
                    debug!(
                        session = %sink.id,
                        error = %e,
                        "Stats poll failed ({} in a row)",
                        consecutive_failures
                    );
                }
            }
        }
    }

    debug!(session = %sink.id, "Poll loop stopped");
}

/// Emit a heartbeat every `period`, first one after a full period
async fn run_heartbeat_loop(sink: Arc<SessionSink>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sink.token.cancelled() => break,
            _ = ticker.tick() => {
                sink.emit(StreamEvent::Heartbeat);
            }
        }
    }

    debug!(session = %sink.id, "Heartbeat loop stopped");
}
