//! Streaming hub for live dashboard statistics
//!
//! Every connected client gets its own isolated session: a channel, a stats
//! poll loop and a heartbeat loop. Sessions share nothing but the hub's
//! counters, so any number of them can run side by side.

mod metrics;
mod session;

pub use metrics::{HubHealth, HubMetrics, HubMetricsSnapshot};
pub use session::{SessionId, SessionStream};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use riskpulse_core::StreamConfig;

use crate::source::StatsSource;

/// Opens streaming sessions against a stats source
pub struct StreamingHub {
    source: Arc<dyn StatsSource>,
    config: StreamConfig,
    metrics: Arc<HubMetrics>,
    next_session_id: AtomicU64,
}

impl StreamingHub {
    pub fn new(source: Arc<dyn StatsSource>, config: StreamConfig) -> Self {
        Self {
            source,
            config,
            metrics: Arc::new(HubMetrics::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Open a session polling the hub's own source
    pub fn open_session(&self) -> SessionStream {
        self.open_session_with(Arc::clone(&self.source))
    }

    /// Open a session polling a specific source
    pub fn open_session_with(&self, source: Arc<dyn StatsSource>) -> SessionStream {
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        SessionStream::spawn(
            id,
            source,
            self.config.poll_interval,
            self.config.heartbeat_interval,
            Arc::clone(&self.metrics),
        )
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    pub fn health(&self) -> HubHealth {
        self.metrics.health()
    }
}

impl std::fmt::Debug for StreamingHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingHub")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use parking_lot::Mutex;
    use riskpulse_core::{ConnectionState, FetchError, SessionEvent, StatsSnapshot};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    fn snapshot(text: &str) -> StatsSnapshot {
        StatsSnapshot::from_json(text).unwrap()
    }

    /// Answers from a script, then repeats `exhausted` forever
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<StatsSnapshot, FetchError>>>,
        exhausted: Result<StatsSnapshot, FetchError>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(
            script: Vec<Result<StatsSnapshot, FetchError>>,
            exhausted: Result<StatsSnapshot, FetchError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                exhausted,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Self::new(vec![], Err(FetchError::network("connection refused")))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsSource for ScriptedSource {
        async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| self.exhausted.clone())
        }
    }

    /// Blocks every fetch until released
    struct GatedSource {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsSource for GatedSource {
        async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(snapshot(r#"{"criticalRisk":1}"#))
        }
    }

    /// Takes `delay` per fetch and tracks overlapping calls
    struct SlowSource {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl StatsSource for SlowSource {
        async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(snapshot(r#"{"slow":true}"#))
        }
    }

    fn hub_with(source: Arc<dyn StatsSource>) -> StreamingHub {
        StreamingHub::new(source, StreamConfig::default())
    }

    /// Collect `count` events with their arrival offset from `start`
    async fn take_events(
        session: &mut SessionStream,
        start: Instant,
        count: usize,
    ) -> Vec<(Duration, SessionEvent)> {
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            let event = session.next().await.expect("session ended early");
            events.push((start.elapsed(), event));
        }
        events
    }

    fn assert_near(actual: Duration, expected_secs: u64) {
        let expected = Duration::from_secs(expected_secs);
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(100),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_polls_pass_payloads_through() {
        let payloads: Vec<String> = (0..5)
            .map(|i| format!(r#"{{"summary":{{"criticalRisk":{},"costSavings":"2.3 Cr"}},"n":1.50}}"#, i))
            .collect();
        let source = ScriptedSource::new(
            payloads.iter().map(|p| Ok(snapshot(p))).collect(),
            Err(FetchError::Timeout(10)),
        );
        let hub = hub_with(source.clone());
        let start = Instant::now();
        let mut session = hub.open_session();

        // Polls at 0, 3, 6, 9, 12 all land before the first heartbeat at 15
        let events = take_events(&mut session, start, 5).await;

        for (i, (at, event)) in events.iter().enumerate() {
            assert_near(*at, 3 * i as u64);
            assert_eq!(event.seq, i as u64 + 1);
            assert_eq!(event.event.as_stats().unwrap().as_str(), payloads[i]);
        }
        assert_eq!(hub.metrics().snapshot().stats_events, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_emits_nothing() {
        let source = ScriptedSource::new(
            vec![
                Ok(snapshot(r#"{"criticalRisk":12,"totalCustomers":1000}"#)),
                Err(FetchError::Timeout(10)),
                Ok(snapshot(r#"{"criticalRisk":15,"totalCustomers":1000}"#)),
            ],
            Err(FetchError::network("connection refused")),
        );
        let hub = hub_with(source.clone());
        let start = Instant::now();
        let mut session = hub.open_session();

        let events = take_events(&mut session, start, 3).await;

        assert_near(events[0].0, 0);
        assert_eq!(
            events[0].1.event.as_stats().unwrap().pointer_i64("/criticalRisk"),
            Some(12)
        );

        assert_near(events[1].0, 6);
        assert_eq!(
            events[1].1.event.as_stats().unwrap().pointer_i64("/criticalRisk"),
            Some(15)
        );

        assert_near(events[2].0, 15);
        assert!(events[2].1.event.is_heartbeat());

        let metrics = hub.metrics().snapshot();
        assert_eq!(metrics.stats_events, 2);
        assert!(metrics.poll_failures >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_continues_through_poll_failures() {
        let source = ScriptedSource::failing();
        let hub = hub_with(source.clone());
        let start = Instant::now();
        let mut session = hub.open_session();

        let events = take_events(&mut session, start, 3).await;

        for (i, (at, event)) in events.iter().enumerate() {
            assert!(event.event.is_heartbeat());
            assert_near(*at, 15 * (i as u64 + 1));
        }
        // Polls at 0, 3, ..., 45
        assert!(source.calls() >= 15, "only {} polls", source.calls());
        assert_eq!(hub.metrics().snapshot().stats_events, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_inflight_fetch_writes_nothing() {
        let source = Arc::new(GatedSource {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let hub = hub_with(source.clone());
        let session = hub.open_session();

        source.started.notified().await;
        session.close();
        source.release.notify_one();

        tokio::time::sleep(Duration::from_secs(60)).await;

        let metrics = hub.metrics().snapshot();
        assert_eq!(metrics.events_emitted(), 0);
        assert_eq!(metrics.active_sessions, 0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_writes_after_drop() {
        let source = ScriptedSource::new(vec![], Ok(snapshot(r#"{"criticalRisk":3}"#)));
        let hub = hub_with(source.clone());
        let start = Instant::now();
        let mut session = hub.open_session();

        let first = take_events(&mut session, start, 1).await;
        assert_eq!(first[0].1.seq, 1);
        assert_eq!(session.state(), ConnectionState::Open);

        drop(session);
        let calls_at_drop = source.calls();

        tokio::time::sleep(Duration::from_secs(60)).await;

        let metrics = hub.metrics().snapshot();
        assert_eq!(metrics.stats_events, 1);
        assert_eq!(metrics.heartbeat_events, 0);
        assert_eq!(metrics.active_sessions, 0);
        assert_eq!(source.calls(), calls_at_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_isolated() {
        let hub = hub_with(ScriptedSource::failing());
        let source_a = ScriptedSource::new(vec![], Ok(snapshot(r#"{"tier":"a"}"#)));
        let source_b = ScriptedSource::new(
            vec![Err(FetchError::status(500, "boom"))],
            Ok(snapshot(r#"{"tier":"b"}"#)),
        );

        let start = Instant::now();
        let mut session_a = hub.open_session_with(source_a.clone());
        let mut session_b = hub.open_session_with(source_b.clone());
        assert_ne!(session_a.id(), session_b.id());

        let (events_a, events_b) = tokio::join!(
            take_events(&mut session_a, start, 3),
            take_events(&mut session_b, start, 3),
        );

        for (_, event) in &events_a {
            assert_eq!(event.event.as_stats().unwrap().as_str(), r#"{"tier":"a"}"#);
        }
        for (_, event) in &events_b {
            assert_eq!(event.event.as_stats().unwrap().as_str(), r#"{"tier":"b"}"#);
        }

        // B lost its first cycle, A did not
        assert_near(events_a[0].0, 0);
        assert_near(events_b[0].0, 3);
        assert_eq!(events_a.iter().map(|(_, e)| e.seq).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(events_b.iter().map(|(_, e)| e.seq).collect::<Vec<_>>(), vec![1, 2, 3]);

        drop(session_a);
        assert_eq!(hub.metrics().snapshot().active_sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_poll_never_delays_heartbeat() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_secs(20),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let hub = hub_with(source.clone());
        let start = Instant::now();
        let mut session = hub.open_session();

        let events = take_events(&mut session, start, 3).await;

        assert_near(events[0].0, 15);
        assert!(events[0].1.event.is_heartbeat());
        assert_near(events[1].0, 20);
        assert!(events[1].1.event.as_stats().is_some());
        assert_near(events[2].0, 30);
        assert!(events[2].1.event.is_heartbeat());

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
