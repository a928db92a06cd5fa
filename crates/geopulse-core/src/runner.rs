//! Async drivers for the lifecycle engine.
//!
//! Two loops cooperate through an `mpsc` channel:
//!
//! - [`IngestionLoop::run`] owns the poll timer, the [`PollGate`] and the
//!   outstanding fetches. Every outcome (a batch, a failure, a skipped
//!   tick) becomes a [`LifecycleCommand`].
//! - [`run_lifecycle`] owns the [`LifecycleService`]. It alternates between
//!   render ticks (fade pass, frame to the sink) and commands (ingest or
//!   count, then an aggregate report to the sink). Skipped ticks report
//!   too, so the windows keep ageing while a slow poll is outstanding. Each step runs to
//!   completion before the next one starts.
//!
//! Neither loop is cancelled. The lifecycle loop returns once every command
//! sender is gone; the ingestion loop returns once the receiver is gone.

use std::sync::Arc;
use std::time::Duration;

use geopulse_types::{AggregateReport, LifecycleStats, RawRecord, SceneFrame};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::ingest::{
    GateDecision, NormalizedBatch, OverlapPolicy, PollError, PollGate, PollSource, normalize_batch,
};
use crate::lifecycle::LifecycleService;

/// A message from the ingestion loop to the lifecycle task.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleCommand {
    /// A poll succeeded and its records were normalized.
    Ingested(NormalizedBatch),
    /// A poll failed.
    PollFailed(PollError),
    /// A timer tick was skipped because a poll was still in flight.
    PollSkipped,
}

/// Receiver of everything the lifecycle task produces.
///
/// Implementations can use this to update a dashboard snapshot, drive a
/// renderer, broadcast to clients, etc.
pub trait FrameSink: Send {
    /// Called after every render tick with the full scene.
    fn on_frame(&mut self, frame: &SceneFrame);

    /// Called after every poll outcome, skipped ticks included, with fresh
    /// aggregates.
    fn on_report(&mut self, report: &AggregateReport, stats: &LifecycleStats);
}

// ---------------------------------------------------------------------------
// Lifecycle task
// ---------------------------------------------------------------------------

/// Drive the lifecycle service until every command sender is dropped.
///
/// Returns the final counters.
pub async fn run_lifecycle(
    mut service: LifecycleService,
    mut commands: mpsc::Receiver<LifecycleCommand>,
    clock: Arc<dyn Clock>,
    render_interval: Duration,
    sink: &mut dyn FrameSink,
) -> LifecycleStats {
    let mut ticker = tokio::time::interval(render_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        render_interval = ?render_interval,
        "Lifecycle loop starting"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = service.fade_pass(clock.now());
                sink.on_frame(&frame);
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                match command {
                    LifecycleCommand::Ingested(batch) => {
                        service.ingest(batch);
                    }
                    LifecycleCommand::PollFailed(error) => service.record_poll_failure(&error),
                    LifecycleCommand::PollSkipped => service.record_skipped(),
                }
                let report = service.report(clock.now());
                sink.on_report(&report, &service.stats());
            }
        }
    }

    let stats = service.stats();
    info!(
        polls_succeeded = stats.polls_succeeded,
        polls_failed = stats.polls_failed,
        events_ingested = stats.events_ingested,
        live_events = stats.live_events,
        "Lifecycle loop stopped, command channel closed"
    );
    stats
}

// ---------------------------------------------------------------------------
// Ingestion task
// ---------------------------------------------------------------------------

/// Periodic poller feeding the lifecycle task.
pub struct IngestionLoop<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    gate: PollGate,
    interval: Duration,
}

impl<S: PollSource> IngestionLoop<S> {
    /// Create a poller that fires every `interval`.
    pub const fn new(
        source: Arc<S>,
        clock: Arc<dyn Clock>,
        policy: OverlapPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            gate: PollGate::new(policy),
            interval,
        }
    }

    /// Poll until the lifecycle task stops listening.
    ///
    /// The first poll is dispatched immediately. Outstanding fetches are
    /// aborted on return.
    pub async fn run(mut self, commands: mpsc::Sender<LifecycleCommand>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut fetches: JoinSet<Result<Vec<RawRecord>, PollError>> = JoinSet::new();

        info!(
            poll_interval = ?self.interval,
            "Ingestion loop starting"
        );

        loop {
            let command = tokio::select! {
                () = commands.closed() => break,
                _ = ticker.tick() => match self.gate.on_timer() {
                    GateDecision::Dispatch => {
                        let source = Arc::clone(&self.source);
                        fetches.spawn(async move { source.fetch().await });
                        debug!(in_flight = self.gate.in_flight(), "Poll dispatched");
                        continue;
                    }
                    GateDecision::Skip => LifecycleCommand::PollSkipped,
                },
                Some(joined) = fetches.join_next() => {
                    self.gate.on_complete();
                    match joined {
                        Ok(Ok(records)) => {
                            LifecycleCommand::Ingested(normalize_batch(records, self.clock.now()))
                        }
                        Ok(Err(error)) => LifecycleCommand::PollFailed(error),
                        Err(join_error) => LifecycleCommand::PollFailed(PollError::Transport(
                            format!("fetch task failed: {join_error}"),
                        )),
                    }
                }
            };

            if commands.send(command).await.is_err() {
                break;
            }
        }

        info!(
            in_flight = self.gate.in_flight(),
            "Ingestion loop stopped, lifecycle task gone"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geopulse_types::Timestamp;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GeoPulseConfig;

    /// Source that takes `delay` to answer and tracks concurrency.
    struct SlowSource {
        delay: Duration,
        fail: bool,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowSource {
        fn new(delay_ms: u64, fail: bool) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                fail,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl PollSource for SlowSource {
        async fn fetch(&self) -> Result<Vec<RawRecord>, PollError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            self.peak.fetch_max(now_active, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(PollError::Transport("connection refused".to_owned()));
            }
            Ok(vec![RawRecord {
                latitude: 10.0,
                longitude: 20.0,
                country: "A".to_owned(),
                suspicious: true,
            }])
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<SceneFrame>,
        reports: Vec<(AggregateReport, LifecycleStats)>,
    }

    impl FrameSink for RecordingSink {
        fn on_frame(&mut self, frame: &SceneFrame) {
            self.frames.push(frame.clone());
        }

        fn on_report(&mut self, report: &AggregateReport, stats: &LifecycleStats) {
            self.reports.push((report.clone(), *stats));
        }
    }

    fn manual_clock(start_ms: u64) -> (Arc<ManualClock>, Arc<dyn Clock>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(start_ms)));
        let shared: Arc<dyn Clock> = Arc::<ManualClock>::clone(&clock);
        (clock, shared)
    }

    async fn first_commands(
        source: Arc<SlowSource>,
        policy: OverlapPolicy,
        count: usize,
    ) -> Vec<LifecycleCommand> {
        let (_, clock) = manual_clock(0);
        let (tx, mut rx) = mpsc::channel(16);
        let ingestion = IngestionLoop::new(source, clock, policy, Duration::from_millis(1_000));
        let handle = tokio::spawn(ingestion.run(tx));

        let mut received = Vec::new();
        while received.len() < count {
            received.push(rx.recv().await.unwrap());
        }
        drop(rx);
        handle.await.unwrap();
        received
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_never_overlaps() {
        let source = Arc::new(SlowSource::new(2_500, false));
        let commands = first_commands(Arc::clone(&source), OverlapPolicy::Skip, 4).await;

        assert!(matches!(commands.first(), Some(LifecycleCommand::PollSkipped)));
        assert!(matches!(commands.get(1), Some(LifecycleCommand::PollSkipped)));
        assert!(matches!(commands.get(2), Some(LifecycleCommand::Ingested(_))));
        assert!(matches!(commands.get(3), Some(LifecycleCommand::PollSkipped)));
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn allow_policy_overlaps_requests() {
        let source = Arc::new(SlowSource::new(2_500, false));
        let commands = first_commands(Arc::clone(&source), OverlapPolicy::Allow, 2).await;

        assert!(
            commands
                .iter()
                .all(|c| matches!(c, LifecycleCommand::Ingested(_)))
        );
        assert!(source.peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_becomes_poll_failed() {
        let source = Arc::new(SlowSource::new(10, true));
        let commands = first_commands(source, OverlapPolicy::Skip, 2).await;
        assert!(
            commands
                .iter()
                .all(|c| matches!(c, LifecycleCommand::PollFailed(PollError::Transport(_))))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ingested_batch_is_stamped_with_engine_clock() {
        let source = Arc::new(SlowSource::new(10, false));
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(77_000)));
        let (tx, mut rx) = mpsc::channel(4);
        let ingestion = IngestionLoop::new(
            source,
            clock,
            OverlapPolicy::Skip,
            Duration::from_millis(1_000),
        );
        let handle = tokio::spawn(ingestion.run(tx));

        let batch = match rx.recv().await {
            Some(LifecycleCommand::Ingested(batch)) => Some(batch),
            _ => None,
        }
        .unwrap();
        drop(rx);
        handle.await.unwrap();

        let event = batch.events.first().unwrap();
        assert_eq!(event.created_at, Timestamp::from_millis(77_000));
        assert!(event.flagged);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_counts_commands_and_returns_on_close() {
        let (_, clock) = manual_clock(1_000);
        let service = LifecycleService::from_config(&GeoPulseConfig::default());
        let (tx, rx) = mpsc::channel(8);

        let records = vec![
            RawRecord {
                latitude: 1.0,
                longitude: 1.0,
                country: "A".to_owned(),
                suspicious: true,
            },
            RawRecord {
                latitude: 2.0,
                longitude: 2.0,
                country: "B".to_owned(),
                suspicious: false,
            },
        ];
        tx.send(LifecycleCommand::Ingested(normalize_batch(
            records,
            Timestamp::from_millis(1_000),
        )))
        .await
        .unwrap();
        tx.send(LifecycleCommand::PollFailed(PollError::Malformed("x".to_owned())))
            .await
            .unwrap();
        tx.send(LifecycleCommand::PollSkipped).await.unwrap();
        drop(tx);

        let mut sink = RecordingSink::default();
        let stats = run_lifecycle(service, rx, clock, Duration::from_millis(16), &mut sink).await;

        assert_eq!(stats.events_ingested, 2);
        assert_eq!(stats.polls_succeeded, 1);
        assert_eq!(stats.polls_failed, 1);
        assert_eq!(stats.polls_skipped, 1);
        assert_eq!(stats.live_events, 2);
        assert_eq!(stats.live_beams, 1);
        assert_eq!(sink.reports.len(), 3);
        let (report, _) = sink.reports.first().unwrap();
        assert_eq!(report.top_categories.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_ticks_keep_aggregates_ageing() {
        let (clock, shared) = manual_clock(1_000);
        let service = LifecycleService::from_config(&GeoPulseConfig::default());
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            let mut sink = RecordingSink::default();
            let stats = run_lifecycle(service, rx, shared, Duration::from_secs(60), &mut sink).await;
            (stats, sink)
        });

        let record = RawRecord {
            latitude: 5.0,
            longitude: 5.0,
            country: "A".to_owned(),
            suspicious: false,
        };
        tx.send(LifecycleCommand::Ingested(normalize_batch(
            vec![record],
            Timestamp::from_millis(1_000),
        )))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A poll hangs; every later tick is skipped.
        for _ in 0..3 {
            clock.advance(6_000);
            tx.send(LifecycleCommand::PollSkipped).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        drop(tx);

        let (stats, sink) = handle.await.unwrap();
        assert_eq!(stats.polls_skipped, 3);
        assert_eq!(sink.reports.len(), 4);

        let (first, _) = sink.reports.first().unwrap();
        assert_eq!(first.top_categories.len(), 1);
        assert_eq!(first.rate.len(), 1);

        // 6 s later the record is still inside the 10 s category window.
        let (second, _) = sink.reports.get(1).unwrap();
        assert_eq!(second.top_categories.len(), 1);

        // 12 s later it has left the category window but not the 15 s rate window.
        let (third, _) = sink.reports.get(2).unwrap();
        assert!(third.top_categories.is_empty());
        assert_eq!(third.rate.len(), 1);

        // 18 s later both windows have dropped it.
        let (last, stats_at_last) = sink.reports.last().unwrap();
        assert_eq!(last.at, Timestamp::from_millis(19_000));
        assert!(last.top_categories.is_empty());
        assert!(last.rate.is_empty());
        assert_eq!(stats_at_last.polls_skipped, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn render_ticks_fade_and_evict() {
        let (clock, shared) = manual_clock(0);
        let service = LifecycleService::from_config(&GeoPulseConfig::default());
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            let mut sink = RecordingSink::default();
            let stats = run_lifecycle(service, rx, shared, Duration::from_millis(16), &mut sink).await;
            (stats, sink)
        });

        let record = RawRecord {
            latitude: 0.0,
            longitude: 0.0,
            country: "A".to_owned(),
            suspicious: false,
        };
        tx.send(LifecycleCommand::Ingested(normalize_batch(
            vec![record],
            Timestamp::EPOCH,
        )))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        clock.advance(5_000);
        tokio::time::sleep(Duration::from_millis(100)).await;
        clock.advance(5_000);
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(tx);

        let (stats, sink) = handle.await.unwrap();
        assert_eq!(stats.events_evicted, 1);
        assert_eq!(stats.live_events, 0);

        let half_faded = sink
            .frames
            .iter()
            .find(|f| f.at == Timestamp::from_millis(5_000) && !f.points.is_empty())
            .unwrap();
        let point = half_faded.points.first().unwrap();
        assert!((point.liveness - 0.5).abs() < 1e-9);
        assert!(sink.frames.last().unwrap().points.is_empty());
    }
}
