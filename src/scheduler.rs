//! Recurring, single-flight generation scheduler
//!
//! A ticker task fires on a fixed interval. Each tick tries to take the execution slot, a
//! tokio mutex that owns the [`CacheState`]. Taking the slot flips the state to
//! [`SchedulerState::Running`] and the cycle runs on its own task; releasing it flips back to
//! [`SchedulerState::Idle`]. A tick that finds the slot taken is skipped, never queued.
//!
//! Holding the slot guard is the only way to reach the cache, so at most one cycle ever
//! reads or mutates it.

use chrono::Utc;
use futures::Stream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::CacheState;
use crate::clock::SimulationClock;
use crate::cycle::GenerationCycle;

/// Whether a generation cycle is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

impl SchedulerState {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
        }
    }
}

/// Tick counters, readable while the scheduler runs
#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks: AtomicU64,
    runs: AtomicU64,
    skipped: AtomicU64,
    published: AtomicU64,
}

impl SchedulerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Cycles that acquired the slot and ran
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Ticks dropped because a cycle was still in flight
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

struct Shared {
    cycle: GenerationCycle,
    clock: SimulationClock,
    slot: Arc<Mutex<CacheState>>,
    state: watch::Sender<SchedulerState>,
    stats: SchedulerStats,
    dataset_loaded: AtomicBool,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    state: watch::Receiver<SchedulerState>,
    cancel: CancellationToken,
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Spawns the recurring generation task
pub struct CycleScheduler;

impl CycleScheduler {
    /// Start ticking every `interval`. The first tick fires immediately.
    pub fn spawn(
        cycle: GenerationCycle,
        clock: SimulationClock,
        interval: Duration,
    ) -> SchedulerHandle {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let cancel = CancellationToken::new();
        let shared = Arc::new(Shared {
            cycle,
            clock,
            slot: Arc::new(Mutex::new(CacheState::new())),
            state: state_tx,
            stats: SchedulerStats::default(),
            dataset_loaded: AtomicBool::new(false),
        });

        let ticker = tokio::spawn(Self::ticker_task(Arc::clone(&shared), interval, cancel.clone()));

        SchedulerHandle {
            shared,
            state: state_rx,
            cancel,
            ticker: std::sync::Mutex::new(Some(ticker)),
        }
    }

    async fn ticker_task(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
        info!(
            interval_secs = period.as_secs_f64(),
            subject = shared.cycle.subject(),
            session = %shared.cycle.key(),
            "Generation scheduler started"
        );
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Generation scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => Self::on_tick(&shared),
            }
        }

        info!(
            ticks = shared.stats.ticks(),
            runs = shared.stats.runs(),
            skipped = shared.stats.skipped(),
            "Generation scheduler stopped"
        );
    }

    fn on_tick(shared: &Arc<Shared>) {
        shared.stats.ticks.fetch_add(1, Ordering::Relaxed);

        let Ok(mut guard) = Arc::clone(&shared.slot).try_lock_owned() else {
            shared.stats.skipped.fetch_add(1, Ordering::Relaxed);
            warn!("Previous generation cycle still running. Skipping tick");
            return;
        };

        shared.state.send_replace(SchedulerState::Running);
        shared.stats.runs.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(shared);

        tokio::spawn(async move {
            let elapsed = shared.clock.elapsed();
            let outcome = shared.cycle.run(&mut guard, elapsed, Utc::now()).await;
            shared.dataset_loaded.store(!guard.is_empty(), Ordering::Relaxed);
            if outcome.is_published() {
                shared.stats.published.fetch_add(1, Ordering::Relaxed);
            }
            debug!(?outcome, "Generation cycle finished");

            // Idle is published while the slot is still held so a new run can never be
            // overwritten by this one's release.
            shared.state.send_replace(SchedulerState::Idle);
            drop(guard);
        });
    }
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Stream of state transitions, starting with the current state
    pub fn state_updates(&self) -> impl Stream<Item = SchedulerState> + use<> {
        WatchStream::new(self.state.clone())
    }

    /// Whether the ticker is still scheduling cycles
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.ticker_slot().as_ref().is_some_and(|ticker| !ticker.is_finished())
    }

    fn ticker_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the last finished cycle left a dataset in the cache
    pub fn has_dataset(&self) -> bool {
        self.shared.dataset_loaded.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.shared.stats
    }

    pub fn cycle(&self) -> &GenerationCycle {
        &self.shared.cycle
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.shared.clock
    }

    /// Stop scheduling new ticks and wait for an in-flight cycle to finish.
    ///
    /// Calling it again after the first shutdown only waits for the slot.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let ticker = self.ticker_slot().take();
        if let Some(ticker) = ticker {
            if let Err(e) = ticker.await {
                warn!(error = %e, "Scheduler ticker task ended abnormally");
            }
        }
        let _slot = self.shared.slot.lock().await;
        info!("Generation scheduler shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityContext};
    use crate::providers::MemoryProvider;
    use crate::sink::{Sink, SinkError, SinkStatus};
    use crate::test_utils::{lap_table_every_second, monza_key, two_lap_table};
    use futures::StreamExt;

    /// Sink that takes `delay` to answer each publish
    struct SlowSink {
        delay: Duration,
        completed: AtomicU64,
    }

    #[async_trait::async_trait]
    impl Sink for SlowSink {
        async fn publish(&self, _entities: &[Entity]) -> Result<(), SinkError> {
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn probe(&self) -> SinkStatus {
            SinkStatus::Ok
        }
    }

    /// Sink whose broker answers every update with 503
    #[derive(Default)]
    struct RejectingSink {
        attempts: AtomicU64,
    }

    #[async_trait::async_trait]
    impl Sink for RejectingSink {
        async fn publish(&self, _entities: &[Entity]) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Rejected { status: 503, body: "Service Unavailable".into() })
        }

        async fn probe(&self) -> SinkStatus {
            SinkStatus::Error(503)
        }
    }

    fn spawn_with(sink: Arc<dyn Sink>, interval: Duration) -> SchedulerHandle {
        let provider = Arc::new(
            MemoryProvider::new()
                .with_session(monza_key(), two_lap_table("NOR"))
                .with_telemetry(monza_key(), "NOR", 1, lap_table_every_second(90)),
        );
        let cycle =
            GenerationCycle::new(provider, sink, monza_key(), "NOR", EntityContext::new(12345));
        CycleScheduler::spawn(cycle, SimulationClock::start(), interval)
    }

    fn spawn(delay: Duration, interval: Duration) -> (SchedulerHandle, Arc<SlowSink>) {
        let sink = Arc::new(SlowSink { delay, completed: AtomicU64::new(0) });
        (spawn_with(Arc::clone(&sink) as Arc<dyn Sink>, interval), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped() {
        let (handle, sink) = spawn(Duration::from_secs(25), Duration::from_secs(10));

        // Ticks at 0, 10, 20, 30; the run started at 0 holds the slot until 25.
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(handle.stats().ticks(), 4);
        assert_eq!(handle.stats().runs(), 2);
        assert_eq!(handle.stats().skipped(), 2);
        assert_eq!(sink.completed.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), SchedulerState::Running);

        handle.shutdown().await;
        assert_eq!(sink.completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn state_flips_running_then_idle() {
        let (handle, _sink) = spawn(Duration::from_secs(1), Duration::from_secs(10));
        let mut updates = handle.state_updates();

        let mut seen = Vec::new();
        while seen.len() < 3 {
            match updates.next().await {
                Some(state) if seen.last() != Some(&state) => seen.push(state),
                Some(_) => {}
                None => break,
            }
        }
        assert_eq!(seen, vec![SchedulerState::Idle, SchedulerState::Running, SchedulerState::Idle]);
        assert!(handle.has_dataset());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let (handle, _sink) = spawn(Duration::from_millis(10), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.is_running());
        assert_eq!(handle.stats().runs(), 1);

        handle.shutdown().await;
        assert!(!handle.is_running());
        let ticks = handle.stats().ticks();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(handle.stats().ticks(), ticks);
        assert_eq!(handle.stats().runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_publishes_keep_the_schedule() {
        let sink = Arc::new(RejectingSink::default());
        let handle = spawn_with(Arc::clone(&sink) as Arc<dyn Sink>, Duration::from_secs(10));

        // Ticks at 0, 10, 20, 30, each one rejected by the broker.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(handle.stats().ticks(), 4);
        assert_eq!(handle.stats().runs(), 4);
        assert_eq!(handle.stats().skipped(), 0);
        assert_eq!(handle.stats().published(), 0);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);
        assert!(handle.is_running());

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(handle.stats().ticks(), 4);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);
    }
}
