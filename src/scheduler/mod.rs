//! Poll cycle scheduler.
//!
//! Two states: Idle (no cycle armed) and Armed (a recurring timer pending).
//! Arming always cancels the previous timer first, so there is never more
//! than one recurring timer driving cycles. Each cycle snapshots the
//! registry, fans a probe out per entity, and applies every outcome the
//! moment its probe completes. Cycles run as independent tasks: when the
//! interval is shorter than the slowest probe, a later cycle's probes may
//! overlap an earlier cycle's. That is harmless, because outcome application
//! keys by id and is last-write-wins by application time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;

use crate::probe::Prober;
use crate::registry::Registry;

/// Minimum poll interval in seconds.
const MIN_INTERVAL_SECS: u64 = 1;

/// Drives recurring poll cycles against the registry.
pub struct Scheduler<P: Prober> {
    registry: Arc<Registry>,
    prober: P,
    probe_timeout: Duration,
    stop_tx: Mutex<Option<broadcast::Sender<()>>>,
    interval_secs: AtomicU64,
}

impl<P: Prober> Scheduler<P> {
    pub fn new(registry: Arc<Registry>, prober: P, probe_timeout: Duration) -> Self {
        Self {
            registry,
            prober,
            probe_timeout,
            stop_tx: Mutex::new(None),
            interval_secs: AtomicU64::new(0),
        }
    }

    /// Arm the recurring timer. Cancels any existing timer first, runs one
    /// cycle immediately, then fires every `interval_secs`.
    pub async fn start(&self, interval_secs: u64) {
        let interval_secs = interval_secs.max(MIN_INTERVAL_SECS);

        let (tx, mut stop_rx) = broadcast::channel(1);
        {
            let mut guard = self.stop_tx.lock().await;
            if let Some(old) = guard.replace(tx) {
                let _ = old.send(());
            }
        }
        self.interval_secs.store(interval_secs, Ordering::Relaxed);

        tracing::info!("Scheduler: armed with {}s interval", interval_secs);

        let registry = self.registry.clone();
        let prober = self.prober.clone();
        let timeout = self.probe_timeout;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    // First tick completes immediately: the initial cycle
                    // runs as soon as the timer is armed.
                    _ = ticker.tick() => {
                        tokio::spawn(run_cycle(
                            registry.clone(),
                            prober.clone(),
                            timeout,
                        ));
                    }
                }
            }
        });
    }

    /// Change the poll interval: cancel the pending timer and re-arm.
    /// In-flight probes are left to finish on their own.
    pub async fn reconfigure(&self, interval_secs: u64) {
        self.start(interval_secs).await;
    }

    /// Cancel the pending timer. In-flight probes still complete; their
    /// outcomes apply afterwards or no-op if the entity is gone.
    pub async fn stop(&self) {
        let mut guard = self.stop_tx.lock().await;
        if let Some(tx) = guard.take() {
            let _ = tx.send(());
            tracing::info!("Scheduler: stopped");
        }
    }

    /// Current interval in seconds; 0 when never armed.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    pub async fn is_armed(&self) -> bool {
        self.stop_tx.lock().await.is_some()
    }
}

/// One poll cycle: snapshot the registry, probe every entity concurrently,
/// and apply each outcome as soon as its probe completes. Total latency is
/// bounded by the slowest single probe (two attempts), not the sum.
async fn run_cycle<P: Prober>(registry: Arc<Registry>, prober: P, timeout: Duration) {
    let snapshot = registry.probe_snapshot();
    if snapshot.is_empty() {
        return;
    }
    tracing::debug!("poll cycle: probing {} entities", snapshot.len());

    let mut probes = JoinSet::new();
    for (id, address) in snapshot {
        let prober = prober.clone();
        probes.spawn(async move {
            let outcome = prober.probe(&address, timeout).await;
            (id, outcome)
        });
    }

    while let Some(joined) = probes.join_next().await {
        let Ok((id, outcome)) = joined else { continue };
        // Entities removed mid-cycle make this a silent no-op.
        registry.apply_outcome(id, outcome, Utc::now());
    }
}
