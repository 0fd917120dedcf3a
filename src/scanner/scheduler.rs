//! Periodic re-scan driver.

use crate::config::ScanSettings;
use crate::metrics::OpenPortGauge;
use crate::scanner::executor::{BoundedExecutor, SweepReport};
use crate::scanner::gateway::CacheGateway;
use crate::scanner::traits::Prober;
use crate::storage::TtlStore;
use crate::types::TargetSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs one sweep immediately and then one per interval until cancelled.
///
/// Sweeps never overlap: ticks that fall due while a sweep is still running
/// are skipped, not queued.
pub struct ScanScheduler {
    executor: BoundedExecutor,
    targets: TargetSet,
    interval: Duration,
}

impl ScanScheduler {
    pub fn new(executor: BoundedExecutor, targets: TargetSet, interval: Duration) -> Self {
        Self {
            executor,
            targets,
            interval,
        }
    }

    /// Wire the gateway and executor from settings.
    pub fn from_settings(
        settings: &ScanSettings,
        store: Arc<dyn TtlStore>,
        prober: Arc<dyn Prober>,
        gauge: Arc<OpenPortGauge>,
    ) -> Self {
        let gateway = Arc::new(CacheGateway::new(store, prober, settings.ttl));
        let executor = BoundedExecutor::new(gateway, gauge, settings.max_connections);
        Self::new(executor, settings.targets.clone(), settings.scan_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drive sweeps until `cancel` fires. Returns the number of sweeps run.
    pub async fn run(&self, cancel: CancellationToken) -> usize {
        let mut sweeps = 0;

        if cancel.is_cancelled() {
            return sweeps;
        }

        // The tick grid starts with the first sweep, so a slow first sweep
        // misses ticks like any other.
        let started = Instant::now();
        let mut ticker = interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.sweep_once(&cancel).await;
        sweeps += 1;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.sweep_once(&cancel).await;
                    sweeps += 1;
                }
            }
        }

        info!(sweeps, "scanner stopped");
        sweeps
    }

    async fn sweep_once(&self, cancel: &CancellationToken) -> SweepReport {
        let report = self.executor.sweep(&self.targets, cancel).await;

        info!(
            targets = self.targets.len(),
            dispatched = report.dispatched,
            open = report.open,
            closed = report.closed,
            cached = report.cached,
            failed = report.failed,
            exhausted = report.exhausted,
            elapsed = ?report.elapsed,
            "sweep complete"
        );
        if report.elapsed > self.interval {
            warn!(
                elapsed = ?report.elapsed,
                interval = ?self.interval,
                "sweep took longer than the scan interval, skipping missed ticks"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtlPolicy;
    use crate::error::{ProbeResult, StoreResult};
    use crate::scanner::traits::PortStatus;
    use crate::types::{Port, Target};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Store whose entries never expire; good enough under paused time.
    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<String, u8>>,
    }

    impl TtlStore for MapStore {
        fn get(&self, key: &str) -> StoreResult<Option<u8>> {
            Ok(self.entries.lock().unwrap().get(key).copied())
        }

        fn set(&self, key: &str, value: u8, _ttl: Duration) -> StoreResult<()> {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Counts probes; the first `slow_calls` probes take `delay`.
    struct SlowProber {
        delay: Duration,
        slow_calls: usize,
        calls: AtomicUsize,
    }

    impl SlowProber {
        fn instant() -> Self {
            Self {
                delay: Duration::ZERO,
                slow_calls: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, _target: &Target) -> ProbeResult<PortStatus> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.slow_calls {
                tokio::time::sleep(self.delay).await;
            }
            Ok(PortStatus::Closed)
        }
    }

    fn scheduler(prober: Arc<SlowProber>, store: Arc<dyn TtlStore>, interval: Duration) -> ScanScheduler {
        let targets = TargetSet::from(vec![
            Target::new("a", Port::new(22).unwrap()),
            Target::new("b", Port::new(22).unwrap()),
        ]);
        let gateway = Arc::new(CacheGateway::new(store, prober, TtlPolicy::new(interval, interval)));
        let executor = BoundedExecutor::new(gateway, Arc::new(OpenPortGauge::new()), 2);
        ScanScheduler::new(executor, targets, interval)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_sweep_then_one_per_interval() {
        let prober = Arc::new(SlowProber::instant());
        let scheduler = Arc::new(scheduler(
            prober.clone(),
            Arc::new(MapStore::default()),
            Duration::from_secs(60),
        ));
        let cancel = CancellationToken::new();

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        // Sweeps at t = 0, 60 and 120.
        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        let sweeps = handle.await.unwrap();

        assert_eq!(sweeps, 3);
        // Entries never expire in this store, so only the first sweep probes.
        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_sweep_skips_ticks() {
        /// Always misses, so every sweep probes.
        struct NoCache;
        impl TtlStore for NoCache {
            fn get(&self, _key: &str) -> StoreResult<Option<u8>> {
                Ok(None)
            }
            fn set(&self, _key: &str, _value: u8, _ttl: Duration) -> StoreResult<()> {
                Ok(())
            }
        }

        // Only the first sweep's two probes are slow.
        let prober = Arc::new(SlowProber {
            delay: Duration::from_secs(35),
            slow_calls: 2,
            calls: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(scheduler(prober.clone(), Arc::new(NoCache), Duration::from_secs(10)));
        let cancel = CancellationToken::new();

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        // The first sweep runs until t = 35 and misses the ticks at 10, 20
        // and 30. Those collapse into one sweep at t = 35.
        tokio::time::sleep(Duration::from_secs(36)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 4);

        // The cadence resumes on the original grid: t = 40, not t = 45.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 6);

        tokio::time::sleep(Duration::from_secs(4)).await;
        cancel.cancel();
        let sweeps = handle.await.unwrap();

        assert_eq!(sweeps, 3);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let prober = Arc::new(SlowProber::instant());
        let scheduler = scheduler(prober.clone(), Arc::new(MapStore::default()), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(scheduler.run(cancel).await, 0);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_interval_from_settings() {
        let targets = TargetSet::from(vec![Target::new("a", Port::new(1).unwrap())]);
        let settings = ScanSettings::new(
            targets,
            10,
            Duration::from_secs(1),
            TtlPolicy::new(Duration::from_secs(900), Duration::from_secs(3600)),
        )
        .unwrap();
        let prober = Arc::new(SlowProber::instant());

        let scheduler = ScanScheduler::from_settings(
            &settings,
            Arc::new(MapStore::default()),
            prober,
            Arc::new(OpenPortGauge::new()),
        );
        assert_eq!(scheduler.interval(), Duration::from_secs(900));
    }
}
