//! Bounded-concurrency sweep over the target set.
//!
//! Each target is resolved in its own task. At most `capacity` tasks run at
//! once, and a sweep only returns after every dispatched task has finished.

use crate::error::ScanResult;
use crate::metrics::OpenPortGauge;
use crate::scanner::admission::AdmissionPool;
use crate::scanner::gateway::CacheGateway;
use crate::scanner::traits::Resolution;
use crate::types::{Target, TargetSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters for one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Tasks started.
    pub dispatched: usize,
    pub open: usize,
    pub closed: usize,
    /// Results served from the cache (subset of open + closed).
    pub cached: usize,
    /// Store failures and panicked tasks.
    pub failed: usize,
    /// Probes refused for lack of local resources.
    pub exhausted: usize,
    /// Dispatch stopped early because of cancellation.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl SweepReport {
    /// Tasks that have reported back.
    pub fn completed(&self) -> usize {
        self.open + self.closed + self.failed + self.exhausted
    }

    fn record(&mut self, outcome: &ScanResult<Resolution>) {
        match outcome {
            Ok(resolution) => {
                if resolution.is_open() {
                    self.open += 1;
                } else {
                    self.closed += 1;
                }
                if resolution.is_cached() {
                    self.cached += 1;
                }
            }
            Err(e) if e.is_resource_exhaustion() => self.exhausted += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn record_join(&mut self, joined: Result<ScanResult<Resolution>, JoinError>) {
        match joined {
            Ok(outcome) => self.record(&outcome),
            Err(e) => {
                error!(error = %e, "scan task panicked");
                self.failed += 1;
            }
        }
    }
}

/// Runs sweeps with a fixed admission budget.
pub struct BoundedExecutor {
    gateway: Arc<CacheGateway>,
    gauge: Arc<OpenPortGauge>,
    pool: AdmissionPool,
}

impl BoundedExecutor {
    pub fn new(gateway: Arc<CacheGateway>, gauge: Arc<OpenPortGauge>, max_connections: usize) -> Self {
        Self {
            gateway,
            gauge,
            pool: AdmissionPool::new(max_connections),
        }
    }

    /// Size of the admission pool.
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Resolve every target once.
    ///
    /// Dispatch stops when `cancel` fires; tasks already running are awaited.
    pub async fn sweep(&self, targets: &TargetSet, cancel: &CancellationToken) -> SweepReport {
        let started = Instant::now();
        let mut report = SweepReport::default();
        let mut tasks = JoinSet::new();

        for target in targets.iter() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(token) = self.pool.acquire(cancel).await else {
                report.cancelled = true;
                break;
            };

            let gateway = Arc::clone(&self.gateway);
            let gauge = Arc::clone(&self.gauge);
            let target = target.clone();

            tasks.spawn(async move {
                let outcome = gateway.resolve(&target).await;
                observe(&gauge, &target, &outcome);
                token.release();
                outcome
            });
            report.dispatched += 1;

            while let Some(joined) = tasks.try_join_next() {
                report.record_join(joined);
            }
        }

        if report.cancelled {
            debug!(
                dispatched = report.dispatched,
                total = targets.len(),
                "dispatch cancelled, waiting for running probes"
            );
        }

        while let Some(joined) = tasks.join_next().await {
            report.record_join(joined);
        }

        report.elapsed = started.elapsed();
        report
    }
}

/// Log one outcome and feed open results to the gauge.
fn observe(gauge: &OpenPortGauge, target: &Target, outcome: &ScanResult<Resolution>) {
    let host = target.host();
    let port = target.port().as_u16();

    match outcome {
        Ok(resolution) if resolution.is_open() => {
            gauge.set_open(target);
            info!(host, port, cached = resolution.is_cached(), "open port");
        }
        Ok(resolution) => {
            debug!(host, port, cached = resolution.is_cached(), "closed port");
        }
        Err(e) if e.is_resource_exhaustion() => {
            warn!(host, port, error = %e, "prober out of local resources, result not cached");
        }
        Err(e) => {
            error!(host, port, error = %e, "failed to scan");
        }
    }
}
