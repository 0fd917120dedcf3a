//! End-to-end sweeps through the public API.

use async_trait::async_trait;
use portwatch::config::TtlPolicy;
use portwatch::error::{ProbeResult, StoreError, StoreResult};
use portwatch::metrics::OpenPortGauge;
use portwatch::scanner::{BoundedExecutor, CacheGateway, PortStatus, Prober, TcpProber};
use portwatch::storage::{DiskStore, TtlStore};
use portwatch::types::{Port, Target, TargetSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const OPEN_TTL: Duration = Duration::from_secs(15 * 60);
const CLOSED_TTL: Duration = Duration::from_secs(72 * 60 * 60);

/// Counts calls into the real TCP prober.
struct CountingProber {
    inner: TcpProber,
    calls: AtomicUsize,
}

impl CountingProber {
    fn new(timeout: Duration) -> Self {
        Self {
            inner: TcpProber::new(timeout),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for CountingProber {
    async fn probe(&self, target: &Target) -> ProbeResult<PortStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.probe(target).await
    }
}

/// Disk store that records writes and can refuse writes for one key.
struct RecordingStore {
    inner: DiskStore,
    writes: Mutex<Vec<(String, u8, Duration)>>,
    reject: Option<String>,
}

impl RecordingStore {
    fn open(dir: &TempDir, reject: Option<&str>) -> Self {
        Self {
            inner: DiskStore::open(dir.path()).unwrap(),
            writes: Mutex::new(Vec::new()),
            reject: reject.map(str::to_string),
        }
    }

    fn writes(&self) -> Vec<(String, u8, Duration)> {
        self.writes.lock().unwrap().clone()
    }
}

impl TtlStore for RecordingStore {
    fn get(&self, key: &str) -> StoreResult<Option<u8>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: u8, ttl: Duration) -> StoreResult<()> {
        if self.reject.as_deref() == Some(key) {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.set(key, value, ttl)?;
        self.writes.lock().unwrap().push((key.to_string(), value, ttl));
        Ok(())
    }
}

struct Harness {
    executor: BoundedExecutor,
    store: Arc<RecordingStore>,
    gauge: Arc<OpenPortGauge>,
}

fn harness(dir: &TempDir, prober: Arc<dyn Prober>, reject: Option<&str>) -> Harness {
    let store = Arc::new(RecordingStore::open(dir, reject));
    let gateway = Arc::new(CacheGateway::new(
        Arc::clone(&store) as Arc<dyn TtlStore>,
        prober,
        TtlPolicy::new(OPEN_TTL, CLOSED_TTL),
    ));
    let gauge = Arc::new(OpenPortGauge::new());
    Harness {
        executor: BoundedExecutor::new(gateway, Arc::clone(&gauge), 100),
        store,
        gauge,
    }
}

fn single(host: &str, port: u16) -> TargetSet {
    TargetSet::from(vec![Target::new(host, Port::new(port).unwrap())])
}

async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn closed_port_is_cached_with_closed_ttl() {
    let dir = TempDir::new().unwrap();
    let prober = Arc::new(CountingProber::new(Duration::from_millis(50)));
    let h = harness(&dir, prober.clone(), None);
    let port = unused_port().await;
    let targets = single("localhost", port);
    let cancel = CancellationToken::new();
    let key = format!("localhost:{port}");

    let first = h.executor.sweep(&targets, &cancel).await;
    assert_eq!(first.closed, 1);
    assert_eq!(prober.calls(), 1);
    assert_eq!(h.store.writes(), vec![(key.clone(), 0, CLOSED_TTL)]);
    assert_eq!(h.gauge.get("localhost", &port.to_string()), None);

    let second = h.executor.sweep(&targets, &cancel).await;
    assert_eq!(second.closed, 1);
    assert_eq!(second.cached, 1);
    assert_eq!(prober.calls(), 1);
    assert_eq!(h.store.writes().len(), 1);
    assert!(h.gauge.is_empty());
}

#[tokio::test]
async fn open_port_is_cached_with_open_ttl_and_exported() {
    let dir = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let prober = Arc::new(CountingProber::new(Duration::from_secs(2)));
    let h = harness(&dir, prober.clone(), None);
    let targets = single("localhost", port);

    let report = h.executor.sweep(&targets, &CancellationToken::new()).await;

    assert_eq!(report.open, 1);
    assert_eq!(prober.calls(), 1);
    assert_eq!(
        h.store.writes(),
        vec![(format!("localhost:{port}"), 1, OPEN_TTL)]
    );
    assert_eq!(h.gauge.get("localhost", &port.to_string()), Some(1.0));
    assert!(h
        .gauge
        .render()
        .contains(&format!("open_port{{host=\"localhost\",port=\"{port}\"}} 1")));
}

/// Reports every target as open without touching the network.
struct AlwaysOpen;

#[async_trait]
impl Prober for AlwaysOpen {
    async fn probe(&self, _target: &Target) -> ProbeResult<PortStatus> {
        Ok(PortStatus::Open)
    }
}

#[tokio::test]
async fn store_write_failure_is_isolated_to_its_target() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, Arc::new(AlwaysOpen), Some("b:80"));
    let targets = TargetSet::from(vec![
        Target::new("a", Port::new(80).unwrap()),
        Target::new("b", Port::new(80).unwrap()),
        Target::new("c", Port::new(80).unwrap()),
    ]);

    let report = h.executor.sweep(&targets, &CancellationToken::new()).await;

    assert_eq!(report.dispatched, 3);
    assert_eq!(report.open, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(h.gauge.get("a", "80"), Some(1.0));
    assert_eq!(h.gauge.get("b", "80"), None);
    assert_eq!(h.gauge.get("c", "80"), Some(1.0));
    assert_eq!(h.store.get("b:80").unwrap(), None);
    assert_eq!(h.store.get("a:80").unwrap(), Some(1));
    assert_eq!(h.store.get("c:80").unwrap(), Some(1));
}

#[tokio::test]
async fn repeated_sweep_within_ttl_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = unused_port().await;

    let prober = Arc::new(CountingProber::new(Duration::from_millis(200)));
    let h = harness(&dir, prober.clone(), None);
    let targets = TargetSet::from(vec![
        Target::new("127.0.0.1", Port::new(open).unwrap()),
        Target::new("127.0.0.1", Port::new(closed).unwrap()),
    ]);
    let cancel = CancellationToken::new();

    h.executor.sweep(&targets, &cancel).await;
    let writes = h.store.writes();
    let metrics = h.gauge.render();

    let again = h.executor.sweep(&targets, &cancel).await;
    assert_eq!(again.cached, 2);
    assert_eq!(prober.calls(), 2);
    assert_eq!(h.store.writes(), writes);
    assert_eq!(h.gauge.render(), metrics);
}
