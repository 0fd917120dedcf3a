//! # portwatch - A caching TCP port reachability exporter
//!
//! portwatch periodically probes a fixed set of (host, port) pairs with plain
//! TCP connects, caches every outcome with an outcome-dependent expiry, and
//! exposes open ports as a Prometheus gauge.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portwatch::config::TtlPolicy;
//! use portwatch::metrics::OpenPortGauge;
//! use portwatch::scanner::{BoundedExecutor, CacheGateway, TcpProber};
//! use portwatch::storage::DiskStore;
//! use portwatch::types::{PortSpec, TargetSet};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ports: PortSpec = "22,80,443".parse().unwrap();
//!     let targets = TargetSet::expand(["localhost"], &ports).unwrap();
//!
//!     let store = Arc::new(DiskStore::open(".cache").unwrap());
//!     let prober = Arc::new(TcpProber::new(Duration::from_secs(3)));
//!     let gateway = Arc::new(CacheGateway::new(store, prober, TtlPolicy::default()));
//!     let gauge = Arc::new(OpenPortGauge::new());
//!
//!     let executor = BoundedExecutor::new(gateway, gauge.clone(), 100);
//!     let report = executor.sweep(&targets, &CancellationToken::new()).await;
//!
//!     println!("{} open, {} closed", report.open, report.closed);
//!     print!("{}", gauge.render());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, targets and the fixed target set
//! - [`scanner`] - Probe, cache gateway, bounded executor and scheduler
//! - [`storage`] - The persistent TTL store
//! - [`metrics`] - The `open_port` gauge
//! - [`server`] - The `/metrics` HTTP endpoint
//! - [`config`] - Immutable scan settings
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, ProbeError, ScanError, StoreError};
pub use scanner::{PortStatus, Prober, ScanScheduler};
pub use types::{Port, PortSpec, Target, TargetSet};
