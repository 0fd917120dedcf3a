//! Scanner module - probing, caching and the sweep loop.
//!
//! Layered leaf-first:
//! - [`tcp`] - the TCP connect probe
//! - [`gateway`] - consults the result cache and probes on a miss
//! - [`admission`] - the pool of tokens bounding in-flight probes
//! - [`executor`] - one bounded-concurrency sweep over all targets
//! - [`scheduler`] - repeats sweeps at a fixed interval until cancelled

pub mod admission;
pub mod executor;
pub mod gateway;
pub mod scheduler;
pub mod tcp;
pub mod traits;

pub use admission::{AdmissionPool, AdmissionToken};
pub use executor::{BoundedExecutor, SweepReport};
pub use gateway::CacheGateway;
pub use scheduler::ScanScheduler;
pub use tcp::TcpProber;
pub use traits::{PortStatus, Prober, Resolution, ResultSource};
