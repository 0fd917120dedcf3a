//! Configuration management for portwatch.
//!
//! Provides the immutable scan settings, cache TTL policy and the
//! XDG-compliant default cache location.

mod settings;

pub use settings::{
    Paths, ScanSettings, TtlPolicy, DEFAULT_CLOSED_TTL, DEFAULT_CONN_TIMEOUT,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_OPEN_TTL,
};
