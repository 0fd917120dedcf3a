//! Error types for portwatch.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{PortError, TargetError};

/// Failure of a single probe attempt.
///
/// Ordinary connection failures are not errors: they classify the target as
/// closed. Only conditions that say nothing about the target end up here.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("prober out of local resources connecting to {addr}: {source}")]
    ResourceExhausted {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the TTL store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open cache at {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("failed to read cache entry '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("failed to write cache entry '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("corrupt cache record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while assembling the scan settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read host list {path}: {reason}")]
    HostList { path: PathBuf, reason: String },

    #[error("could not determine a cache directory")]
    DirectoryNotFound,

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Error of resolving one target: either the cache or the probe failed.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScanError {
    /// True when the prober ran out of local sockets or file descriptors.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::Probe(ProbeError::ResourceExhausted { .. }))
    }
}

/// Result type alias for per-target scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
