//! Scan settings and paths.
//!
//! `ScanSettings` is built once at startup and handed to the components that
//! need it. Nothing reads configuration from globals.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::PortStatus;
use crate::types::TargetSet;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Default admission pool size.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;
/// Default connect timeout.
pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(10);
/// Default lifetime of a cached closed result.
pub const DEFAULT_CLOSED_TTL: Duration = Duration::from_secs(72 * 60 * 60);
/// Default lifetime of a cached open result.
pub const DEFAULT_OPEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Application directory paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Cache directory (~/.cache/portwatch)
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Resolve the XDG cache directory for portwatch.
    pub fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "portwatch", "portwatch").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            cache_dir: project.cache_dir().to_path_buf(),
        })
    }

    /// Default location of the result cache, falling back to `.cache`.
    pub fn default_cache_dir() -> PathBuf {
        Self::new()
            .map(|paths| paths.cache_dir)
            .unwrap_or_else(|_| PathBuf::from(".cache"))
    }
}

/// How long a probe result stays fresh, by outcome.
///
/// Open ports are assumed to be more volatile than closed ones and are
/// re-checked far sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub open: Duration,
    pub closed: Duration,
}

impl TtlPolicy {
    pub fn new(open: Duration, closed: Duration) -> Self {
        Self { open, closed }
    }

    /// TTL to attach to a freshly probed result.
    pub fn ttl_for(&self, status: PortStatus) -> Duration {
        match status {
            PortStatus::Open => self.open,
            PortStatus::Closed => self.closed,
        }
    }

    /// Sweep interval: the shorter of the two TTLs, so every entry kind is
    /// refreshed at least as often as it expires.
    pub fn scan_interval(&self) -> Duration {
        self.open.min(self.closed)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_TTL, DEFAULT_CLOSED_TTL)
    }
}

/// Immutable settings consumed by the scanner components.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Targets probed on every sweep.
    pub targets: TargetSet,
    /// Maximum number of in-flight probes.
    pub max_connections: usize,
    /// Connect timeout per probe.
    pub conn_timeout: Duration,
    /// Cache lifetimes.
    pub ttl: TtlPolicy,
}

impl ScanSettings {
    /// Validate and assemble settings.
    pub fn new(
        targets: TargetSet,
        max_connections: usize,
        conn_timeout: Duration,
        ttl: TtlPolicy,
    ) -> ConfigResult<Self> {
        if targets.is_empty() {
            return Err(ConfigError::Invalid("target set is empty".to_string()));
        }
        if max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max connections must be at least 1".to_string(),
            ));
        }
        if conn_timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be non-zero".to_string()));
        }
        if ttl.open.is_zero() || ttl.closed.is_zero() {
            return Err(ConfigError::Invalid(
                "cache expiry durations must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            targets,
            max_connections,
            conn_timeout,
            ttl,
        })
    }

    /// Interval between sweeps.
    pub fn scan_interval(&self) -> Duration {
        self.ttl.scan_interval()
    }
}
