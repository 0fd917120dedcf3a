//! Scanner trait abstraction.
//!
//! Defines the probe interface and the result types shared by the cache
//! gateway and the executor.

use crate::error::ProbeResult;
use crate::types::Target;
use async_trait::async_trait;
use std::fmt;

/// Reachability of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStatus {
    /// A TCP connection was established.
    Open,
    /// The connection attempt failed: refused, timed out or unreachable.
    Closed,
}

impl PortStatus {
    /// Encoding used in the result cache: 1 = open, 0 = closed.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Open => 1,
            Self::Closed => 0,
        }
    }

    /// Decode a cached byte. Anything other than 1 reads as closed.
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 1 {
            Self::Open
        } else {
            Self::Closed
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Where a resolved status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Served from an unexpired cache entry.
    Cache,
    /// Freshly probed and written back.
    Probe,
}

/// Outcome of resolving one target through the cache gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub status: PortStatus,
    pub source: ResultSource,
}

impl Resolution {
    pub fn cached(status: PortStatus) -> Self {
        Self {
            status,
            source: ResultSource::Cache,
        }
    }

    pub fn probed(status: PortStatus) -> Self {
        Self {
            status,
            source: ResultSource::Probe,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_cached(&self) -> bool {
        self.source == ResultSource::Cache
    }
}

/// Trait for reachability probes.
///
/// An implementation returns `Ok` with the port's status for every outcome
/// that describes the target, and `Err` only when the prober itself could not
/// make a meaningful attempt.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single target.
    async fn probe(&self, target: &Target) -> ProbeResult<PortStatus>;
}
