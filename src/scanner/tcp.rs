//! TCP connect probe.
//!
//! Establishes a TCP connection and closes it straight away. No data is
//! exchanged. The outcome is one of: open, closed, or a local
//! resource-exhaustion error that says nothing about the target.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{PortStatus, Prober};
use crate::types::Target;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

#[cfg(windows)]
const WSAENOBUFS: i32 = 10055;
#[cfg(windows)]
const WSAEMFILE: i32 = 10024;

/// TCP connect prober with a bounded connect timeout.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    /// Create a new prober.
    ///
    /// # Arguments
    /// * `timeout` - Upper bound on name resolution plus connection setup
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &Target) -> ProbeResult<PortStatus> {
        let addr = (target.host(), target.port().as_u16());

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(PortStatus::Open)
            }
            Ok(Err(e)) if is_resource_exhaustion(&e) => Err(ProbeError::ResourceExhausted {
                addr: target.to_string(),
                source: e,
            }),
            Ok(Err(e)) => {
                trace!(addr = %target, error = %e, "connect failed");
                Ok(PortStatus::Closed)
            }
            Err(_) => {
                trace!(addr = %target, timeout = ?self.timeout, "connect timed out");
                Ok(PortStatus::Closed)
            }
        }
    }
}

/// True when a connect error reflects exhaustion of the prober's own
/// sockets, descriptors or buffers rather than the state of the target.
pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    if let Some(code) = err.raw_os_error() {
        #[cfg(unix)]
        if matches!(code, libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM) {
            return true;
        }
        #[cfg(windows)]
        if matches!(code, WSAEMFILE | WSAENOBUFS) {
            return true;
        }
    }

    err.to_string().to_lowercase().contains("too many open files")
}
