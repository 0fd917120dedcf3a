//! Probe targets and the fixed target set.
//!
//! A target is a (host, port) pair. The set is the cartesian product of the
//! configured hosts and ports, built once at startup.

use super::port::{Port, PortSpec};
use std::fmt;
use std::sync::Arc;

/// A single (host, port) pair to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    host: Arc<str>,
    port: Port,
}

impl Target {
    /// Create a new target.
    pub fn new(host: impl Into<Arc<str>>, port: Port) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address as configured.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> Port {
        self.port
    }

    /// Key under which this target's last result is cached: `host:port`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Error type for target list construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid host '{0}'")]
    InvalidHost(String),
    #[error("no hosts to scan")]
    NoHosts,
}

/// The immutable set of targets probed on every sweep.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    targets: Vec<Target>,
    host_count: usize,
    port_count: usize,
}

impl TargetSet {
    /// Build the set as hosts × ports, host-major.
    ///
    /// Hosts are trimmed and deduplicated, keeping their first position.
    pub fn expand<I, S>(hosts: I, ports: &PortSpec) -> Result<Self, TargetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<Arc<str>> = Vec::new();
        for host in hosts {
            let host = host.as_ref().trim();
            if host.is_empty() {
                continue;
            }
            if host.chars().any(char::is_whitespace) {
                return Err(TargetError::InvalidHost(host.to_string()));
            }
            if !unique.iter().any(|h| h.as_ref() == host) {
                unique.push(Arc::from(host));
            }
        }

        if unique.is_empty() {
            return Err(TargetError::NoHosts);
        }

        let targets = unique
            .iter()
            .flat_map(|host| {
                ports
                    .ports()
                    .iter()
                    .map(move |&port| Target::new(Arc::clone(host), port))
            })
            .collect();

        Ok(Self {
            targets,
            host_count: unique.len(),
            port_count: ports.len(),
        })
    }

    /// Targets in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of distinct hosts.
    pub fn host_count(&self) -> usize {
        self.host_count
    }

    /// Number of distinct ports.
    pub fn port_count(&self) -> usize {
        self.port_count
    }
}

impl From<Vec<Target>> for TargetSet {
    fn from(targets: Vec<Target>) -> Self {
        let mut hosts: Vec<&str> = targets.iter().map(Target::host).collect();
        hosts.sort_unstable();
        hosts.dedup();
        let mut ports: Vec<Port> = targets.iter().map(Target::port).collect();
        ports.sort_unstable();
        ports.dedup();

        Self {
            host_count: hosts.len(),
            port_count: ports.len(),
            targets,
        }
    }
}

/// Parse the contents of a host list file: one host per line.
///
/// Blank lines and `#` comments are skipped.
pub fn parse_host_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
