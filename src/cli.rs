//! Command-line interface definitions for portwatch.
//!
//! Uses `clap` derive macros for declarative argument parsing. Every flag
//! can also be set through a `PORTWATCH_*` environment variable.

use crate::config::{
    Paths, ScanSettings, TtlPolicy, DEFAULT_CLOSED_TTL, DEFAULT_CONN_TIMEOUT,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_OPEN_TTL,
};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{parse_host_list, PortSpec, TargetSet};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Hosts scanned when neither `--hosts` nor `--list` is given.
pub const DEFAULT_HOSTS: &[&str] = &["localhost"];

/// Periodically probes TCP ports and exports their state to Prometheus.
#[derive(Parser, Debug)]
#[command(name = "portwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A caching TCP port reachability exporter", long_about = None)]
pub struct Cli {
    /// Address to serve /metrics on (":port" listens on all interfaces)
    #[arg(
        long = "web.listen-address",
        env = "PORTWATCH_LISTEN_ADDRESS",
        default_value = ":9116",
        value_name = "ADDR"
    )]
    pub listen_address: String,

    /// Hosts to scan (comma-separated)
    #[arg(long, env = "PORTWATCH_HOSTS", value_delimiter = ',', value_name = "HOSTS")]
    pub hosts: Vec<String>,

    /// File with one host per line, added to --hosts
    #[arg(long, env = "PORTWATCH_LIST", value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Ports to scan (e.g. "22", "80,443", "100-200")
    #[arg(long, env = "PORTWATCH_PORTS", default_value = "22,80,443")]
    pub ports: String,

    /// Maximum number of concurrent connection attempts
    #[arg(long, env = "PORTWATCH_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Connection timeout (e.g. "500ms", "10s")
    #[arg(
        long,
        env = "PORTWATCH_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,

    /// How long a closed result stays cached
    #[arg(
        long,
        env = "PORTWATCH_CACHE_EXPIRES",
        default_value = "72h",
        value_parser = humantime::parse_duration
    )]
    pub cache_expires: Duration,

    /// How long an open result stays cached
    #[arg(
        long,
        env = "PORTWATCH_OPEN_PORT_CACHE_EXPIRES",
        default_value = "15m",
        value_parser = humantime::parse_duration
    )]
    pub open_port_cache_expires: Duration,

    /// Directory of the result cache [default: the user cache directory]
    #[arg(long, env = "PORTWATCH_CACHE_PATH", value_name = "DIR")]
    pub cache_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Hosts from `--hosts` followed by the `--list` file, or the defaults.
    pub fn hosts(&self) -> ConfigResult<Vec<String>> {
        let mut hosts: Vec<String> = self
            .hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(path) = &self.list {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::HostList {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            hosts.extend(parse_host_list(&content));
        } else if hosts.is_empty() {
            hosts.extend(DEFAULT_HOSTS.iter().map(|h| h.to_string()));
        }

        Ok(hosts)
    }

    /// Build validated scan settings.
    pub fn settings(&self) -> ConfigResult<ScanSettings> {
        let ports: PortSpec = self.ports.parse()?;
        let targets = TargetSet::expand(self.hosts()?, &ports)?;
        let ttl = TtlPolicy::new(self.open_port_cache_expires, self.cache_expires);

        ScanSettings::new(targets, self.max_connections, self.timeout, ttl)
    }

    /// Directory of the result cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(Paths::default_cache_dir)
    }
}
