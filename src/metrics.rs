//! The `open_port` gauge.
//!
//! One cell per observed (host, port) label pair. Cells are only ever set to
//! 1; a port that later closes keeps its last value until restart.

use crate::types::Target;
use dashmap::DashMap;
use std::fmt::Write;

/// Metric name.
pub const OPEN_PORT: &str = "open_port";
const OPEN_PORT_HELP: &str = "Status of open ports (1 - open)";

/// Label values of one gauge cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GaugeLabels {
    pub host: String,
    pub port: String,
}

impl GaugeLabels {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }
}

impl From<&Target> for GaugeLabels {
    fn from(target: &Target) -> Self {
        Self::new(target.host(), target.port().to_string())
    }
}

/// Gauge vector labelled by `host` and `port`.
#[derive(Debug, Default)]
pub struct OpenPortGauge {
    cells: DashMap<GaugeLabels, f64>,
}

impl OpenPortGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a positive observation for `target`.
    pub fn set_open(&self, target: &Target) {
        self.cells.insert(GaugeLabels::from(target), 1.0);
    }

    /// Current value of a cell, if it was ever set.
    pub fn get(&self, host: &str, port: &str) -> Option<f64> {
        self.cells.get(&GaugeLabels::new(host, port)).map(|v| *v)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Render in the Prometheus text exposition format, sorted by labels.
    pub fn render(&self) -> String {
        let mut cells: Vec<(GaugeLabels, f64)> = self
            .cells
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        let _ = writeln!(out, "# HELP {OPEN_PORT} {OPEN_PORT_HELP}");
        let _ = writeln!(out, "# TYPE {OPEN_PORT} gauge");
        for (labels, value) in cells {
            let _ = writeln!(
                out,
                "{OPEN_PORT}{{host=\"{}\",port=\"{}\"}} {}",
                escape_label(&labels.host),
                escape_label(&labels.port),
                value
            );
        }
        out
    }
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
