//! Append-only JSON-lines store with expiring entries.
//!
//! Every `set` appends one record to `entries.jsonl`. On open the log is
//! replayed, superseded and expired records are dropped, and the file is
//! rewritten compacted. The same compaction runs while the store is in use
//! once superseded lines outnumber live entries by a wide margin.

use super::TtlStore;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

const LOG_FILE: &str = "entries.jsonl";

/// Stale lines tolerated in the log before it is rewritten.
const COMPACT_SLACK: usize = 1024;

/// One persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    key: String,
    value: u8,
    expires_at: DateTime<Utc>,
}

impl Record {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

struct Inner {
    entries: HashMap<String, Record>,
    log: File,
    /// Lines currently in the log file.
    log_lines: usize,
}

impl Inner {
    fn needs_compaction(&self) -> bool {
        self.log_lines > 2 * self.entries.len() + COMPACT_SLACK
    }
}

/// Persistent TTL store backed by a directory on disk.
pub struct DiskStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DiskStore {
    /// Open (or create) the store in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        let open_err = |e: std::io::Error| StoreError::Open {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        fs::create_dir_all(dir).map_err(open_err)?;
        let path = dir.join(LOG_FILE);

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(open_err)?;
            replay(&content, Utc::now())
        } else {
            HashMap::new()
        };

        compact(&path, &entries).map_err(open_err)?;
        let log = open_log(&path).map_err(open_err)?;

        debug!(path = %path.display(), entries = entries.len(), "opened cache");

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                log_lines: entries.len(),
                entries,
                log,
            }),
        })
    }

    /// Location of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let inner = self.lock("*")?;
        Ok(inner.entries.values().filter(|r| !r.is_expired(now)).count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Rewrite the log with live entries only and reopen the append handle.
    fn compact_live(&self, inner: &mut Inner) -> std::io::Result<()> {
        let now = Utc::now();
        inner.entries.retain(|_, record| !record.is_expired(now));
        compact(&self.path, &inner.entries)?;
        inner.log = open_log(&self.path)?;
        inner.log_lines = inner.entries.len();
        debug!(path = %self.path.display(), entries = inner.log_lines, "compacted cache");
        Ok(())
    }

    fn lock(&self, key: &str) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Read {
            key: key.to_string(),
            reason: "cache lock poisoned".to_string(),
        })
    }
}

impl TtlStore for DiskStore {
    fn get(&self, key: &str) -> StoreResult<Option<u8>> {
        let mut inner = self.lock(key)?;
        let now = Utc::now();

        match inner.entries.get(key) {
            Some(record) if !record.is_expired(now) => Ok(Some(record.value)),
            Some(_) => {
                inner.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: u8, ttl: Duration) -> StoreResult<()> {
        let write_err = |reason: String| StoreError::Write {
            key: key.to_string(),
            reason,
        };

        let ttl = chrono::Duration::from_std(ttl).map_err(|e| write_err(e.to_string()))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| write_err(format!("expiry out of range for ttl {ttl}")))?;
        let record = Record {
            key: key.to_string(),
            value,
            expires_at,
        };

        let mut line = serde_json::to_string(&record).map_err(|e| write_err(e.to_string()))?;
        line.push('\n');

        let mut guard = self.lock(key)?;
        let inner = &mut *guard;
        inner
            .log
            .write_all(line.as_bytes())
            .map_err(|e| write_err(e.to_string()))?;
        inner.log.flush().map_err(|e| write_err(e.to_string()))?;
        inner.log_lines += 1;
        inner.entries.insert(record.key.clone(), record);

        if inner.needs_compaction() {
            // The record is already durable; a failed rewrite only delays cleanup.
            if let Err(e) = self.compact_live(inner) {
                warn!(path = %self.path.display(), error = %e, "failed to compact cache");
            }
        }

        Ok(())
    }
}

/// Fold log lines into the live entry set. Later records win.
fn replay(content: &str, now: DateTime<Utc>) -> HashMap<String, Record> {
    let mut entries = HashMap::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => {
                entries.insert(record.key.clone(), record);
            }
            Err(e) => {
                // A torn final write after a crash lands here.
                let err = StoreError::Corrupt {
                    line: idx + 1,
                    reason: e.to_string(),
                };
                warn!(error = %err, "skipping cache record");
            }
        }
    }

    entries.retain(|_, record| !record.is_expired(now));
    entries
}

fn open_log(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn compact(path: &Path, entries: &HashMap<String, Record>) -> std::io::Result<()> {
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut file = File::create(&tmp)?;
        for record in entries.values() {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{line}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
