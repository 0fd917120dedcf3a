//! Result cache persistence.
//!
//! The scanner only needs atomic per-key get and set-with-TTL; `TtlStore`
//! is that seam. `DiskStore` is the persistent implementation used by the
//! binary.

mod disk_store;

pub use disk_store::DiskStore;

use crate::error::StoreResult;
use std::time::Duration;

/// A key-value store whose entries expire.
///
/// Implementations must make each `get` and `set` atomic per key; expired
/// entries behave as absent.
pub trait TtlStore: Send + Sync {
    /// Read the value stored under `key`, if present and unexpired.
    fn get(&self, key: &str) -> StoreResult<Option<u8>>;

    /// Store `value` under `key`, replacing any previous entry, valid for `ttl`.
    fn set(&self, key: &str, value: u8, ttl: Duration) -> StoreResult<()>;
}
