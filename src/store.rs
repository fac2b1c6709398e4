pub mod discrete_files;
pub mod key_path;

use crate::error::Result;
use std::time::Duration;

/// The operations every cache backend offers, keyed by string with opaque byte payloads.
///
/// Methods take `&self`: backends whose state lives outside the process (files, sockets)
/// can be shared between threads without a wrapper lock.
pub trait CacheStore {
    /// Stores `data` under `key`, replacing any previous value. The entry stops being served
    /// once `ttl` has elapsed.
    fn set(&self, key: &str, data: &[u8], ttl: Duration) -> Result<()>;

    /// Returns the live payload for `key`. Both an absent and an expired entry report an
    /// error for which [`CacheError::is_miss`](crate::CacheError::is_miss) is true.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes `key`. Removing a key that was never set succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Removes every entry.
    fn flush(&self) -> Result<()>;

    /// A cheap existence check. Backends may answer true for an entry that has expired but
    /// not yet been reclaimed.
    fn has(&self, key: &str) -> bool;
}

/// Backends that keep expired entries around until they are swept.
pub trait GarbageCollect {
    /// Reclaims every expired entry. Meant to be called periodically by the owner.
    fn gc(&self) -> Result<()>;
}
