//! A disk-resident cache: string keys, opaque byte payloads, one expiring file per entry.
//!
//! ```no_run
//! use sharded_file_cache::{CacheStore, DiscreteFileStore, GarbageCollect};
//! use std::time::Duration;
//!
//! let store = DiscreteFileStore::must_new("/var/cache/app");
//! store.set("user:42", b"alice", Duration::from_secs(300))?;
//! assert_eq!(store.get("user:42")?, b"alice");
//!
//! // Expired entries are reclaimed lazily by `get`, or in bulk by a periodic sweep.
//! store.gc()?;
//! # Ok::<(), sharded_file_cache::CacheError>(())
//! ```

pub mod codec;
pub mod error;
pub mod record;
pub mod store;

pub use codec::{BincodeCodec, CodecKind, JsonCodec, RecordCodec};
pub use error::{CacheError, Result};
pub use record::Record;
pub use store::discrete_files::{DiscreteFileStore, StoreConfig, StoreOptions};
pub use store::key_path::{sharded_digest_path, KeyFn};
pub use store::{CacheStore, GarbageCollect};
