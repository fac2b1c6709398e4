use crate::codec::{BincodeCodec, CodecKind, RecordCodec};
use crate::error::{CacheError, Result};
use crate::record::Record;
use crate::store::key_path::{default_key_fn, KeyFn};
use crate::store::{CacheStore, GarbageCollect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o666;
#[cfg(unix)]
const DEFAULT_DIR_MODE: u32 = 0o755;

/// A cache that keeps every entry in its own file under a base directory.
///
/// Keys never touch the filesystem directly: the key function maps each one to a relative
/// path (by default a three-level digest shard, see
/// [`sharded_digest_path`](crate::store::key_path::sharded_digest_path)), and the codec turns
/// the expiration-stamped payload into the file's contents.
///
/// There is no in-memory index and no locking. Every operation is a short sequence of
/// filesystem calls on one file, so concurrent writers to the same key race at the
/// filesystem level. Files survive restarts unless the store is opened with
/// [`StoreOptions::clear_on_open`].
///
/// [`has`](CacheStore::has) only checks that the file exists. It does not decode it, so it
/// answers true for an expired entry until [`get`](CacheStore::get) or
/// [`gc`](GarbageCollect::gc) reclaims the file.
pub struct DiscreteFileStore<Codec = BincodeCodec>
where
    Codec: RecordCodec,
{
    base_dir: PathBuf,
    key_fn: KeyFn,
    codec: Codec,
}

/// Construction options for a [`DiscreteFileStore`].
pub struct StoreOptions<Codec = BincodeCodec> {
    base_dir: PathBuf,
    key_fn: KeyFn,
    codec: Codec,
    clear_on_open: bool,
}

impl StoreOptions<BincodeCodec> {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            key_fn: default_key_fn(),
            codec: BincodeCodec,
            clear_on_open: false,
        }
    }
}

impl<Codec> StoreOptions<Codec> {
    /// Replaces the key to path mapping. The function must be deterministic and return a
    /// non-empty relative path without `..` components; operations on a key that maps to
    /// anything else fail with [`CacheError::Configuration`].
    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&str) -> PathBuf + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    pub fn codec<Other: RecordCodec>(self, codec: Other) -> StoreOptions<Other> {
        StoreOptions {
            base_dir: self.base_dir,
            key_fn: self.key_fn,
            codec,
            clear_on_open: self.clear_on_open,
        }
    }

    /// Wipe whatever a previous process left in the base directory when opening. Use this
    /// when the cache must never outlive the process (e.g. to avoid schema drift across
    /// upgrades).
    pub fn clear_on_open(mut self, clear: bool) -> Self {
        self.clear_on_open = clear;
        self
    }
}

/// Serialized form of the store's configuration.
///
/// ```json
/// { "base_dir": "/var/cache/app", "codec": "json", "clear_on_open": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub codec: CodecKind,
    #[serde(default)]
    pub clear_on_open: bool,
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::configuration(format!("unreadable store config: {e}")))
    }
}

impl DiscreteFileStore<BincodeCodec> {
    /// Opens a store with the default key mapping and codec.
    ///
    /// # Panics
    ///
    /// Panics if the base directory is blank or cannot be created. Meant for process startup,
    /// where a cache without a directory is not worth running with.
    pub fn must_new(base_dir: impl Into<PathBuf>) -> Self {
        match Self::open(StoreOptions::new(base_dir)) {
            Ok(store) => store,
            Err(err) => panic!("base directory could not be created: {err}"),
        }
    }
}

impl DiscreteFileStore<Box<dyn RecordCodec + Send + Sync>> {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::open(
            StoreOptions::new(config.base_dir.clone())
                .codec(config.codec.build())
                .clear_on_open(config.clear_on_open),
        )
    }
}

impl<Codec> DiscreteFileStore<Codec>
where
    Codec: RecordCodec,
{
    /// Validates the options and creates the base directory if it is missing.
    pub fn open(options: StoreOptions<Codec>) -> Result<Self> {
        if options.base_dir.to_string_lossy().trim().is_empty() {
            return Err(CacheError::configuration("base directory not provided"));
        }

        if options.clear_on_open {
            remove_entry(&options.base_dir)?;
        }
        create_dir_all(&options.base_dir)?;

        debug!(base_dir = %options.base_dir.display(), "opened discrete file store");

        Ok(Self {
            base_dir: options.base_dir,
            key_fn: options.key_fn,
            codec: options.codec,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the entry for `key` lives, whether or not it exists.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join((self.key_fn)(key))
    }

    /// Like [`path_for`](Self::path_for), but refuses mappings that would land on the base
    /// directory itself or outside of it.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let relative = (self.key_fn)(key);
        let contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
            && relative.file_name().is_some();

        if !contained {
            return Err(CacheError::configuration(format!(
                "key {key:?} maps to {relative:?}, which is not a file below the base directory"
            )));
        }

        Ok(self.base_dir.join(relative))
    }

    fn sweep(&self, dir: &Path, stats: &mut SweepStats) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // A shard directory removed by a concurrent delete or flush.
            Err(err) if err.kind() == io::ErrorKind::NotFound && dir != self.base_dir => {
                return Ok(())
            }
            Err(err) => return Err(CacheError::io(dir, err)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| CacheError::io(&path, e))?;

            if file_type.is_dir() {
                self.sweep(&path, stats)?;
                continue;
            }
            // Sockets and FIFOs are never written by the store, and reading a FIFO blocks.
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }

            stats.scanned += 1;

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(CacheError::io(&path, err)),
            };

            let record = match self.codec.decode(&bytes) {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "gc aborted on undecodable file");
                    return Err(err);
                }
            };

            if record.is_expired() {
                match fs::remove_file(&path) {
                    Ok(()) => stats.reclaimed += 1,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(CacheError::io(&path, err)),
                }
            }
        }

        Ok(())
    }
}

impl<Codec> CacheStore for DiscreteFileStore<Codec>
where
    Codec: RecordCodec,
{
    fn set(&self, key: &str, data: &[u8], ttl: Duration) -> Result<()> {
        let path = self.entry_path(key)?;
        let bytes = self
            .codec
            .encode(&Record::expiring_in(data.to_vec(), ttl))?;

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        write_file(&path, &bytes)?;

        debug!(key, path = %path.display(), "stored entry");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(key)?;
        let bytes = fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
        let record = self.codec.decode(&bytes)?;

        if record.is_expired() {
            debug!(key, path = %path.display(), "reclaiming expired entry");
            if let Err(err) = remove_entry(&path) {
                warn!(key, error = %err, "could not remove expired entry");
            }
            return Err(CacheError::CacheMiss);
        }

        Ok(record.data)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        remove_entry(&path)?;

        debug!(key, path = %path.display(), "deleted entry");
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        remove_entry(&self.base_dir)?;
        create_dir_all(&self.base_dir)?;

        debug!(base_dir = %self.base_dir.display(), "flushed store");
        Ok(())
    }

    fn has(&self, key: &str) -> bool {
        self.entry_path(key)
            .map(|path| File::open(path).is_ok())
            .unwrap_or(false)
    }
}

impl<Codec> GarbageCollect for DiscreteFileStore<Codec>
where
    Codec: RecordCodec,
{
    /// Walks the whole base directory, decoding every file and removing the expired ones.
    ///
    /// The first file that cannot be read or decoded stops the sweep and its error is
    /// returned; files already reclaimed before that point stay reclaimed. Files that vanish
    /// mid-sweep are skipped.
    fn gc(&self) -> Result<()> {
        let mut stats = SweepStats::default();
        self.sweep(&self.base_dir, &mut stats)?;

        info!(
            base_dir = %self.base_dir.display(),
            scanned = stats.scanned,
            reclaimed = stats.reclaimed,
            "gc sweep finished"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SweepStats {
    scanned: usize,
    reclaimed: usize,
}

fn create_dir_all(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DEFAULT_DIR_MODE);
    }

    builder.create(dir).map_err(|e| CacheError::io(dir, e))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(DEFAULT_FILE_MODE);
    }

    let mut file = options.open(path).map_err(|e| CacheError::io(path, e))?;
    file.write_all(bytes).map_err(|e| CacheError::io(path, e))
}

/// Removes a file, or a directory with everything under it. Nothing there is not an error.
fn remove_entry(path: &Path) -> Result<()> {
    let removed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) => Err(err),
    };

    match removed {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CacheError::io(path, err)),
    }
}
