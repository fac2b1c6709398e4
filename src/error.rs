//! Error types for cache store operations.
//!
//! Callers usually only need to tell a miss apart from a fault. [`CacheError::is_miss`]
//! covers both flavours of "no usable value": the key's file is absent, or it holds an
//! expired record.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be configured (e.g. blank base directory).
    #[error("invalid cache configuration: {message}")]
    Configuration { message: String },

    /// A filesystem call failed. The path is the file or directory being touched.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bytes could not be turned into a record, or a record into bytes.
    #[error("codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The record was present but expired.
    #[error("cache miss")]
    CacheMiss,
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        CacheError::Configuration {
            message: message.into(),
        }
    }

    /// True for an expired record and for a missing file.
    pub fn is_miss(&self) -> bool {
        match self {
            CacheError::CacheMiss => true,
            CacheError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            CacheError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_is_a_miss() {
        assert!(CacheError::CacheMiss.is_miss());
    }

    #[test]
    fn missing_file_is_a_miss() {
        let err = CacheError::io("/tmp/ab/cd", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_miss());
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn permission_denied_is_not_a_miss() {
        let err = CacheError::io("/root", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_miss());
    }

    #[test]
    fn codec_error_is_not_a_miss() {
        let err = CacheError::Codec("truncated input".into());
        assert!(!err.is_miss());
        assert_eq!(err.io_kind(), None);
        assert!(err.to_string().contains("truncated input"));
    }

    #[test]
    fn io_error_displays_path() {
        let err = CacheError::io("/var/cache/x", io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("/var/cache/x"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn configuration_error_displays_message() {
        let err = CacheError::configuration("base directory not provided");
        assert!(err.to_string().contains("base directory not provided"));
    }
}
