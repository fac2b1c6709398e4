use std::path::PathBuf;
use std::sync::Arc;

/// Maps a cache key to a path relative to the store's base directory.
pub type KeyFn = Arc<dyn Fn(&str) -> PathBuf + Send + Sync>;

/// Number of shard directory levels above each entry file.
const SHARD_LEVELS: usize = 3;
const SHARD_WIDTH: usize = 2;

/// The default key mapping: `xx/yy/zz/<digest>`, where `<digest>` is the lowercase hex MD5
/// of the key and `xx`, `yy`, `zz` are its first three character pairs.
///
/// Sharding keeps every directory at no more than 256 children, however large the cache.
pub fn sharded_digest_path(key: &str) -> PathBuf {
    let digest = format!("{:x}", md5::compute(key.as_bytes()));

    let mut path = PathBuf::new();
    for level in 0..SHARD_LEVELS {
        let start = level * SHARD_WIDTH;
        path.push(&digest[start..start + SHARD_WIDTH]);
    }
    path.push(&digest);
    path
}

pub fn default_key_fn() -> KeyFn {
    Arc::new(sharded_digest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn known_digest_layout() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(
            sharded_digest_path(""),
            Path::new("d4")
                .join("1d")
                .join("8c")
                .join("d41d8cd98f00b204e9800998ecf8427e")
        );
    }

    #[test]
    fn same_key_same_path() {
        assert_eq!(sharded_digest_path("user:42"), sharded_digest_path("user:42"));
    }

    #[test]
    fn different_keys_different_paths() {
        assert_ne!(sharded_digest_path("user:42"), sharded_digest_path("user:43"));
    }

    #[test]
    fn path_is_relative_with_four_components() {
        let path = sharded_digest_path("some/../weird key\0");
        assert!(path.is_relative());

        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[3].len(), 32);
        assert!(parts[3].starts_with(&format!("{}{}{}", parts[0], parts[1], parts[2])));
        assert!(parts[3]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn default_key_fn_is_the_sharded_digest() {
        let key_fn = default_key_fn();
        assert_eq!(key_fn("alice"), sharded_digest_path("alice"));
    }
}
