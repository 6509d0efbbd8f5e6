//! A local key-value cache for downloaded tool binaries, keyed by
//! `(name, version)` and resolving to a directory on disk.
//!
//! Entries live under `<root>/<name>/<version>/`. A `.complete` marker is
//! written only after the binary has fully landed in the entry directory, so
//! an interrupted registration is treated as a miss rather than served as a
//! truncated binary.

use std::path::{Path, PathBuf};

const COMPLETE_MARKER: &str = ".complete";

#[derive(thiserror::Error, Debug)]
pub enum ToolCacheError {
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, name: &str, version: &str) -> Result<PathBuf, ToolCacheError> {
        // Keys become path components, so reject anything that could escape
        // the cache root.
        for key in [name, version] {
            if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
                return Err(ToolCacheError::InvalidKey(key.to_string()));
            }
        }
        Ok(self.root.join(name).join(version))
    }

    /// Look up a completed cache entry. Returns the entry directory, or
    /// `None` when the tool has not been cached (or only partially cached).
    pub fn find(&self, name: &str, version: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(name, version).ok()?;
        if dir.join(COMPLETE_MARKER).is_file() {
            tracing::debug!("Tool cache hit for {name} {version} @ {}", dir.display());
            Some(dir)
        } else {
            None
        }
    }

    /// Copy `source` into the cache as `<root>/<name>/<version>/<file_name>`
    /// and mark the entry complete. Returns the entry directory.
    ///
    /// Re-registering an existing entry overwrites it.
    pub fn cache_file(
        &self,
        source: &Path,
        file_name: &str,
        name: &str,
        version: &str,
    ) -> Result<PathBuf, ToolCacheError> {
        let dir = self.entry_dir(name, version)?;
        let marker = dir.join(COMPLETE_MARKER);

        if marker.exists() {
            fs_err::remove_file(&marker)?;
        }
        fs_err::create_dir_all(&dir)?;
        fs_err::copy(source, dir.join(file_name))?;
        fs_err::write(&marker, [])?;

        tracing::debug!("Cached {name} {version} @ {}", dir.display());
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_source() -> (tempfile::TempDir, ToolCache, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path().join("tools"));
        let source = dir.path().join("downloaded-tool");
        fs_err::write(&source, b"#!/bin/sh\n").unwrap();
        (dir, cache, source)
    }

    #[test]
    fn test_find_misses_on_empty_cache() {
        let (_dir, cache, _source) = cache_with_source();
        assert_eq!(cache.find("ripunzip", "1.1.0"), None);
    }

    #[test]
    fn test_cache_file_round_trip() {
        let (_dir, cache, source) = cache_with_source();

        let entry = cache
            .cache_file(&source, "ripunzip", "ripunzip", "1.1.0")
            .unwrap();
        assert!(entry.join("ripunzip").is_file());

        let found = cache.find("ripunzip", "1.1.0").unwrap();
        assert_eq!(found, entry);
    }

    #[test]
    fn test_incomplete_entry_is_a_miss() {
        let (_dir, cache, source) = cache_with_source();

        // Simulate an interrupted registration: binary present, no marker.
        let entry = cache.root().join("ripunzip").join("1.1.0");
        fs_err::create_dir_all(&entry).unwrap();
        fs_err::copy(&source, entry.join("ripunzip")).unwrap();

        assert_eq!(cache.find("ripunzip", "1.1.0"), None);
    }

    #[test]
    fn test_recache_overwrites() {
        let (dir, cache, source) = cache_with_source();
        cache
            .cache_file(&source, "ripunzip", "ripunzip", "1.1.0")
            .unwrap();

        let updated = dir.path().join("updated-tool");
        fs_err::write(&updated, b"updated").unwrap();
        let entry = cache
            .cache_file(&updated, "ripunzip", "ripunzip", "1.1.0")
            .unwrap();

        assert_eq!(fs_err::read(entry.join("ripunzip")).unwrap(), b"updated");
    }

    #[test]
    fn test_path_like_keys_are_rejected() {
        let (_dir, cache, source) = cache_with_source();
        assert!(matches!(
            cache.cache_file(&source, "tool", "../escape", "1.0"),
            Err(ToolCacheError::InvalidKey(_))
        ));
        assert_eq!(cache.find("", "1.0"), None);
    }
}
