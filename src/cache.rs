//! Offline cache: named buckets that can be listed and deleted.
//!
//! The only operation the capture station needs is "clear everything", which
//! [`clear_all`] implements by deleting every bucket concurrently.
//! [`DirCacheStore`] maps buckets to sub-directories of a root directory.

use crate::capture::CaptureSession;
use crate::error::CaptureError;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Enumerate and delete named cache buckets.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Names of all buckets.
    async fn keys(&self) -> Result<Vec<String>, CaptureError>;

    /// Delete bucket `name`. `Ok(false)` when it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, CaptureError>;
}

/// Cache buckets stored as sub-directories of `root`.
#[derive(Debug, Clone)]
pub struct DirCacheStore {
    root: PathBuf,
}

impl DirCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStore for DirCacheStore {
    async fn keys(&self) -> Result<Vec<String>, CaptureError> {
        let fail = |source| CaptureError::CacheFailed {
            name: self.root.display().to_string(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(fail(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(fail)? {
            if entry.file_type().await.map_err(fail)?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, CaptureError> {
        match tokio::fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CaptureError::CacheFailed {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Delete every bucket in `store`.
///
/// Deletions run concurrently; the first failure is reported through the
/// session and returned. On success the user is told "Cache cleared!" and
/// the activity log gets "Cache cleared". Returns the number of buckets
/// removed.
pub async fn clear_all(
    store: &dyn CacheStore,
    session: &mut CaptureSession,
) -> Result<usize, CaptureError> {
    let keys = match store.keys().await {
        Ok(keys) => keys,
        Err(e) => return Err(session.report(e)),
    };
    debug!("Clearing {} cache buckets", keys.len());

    let results = join_all(keys.iter().map(|k| store.delete(k))).await;
    let mut removed = 0;
    for result in results {
        match result {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => return Err(session.report(e)),
        }
    }

    info!("Cleared {} cache buckets", removed);
    session.notifier().alert("Cache cleared!");
    session.record("Cache cleared");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;

    fn session() -> CaptureSession {
        CaptureSession::new(&CaptureConfig::default())
    }

    #[tokio::test]
    async fn missing_root_has_no_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirCacheStore::new(dir.path().join("absent"));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_lists_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("v2")).unwrap();
        std::fs::create_dir(dir.path().join("v1")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let store = DirCacheStore::new(dir.path());
        assert_eq!(store.keys().await.unwrap(), ["v1", "v2"]);
    }

    #[tokio::test]
    async fn delete_missing_bucket_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirCacheStore::new(dir.path());
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn clear_all_removes_every_bucket_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["doc-capture-v1", "doc-capture-v2", "fonts"] {
            let bucket = dir.path().join(name);
            std::fs::create_dir(&bucket).unwrap();
            std::fs::write(bucket.join("entry"), b"cached").unwrap();
        }

        let store = DirCacheStore::new(dir.path());
        let mut s = session();
        assert_eq!(clear_all(&store, &mut s).await.unwrap(), 3);
        assert!(store.keys().await.unwrap().is_empty());
        assert!(s.log().render().ends_with("Cache cleared"));
    }
}
