// Path: crates/sources/src/data_store.rs

//! The content-addressed store for full contiguous objects.
//!
//! Completed downloads live under
//! `contiguous/by-hash/<h[0:2]>/<h[2:4]>/<hash>`; in-flight writes go to
//! a tmp file and are renamed into place once the stream has fully
//! arrived, so readers never observe partial objects.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use weave_types::data::{DataStream, Region};
use weave_types::error::{DataSourceError, KvError};
use weave_types::id::DataHash;

use futures::TryStreamExt;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// The contiguous object cache on the local filesystem.
pub struct FsContiguousDataStore {
    base: PathBuf,
}

impl FsContiguousDataStore {
    /// Opens (and creates, if needed) the store rooted at `base`.
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self, KvError> {
        let base = base.as_ref().to_path_buf();
        for dir in ["contiguous/by-hash", "contiguous/tmp"] {
            std::fs::create_dir_all(base.join(dir))
                .map_err(|e| KvError::Backend(e.to_string()))?;
        }
        Ok(Self { base })
    }

    fn hash_path(&self, hash: &DataHash) -> PathBuf {
        let name = hash.to_b64url();
        self.base
            .join("contiguous/by-hash")
            .join(&name[0..2])
            .join(&name[2..4])
            .join(&name)
    }

    /// Creates a fresh tmp file for an in-flight download.
    pub async fn create_tmp(&self) -> Result<(PathBuf, tokio::fs::File), KvError> {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self
            .base
            .join("contiguous/tmp")
            .join(format!("data-{}-{}", std::process::id(), seq));
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok((path, file))
    }

    /// Moves a completed tmp file to its content address.
    pub async fn finalize_tmp(&self, tmp: &Path, hash: &DataHash) -> Result<(), KvError> {
        let target = self.hash_path(hash);
        let dir = target
            .parent()
            .ok_or_else(|| KvError::Backend("hash path has no parent".to_string()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        tokio::fs::rename(tmp, &target)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    /// Removes an abandoned tmp file, quietly.
    pub async fn discard_tmp(&self, tmp: &Path) {
        if let Err(e) = tokio::fs::remove_file(tmp).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!(target: "sources", tmp = %tmp.display(), error = %e, "tmp cleanup failed");
            }
        }
    }

    /// True when an object with this hash is cached.
    pub async fn has(&self, hash: &DataHash) -> bool {
        tokio::fs::try_exists(self.hash_path(hash))
            .await
            .unwrap_or(false)
    }

    /// Opens a cached object, optionally windowed, as a stream.
    ///
    /// Returns `None` when the object is absent or its on-disk length
    /// does not match the indexed size (a damaged entry).
    pub async fn open_stream(
        &self,
        hash: &DataHash,
        region: Option<Region>,
        expected_size: u64,
    ) -> Result<Option<DataStream>, KvError> {
        let path = self.hash_path(hash);
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KvError::Backend(e.to_string())),
        };
        let len = file
            .metadata()
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?
            .len();
        if len != expected_size {
            tracing::warn!(
                target: "sources",
                hash = %hash,
                on_disk = len,
                indexed = expected_size,
                "cached object length mismatch, treating as miss"
            );
            return Ok(None);
        }

        let (offset, take) = match region {
            Some(region) => {
                if region.offset >= len {
                    (0, 0)
                } else {
                    (region.offset, region.size.min(len - region.offset))
                }
            }
            None => (0, len),
        };
        if offset > 0 {
            file.seek(std::io::SeekFrom::Start(offset))
                .await
                .map_err(|e| KvError::Backend(e.to_string()))?;
        }

        let reader = file.take(take);
        let stream = ReaderStream::new(reader)
            .map_err(|e| DataSourceError::Fatal(format!("cache read failed: {}", e)));
        Ok(Some(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_util::testing::collect;
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncWriteExt;

    async fn store_object(store: &FsContiguousDataStore, bytes: &[u8]) -> DataHash {
        let hash = DataHash(Sha256::digest(bytes).into());
        let (tmp, mut file) = store.create_tmp().await.unwrap();
        file.write_all(bytes).await.unwrap();
        file.flush().await.unwrap();
        drop(file);
        store.finalize_tmp(&tmp, &hash).await.unwrap();
        hash
    }

    #[tokio::test]
    async fn round_trips_full_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContiguousDataStore::open(dir.path()).unwrap();
        let hash = store_object(&store, b"contiguous-bytes").await;

        assert!(store.has(&hash).await);
        let stream = store.open_stream(&hash, None, 16).await.unwrap().unwrap();
        assert_eq!(collect(stream).await.unwrap(), b"contiguous-bytes");
    }

    #[tokio::test]
    async fn windows_cached_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContiguousDataStore::open(dir.path()).unwrap();
        let hash = store_object(&store, b"abcdefgh").await;

        let stream = store
            .open_stream(&hash, Some(Region { offset: 2, size: 3 }), 8)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collect(stream).await.unwrap(), b"cde");

        // A window past the end yields an empty stream, not an error.
        let stream = store
            .open_stream(&hash, Some(Region { offset: 100, size: 3 }), 8)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collect(stream).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn length_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContiguousDataStore::open(dir.path()).unwrap();
        let hash = store_object(&store, b"short").await;
        assert!(store.open_stream(&hash, None, 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_objects_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContiguousDataStore::open(dir.path()).unwrap();
        let hash = DataHash([7u8; 32]);
        assert!(!store.has(&hash).await);
        assert!(store.open_stream(&hash, None, 1).await.unwrap().is_none());
    }
}
