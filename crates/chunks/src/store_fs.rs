// Path: crates/chunks/src/store_fs.rs

//! Content-addressed filesystem store for chunk bytes.
//!
//! Bytes live once under `by-hash/<h[0:2]>/<h[2:4]>/<hash>`; an alias at
//! `by-dataroot/<data_root>/<relative_offset>` points at the hash file,
//! so identical chunks shared by different transactions occupy one file.

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use weave_api::ChunkDataStore;
use weave_types::chunk::ChunkData;
use weave_types::error::KvError;
use weave_types::id::{ChunkHash, DataRoot};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// The filesystem chunk-data cache.
pub struct FsChunkDataStore {
    base: PathBuf,
}

impl FsChunkDataStore {
    /// Opens (and creates, if needed) the store rooted at `base`.
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self, KvError> {
        let base = base.as_ref().to_path_buf();
        for dir in ["data/by-hash", "data/by-dataroot", "data/tmp"] {
            std::fs::create_dir_all(base.join(dir))
                .map_err(|e| KvError::Backend(e.to_string()))?;
        }
        Ok(Self { base })
    }

    fn hash_path(&self, hash: &ChunkHash) -> PathBuf {
        let name = hash.to_b64url();
        self.base
            .join("data/by-hash")
            .join(&name[0..2])
            .join(&name[2..4])
            .join(&name)
    }

    fn dataroot_path(&self, data_root: &DataRoot, relative_offset: u64) -> PathBuf {
        self.base
            .join("data/by-dataroot")
            .join(data_root.to_b64url())
            .join(relative_offset.to_string())
    }

    async fn alias(&self, target: &Path, link: &Path) -> std::io::Result<()> {
        if let Some(dir) = link.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        match tokio::fs::remove_file(link).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        #[cfg(unix)]
        {
            tokio::fs::symlink(target, link).await
        }
        #[cfg(not(unix))]
        {
            tokio::fs::copy(target, link).await.map(|_| ())
        }
    }
}

#[async_trait]
impl ChunkDataStore for FsChunkDataStore {
    async fn has_chunk_data(&self, data_root: &DataRoot, relative_offset: u64) -> bool {
        tokio::fs::try_exists(self.dataroot_path(data_root, relative_offset))
            .await
            .unwrap_or(false)
    }

    async fn get_chunk_data(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
    ) -> Result<Option<ChunkData>, KvError> {
        let path = self.dataroot_path(data_root, relative_offset);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KvError::Backend(e.to_string())),
        };
        // Re-derive the digest from what was actually read, so a damaged
        // cache entry is caught by the caller's hash check.
        let hash: [u8; 32] = Sha256::digest(&bytes).into();
        Ok(Some(ChunkData {
            hash: ChunkHash(hash),
            chunk: Bytes::from(bytes),
            source: Some("fs-cache".to_string()),
        }))
    }

    async fn set_chunk_data(
        &self,
        data_root: &DataRoot,
        relative_offset: u64,
        data: &ChunkData,
    ) -> Result<(), KvError> {
        let hash_path = self.hash_path(&data.hash);
        let exists = tokio::fs::try_exists(&hash_path)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        if !exists {
            let dir = hash_path
                .parent()
                .ok_or_else(|| KvError::Backend("hash path has no parent".to_string()))?;
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| KvError::Backend(e.to_string()))?;
            let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
            let tmp = self
                .base
                .join("data/tmp")
                .join(format!("chunk-{}-{}", std::process::id(), seq));
            tokio::fs::write(&tmp, &data.chunk)
                .await
                .map_err(|e| KvError::Backend(e.to_string()))?;
            if let Err(e) = tokio::fs::rename(&tmp, &hash_path).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(KvError::Backend(e.to_string()));
            }
        }
        self.alias(&hash_path, &self.dataroot_path(data_root, relative_offset))
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::sha256;

    fn chunk(bytes: &'static [u8]) -> ChunkData {
        ChunkData {
            hash: ChunkHash(sha256(bytes)),
            chunk: Bytes::from_static(bytes),
            source: None,
        }
    }

    #[tokio::test]
    async fn round_trips_by_dataroot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChunkDataStore::open(dir.path()).unwrap();
        let root = DataRoot([1u8; 32]);
        let data = chunk(b"chunk-bytes");

        assert!(!store.has_chunk_data(&root, 0).await);
        store.set_chunk_data(&root, 0, &data).await.unwrap();
        assert!(store.has_chunk_data(&root, 0).await);

        let read = store.get_chunk_data(&root, 0).await.unwrap().unwrap();
        assert_eq!(read.chunk, data.chunk);
        assert_eq!(read.hash, data.hash);
        assert_eq!(read.source.as_deref(), Some("fs-cache"));
    }

    #[tokio::test]
    async fn identical_chunks_share_one_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChunkDataStore::open(dir.path()).unwrap();
        let data = chunk(b"shared");
        let root_a = DataRoot([1u8; 32]);
        let root_b = DataRoot([2u8; 32]);

        store.set_chunk_data(&root_a, 0, &data).await.unwrap();
        store.set_chunk_data(&root_b, 262144, &data).await.unwrap();

        // Exactly one file under by-hash.
        let mut count = 0;
        let mut stack = vec![dir.path().join("data/by-hash")];
        while let Some(d) = stack.pop() {
            for entry in std::fs::read_dir(d).unwrap() {
                let entry = entry.unwrap();
                if entry.path().is_dir() {
                    stack.push(entry.path());
                } else {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 1);

        assert!(store.get_chunk_data(&root_a, 0).await.unwrap().is_some());
        assert!(store
            .get_chunk_data(&root_b, 262144)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rewriting_an_alias_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChunkDataStore::open(dir.path()).unwrap();
        let root = DataRoot([3u8; 32]);
        store.set_chunk_data(&root, 7, &chunk(b"x")).await.unwrap();
        store.set_chunk_data(&root, 7, &chunk(b"x")).await.unwrap();
        assert!(store.get_chunk_data(&root, 7).await.unwrap().is_some());
    }
}
