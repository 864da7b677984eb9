// Path: crates/kv/src/fs.rs

//! Filesystem KV backend: one file per key, written via tmp + atomic rename.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use weave_api::KvBuffer;
use weave_types::error::KvError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// A durable KV buffer spilling each key to its own file.
///
/// Keys fan out over a two-character hex prefix directory so no single
/// directory accumulates every entry.
pub struct FsKvStore {
    root: PathBuf,
}

impl FsKvStore {
    /// Opens (and creates, if needed) the store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, KvError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &[u8]) -> PathBuf {
        let name = hex::encode(key);
        let prefix = if name.len() >= 2 { &name[..2] } else { "00" };
        self.root.join(prefix).join(name)
    }
}

#[async_trait]
impl KvBuffer for FsKvStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, KvError> {
        match tokio::fs::read(self.key_path(key)).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Backend(e.to_string())),
        }
    }

    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), KvError> {
        let path = self.key_path(key);
        let dir = path
            .parent()
            .ok_or_else(|| KvError::Backend("key path has no parent".to_string()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;

        // Unique tmp name per writer so concurrent sets of the same key
        // cannot observe each other's partial writes.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".tmp-{}-{}", std::process::id(), seq));
        tokio::fs::write(&tmp, &value)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(KvError::Backend(e.to_string()));
        }
        Ok(())
    }

    async fn has(&self, key: &[u8]) -> Result<bool, KvError> {
        Ok(tokio::fs::try_exists(self.key_path(key))
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?)
    }

    async fn del(&self, key: &[u8]) -> Result<(), KvError> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::Backend(e.to_string())),
        }
    }

    async fn close(&self) -> Result<(), KvError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKvStore::open(dir.path()).unwrap();

        assert_eq!(store.get(b"k").await.unwrap(), None);
        store.set(b"k", Bytes::from_static(b"v1")).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap().unwrap().as_ref(), b"v1");
        assert!(store.has(b"k").await.unwrap());

        store.set(b"k", Bytes::from_static(b"v2")).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap().unwrap().as_ref(), b"v2");

        store.del(b"k").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), None);
        // Deleting a missing key is quiet.
        store.del(b"k").await.unwrap();
    }

    #[tokio::test]
    async fn binary_keys_are_safe() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKvStore::open(dir.path()).unwrap();
        let key = [0u8, 255, 10, 47, 92];
        store.set(&key, Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().as_ref(), b"x");
    }

    #[tokio::test]
    async fn no_tmp_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKvStore::open(dir.path()).unwrap();
        store.set(b"a", Bytes::from_static(b"1")).await.unwrap();
        store.set(b"b", Bytes::from_static(b"2")).await.unwrap();
        let mut stack = vec![dir.path().to_path_buf()];
        while let Some(d) = stack.pop() {
            for entry in std::fs::read_dir(d).unwrap() {
                let entry = entry.unwrap();
                if entry.path().is_dir() {
                    stack.push(entry.path());
                } else {
                    let name = entry.file_name();
                    assert!(!name.to_string_lossy().starts_with(".tmp-"));
                }
            }
        }
    }
}
