// Path: crates/kv/src/redb_store.rs

//! Embedded log-structured KV backend over redb.
//!
//! Writes land in an in-memory pending map for read-your-writes and are
//! committed to the database by a background task that coalesces batches
//! over a ~100 ms window, so bursts of small sets share one transaction.

use async_trait::async_trait;
use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use weave_api::KvBuffer;
use weave_types::error::KvError;

const KV: TableDefinition<&[u8], &[u8]> = TableDefinition::new("KV");

/// How long the committer waits after a wake-up to coalesce more writes.
const COMMIT_COALESCE: Duration = Duration::from_millis(100);

enum Cmd {
    Wake,
    Close(oneshot::Sender<()>),
}

/// `None` marks a pending delete; `Some` a pending set.
type Pending = Arc<RwLock<HashMap<Vec<u8>, Option<Bytes>>>>;

/// A durable KV buffer over a single redb database file.
pub struct RedbKvStore {
    db: Arc<Database>,
    pending: Pending,
    cmd_tx: mpsc::UnboundedSender<Cmd>,
    closed: AtomicBool,
}

impl RedbKvStore {
    /// Opens (and creates, if needed) the database at `path` and starts
    /// the background committer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KvError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| KvError::Backend(e.to_string()))?;
            }
        }
        let db = Database::create(path).map_err(|e| KvError::Backend(e.to_string()))?;

        // Ensure the table exists so first reads see an empty table
        // rather than a missing one.
        {
            let w = db
                .begin_write()
                .map_err(|e| KvError::Backend(e.to_string()))?;
            w.open_table(KV)
                .map_err(|e| KvError::Backend(e.to_string()))?;
            w.commit().map_err(|e| KvError::Backend(e.to_string()))?;
        }

        let db = Arc::new(db);
        let pending: Pending = Arc::new(RwLock::new(HashMap::new()));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        tokio::spawn(committer(Arc::clone(&db), Arc::clone(&pending), cmd_rx));

        Ok(Self {
            db,
            pending,
            cmd_tx,
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<(), KvError> {
        if self.closed.load(Ordering::Acquire) {
            Err(KvError::Closed)
        } else {
            Ok(())
        }
    }

    fn read_db(db: &Database, key: &[u8]) -> Result<Option<Bytes>, KvError> {
        let read = db
            .begin_read()
            .map_err(|e| KvError::Backend(e.to_string()))?;
        let table = read
            .open_table(KV)
            .map_err(|e| KvError::Backend(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(value.map(|v| Bytes::copy_from_slice(v.value())))
    }
}

async fn committer(db: Arc<Database>, pending: Pending, mut cmd_rx: mpsc::UnboundedReceiver<Cmd>) {
    loop {
        let ack = match cmd_rx.recv().await {
            Some(Cmd::Wake) => None,
            Some(Cmd::Close(ack)) => Some(ack),
            // Every sender is gone; flush what is pending and wind down.
            None => {
                flush(&db, &pending).await;
                return;
            }
        };

        // Coalesce: let more writes accumulate before taking the snapshot,
        // unless this is the final flush.
        if ack.is_none() {
            tokio::time::sleep(COMMIT_COALESCE).await;
            // Drain wake signals that arrived during the window.
            while let Ok(cmd) = cmd_rx.try_recv() {
                if let Cmd::Close(close_ack) = cmd {
                    flush(&db, &pending).await;
                    let _ = close_ack.send(());
                    return;
                }
            }
        }

        flush(&db, &pending).await;

        if let Some(ack) = ack {
            let _ = ack.send(());
            return;
        }
    }
}

async fn flush(db: &Arc<Database>, pending: &Pending) {
    let batch: HashMap<Vec<u8>, Option<Bytes>> = {
        let mut map = match pending.write() {
            Ok(map) => map,
            Err(_) => return,
        };
        std::mem::take(&mut *map)
    };
    if batch.is_empty() {
        return;
    }

    let db = Arc::clone(db);
    let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
        let w = db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut table = w.open_table(KV).map_err(|e| e.to_string())?;
            for (key, value) in &batch {
                match value {
                    Some(bytes) => {
                        table
                            .insert(key.as_slice(), bytes.as_ref())
                            .map_err(|e| e.to_string())?;
                    }
                    None => {
                        table.remove(key.as_slice()).map_err(|e| e.to_string())?;
                    }
                }
            }
        }
        w.commit().map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(target: "kv", error = %e, "redb batch commit failed"),
        Err(e) => tracing::error!(target: "kv", error = %e, "redb committer task panicked"),
    }
}

#[async_trait]
impl KvBuffer for RedbKvStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, KvError> {
        self.check_open()?;
        {
            let map = self
                .pending
                .read()
                .map_err(|_| KvError::Backend("pending map poisoned".to_string()))?;
            if let Some(entry) = map.get(key) {
                return Ok(entry.clone());
            }
        }
        let db = Arc::clone(&self.db);
        let key = key.to_vec();
        tokio::task::spawn_blocking(move || RedbKvStore::read_db(&db, &key))
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?
    }

    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), KvError> {
        self.check_open()?;
        {
            let mut map = self
                .pending
                .write()
                .map_err(|_| KvError::Backend("pending map poisoned".to_string()))?;
            map.insert(key.to_vec(), Some(value));
        }
        self.cmd_tx.send(Cmd::Wake).map_err(|_| KvError::Closed)
    }

    async fn del(&self, key: &[u8]) -> Result<(), KvError> {
        self.check_open()?;
        {
            let mut map = self
                .pending
                .write()
                .map_err(|_| KvError::Backend("pending map poisoned".to_string()))?;
            map.insert(key.to_vec(), None);
        }
        self.cmd_tx.send(Cmd::Wake).map_err(|_| KvError::Closed)
    }

    async fn close(&self) -> Result<(), KvError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(Cmd::Close(ack_tx))
            .map_err(|_| KvError::Closed)?;
        ack_rx.await.map_err(|_| KvError::Closed)
    }
}
