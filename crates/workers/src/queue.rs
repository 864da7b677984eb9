// Path: crates/workers/src/queue.rs

//! The generic bounded FIFO worker queue.
//!
//! One `VecDeque` guarded by a std mutex (never held across a suspension
//! point), `worker_count` tokio tasks pulling from the front, and an
//! optional in-flight key set for at-most-once-per-key queues. Enqueues
//! against a full queue drop silently with a debug log and a metric;
//! prioritised enqueues bypass the fullness check but still respect the
//! key set. Item-level handler failures are logged and counted so a
//! poison item never stops the queue.

use async_trait::async_trait;
use dashmap::DashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use weave_telemetry::queue_metrics;

/// An item processed by a worker queue.
pub trait QueueJob: Send + 'static {
    /// The item's identity, used for at-most-once-in-flight tracking.
    fn key(&self) -> String;
}

/// The per-item processing logic.
#[async_trait]
pub trait JobHandler<J: QueueJob>: Send + Sync + 'static {
    /// Processes one item. Errors are logged and counted by the queue.
    async fn handle(&self, job: J) -> anyhow::Result<()>;
}

/// Sizing and identity of one queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Stable queue name for logs and metrics.
    pub name: &'static str,
    /// Number of concurrent workers.
    pub worker_count: usize,
    /// Maximum queued items before non-prioritised enqueues drop.
    pub max_queue_size: usize,
    /// When set, a key is accepted at most once until its item finishes.
    pub unique_in_flight: bool,
}

struct QueueInner<J> {
    options: QueueOptions,
    items: Mutex<VecDeque<J>>,
    notify: Notify,
    stopped: AtomicBool,
    in_flight: DashSet<String>,
}

impl<J: QueueJob> QueueInner<J> {
    fn depth(&self) -> usize {
        self.items.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn report_depth(&self) {
        queue_metrics().set_depth(self.options.name, self.depth() as u64);
    }
}

/// A bounded FIFO queue with a fixed worker pool.
pub struct WorkerQueue<J: QueueJob> {
    inner: Arc<QueueInner<J>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: QueueJob> WorkerQueue<J> {
    /// Starts the queue and its workers.
    pub fn start(options: QueueOptions, handler: Arc<dyn JobHandler<J>>) -> Self {
        let inner = Arc::new(QueueInner {
            options,
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            in_flight: DashSet::new(),
        });

        let worker_count = options.worker_count.max(1);
        let mut handles = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let inner = Arc::clone(&inner);
            let handler = Arc::clone(&handler);
            handles.push(tokio::spawn(async move {
                run_worker(worker, inner, handler).await;
            }));
        }

        Self {
            inner,
            handles: Mutex::new(handles),
        }
    }

    /// Offers an item; a full queue drops it and returns `false`.
    pub fn enqueue(&self, job: J) -> bool {
        self.offer(job, false)
    }

    /// Offers an item past the fullness check. The in-flight key set is
    /// still enforced.
    pub fn enqueue_prioritized(&self, job: J) -> bool {
        self.offer(job, true)
    }

    fn offer(&self, job: J, prioritized: bool) -> bool {
        let name = self.inner.options.name;
        if self.inner.stopped.load(Ordering::Acquire) {
            tracing::debug!(target: "workers", queue = name, "enqueue refused, queue stopped");
            return false;
        }

        let key = job.key();
        if self.inner.options.unique_in_flight && !self.inner.in_flight.insert(key.clone()) {
            tracing::debug!(target: "workers", queue = name, key, "enqueue skipped, already in flight");
            return false;
        }

        {
            let Ok(mut items) = self.inner.items.lock() else {
                return false;
            };
            if !prioritized && items.len() >= self.inner.options.max_queue_size {
                drop(items);
                if self.inner.options.unique_in_flight {
                    self.inner.in_flight.remove(&key);
                }
                queue_metrics().inc_dropped(name);
                tracing::debug!(target: "workers", queue = name, key, "queue full, item dropped");
                return false;
            }
            items.push_back(job);
        }

        queue_metrics().inc_enqueued(name);
        self.inner.report_depth();
        self.inner.notify.notify_one();
        true
    }

    /// Current queue length, for backpressure probes.
    pub fn queue_depth(&self) -> usize {
        self.inner.depth()
    }

    /// Stops the queue: refuses new work, abandons queued-but-unstarted
    /// items, and waits for in-flight items to finish.
    pub async fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        if let Ok(mut items) = self.inner.items.lock() {
            items.clear();
        }
        self.inner.report_depth();
        self.inner.notify.notify_waiters();

        let handles = {
            let Ok(mut guard) = self.handles.lock() else {
                return;
            };
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }
        tracing::debug!(target: "workers", queue = self.inner.options.name, "queue stopped");
    }
}

async fn run_worker<J: QueueJob>(
    worker: usize,
    inner: Arc<QueueInner<J>>,
    handler: Arc<dyn JobHandler<J>>,
) {
    let name = inner.options.name;
    let pop = |inner: &QueueInner<J>| inner.items.lock().ok().and_then(|mut q| q.pop_front());
    loop {
        let job = match pop(&inner) {
            Some(job) => job,
            None => {
                let mut notified = std::pin::pin!(inner.notify.notified());
                notified.as_mut().enable();
                // Re-check with the waiter registered, so an enqueue or a
                // stop between the empty pop and the await is not missed.
                match pop(&inner) {
                    Some(job) => job,
                    None => {
                        if inner.stopped.load(Ordering::Acquire) {
                            break;
                        }
                        notified.await;
                        continue;
                    }
                }
            }
        };
        inner.report_depth();

        let key = job.key();
        if let Err(e) = handler.handle(job).await {
            queue_metrics().inc_failed(name);
            tracing::warn!(target: "workers", queue = name, worker, key, error = %e, "item failed");
        } else {
            queue_metrics().inc_processed(name);
        }
        if inner.options.unique_in_flight {
            inner.in_flight.remove(&key);
        }
    }
}
