// Path: crates/workers/src/semaphore.rs

//! A FIFO counting semaphore with observable state.
//!
//! Waiters are queued and woken strictly in arrival order; a released
//! permit is handed directly to the oldest waiter rather than returned
//! to the pool, so no newcomer can overtake the queue.

use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Raised when a semaphore is built with zero permits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("semaphore requires at least one permit")]
pub struct InvalidPermits;

#[derive(Debug)]
struct SemState {
    permits: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// A counting semaphore serving waiters in FIFO order.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemState>,
}

/// An RAII permit; dropping it releases the semaphore.
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
}

impl Semaphore {
    /// Builds a semaphore with `permits` slots; `permits` must be >= 1.
    pub fn new(permits: usize) -> Result<Self, InvalidPermits> {
        if permits < 1 {
            return Err(InvalidPermits);
        }
        Ok(Self {
            state: Mutex::new(SemState {
                permits,
                waiters: VecDeque::new(),
            }),
        })
    }

    /// Acquires a permit, suspending until one is free.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        loop {
            let receiver = {
                let Ok(mut state) = self.state.lock() else {
                    // A poisoned lock means a holder panicked; yield and retry.
                    tokio::task::yield_now().await;
                    continue;
                };
                if state.permits > 0 {
                    state.permits -= 1;
                    return SemaphorePermit { sem: self };
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                rx
            };
            // The lock is released before suspending.
            if receiver.await.is_ok() {
                // The releaser handed its permit directly to us.
                return SemaphorePermit { sem: self };
            }
        }
    }

    fn release(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        loop {
            match state.waiters.pop_front() {
                Some(waiter) => {
                    if waiter.send(()).is_ok() {
                        return;
                    }
                    // The waiter gave up; try the next one.
                }
                None => {
                    state.permits += 1;
                    return;
                }
            }
        }
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.state.lock().map(|s| s.permits).unwrap_or(0)
    }

    /// Waiters currently queued.
    pub fn queue_length(&self) -> usize {
        self.state.lock().map(|s| s.waiters.len()).unwrap_or(0)
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
