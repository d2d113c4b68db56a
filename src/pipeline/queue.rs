//! Single-worker FIFO work queue.

use crate::types::{QueueStats, TaskId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};

/// FIFO queue of task IDs drained by exactly one worker
///
/// `wake` is signalled on every push and on [`WorkQueue::close`]. There is a
/// single consumer, so `notify_one` stores a permit when the worker is busy.
#[derive(Clone, Default)]
pub(crate) struct WorkQueue {
    inner: Arc<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    pending: Mutex<VecDeque<TaskId>>,
    running: AtomicUsize,
    closed: AtomicBool,
    wake: Notify,
}

/// Marks a task as running until dropped
pub(crate) struct RunningGuard {
    inner: Arc<QueueInner>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.inner.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkQueue {
    /// Append a task to the back of the queue
    pub(crate) async fn push(&self, id: TaskId) {
        self.inner.pending.lock().await.push_back(id);
        self.inner.wake.notify_one();
    }

    /// Drop a task that has not been picked up yet
    ///
    /// Returns true if the task was found and removed.
    pub(crate) async fn remove(&self, id: TaskId) -> bool {
        let mut pending = self.inner.pending.lock().await;
        let before = pending.len();
        pending.retain(|queued| *queued != id);
        pending.len() < before
    }

    /// Wait for the next task
    ///
    /// Returns `None` once the queue is closed; tasks still pending stay in
    /// the task store as `queued` and are picked up again on the next start.
    pub(crate) async fn next(&self) -> Option<TaskId> {
        loop {
            if self.is_closed() {
                return None;
            }

            if let Some(id) = self.inner.pending.lock().await.pop_front() {
                return Some(id);
            }

            self.inner.wake.notified().await;
        }
    }

    /// Stop handing out tasks and wake the worker
    pub(crate) fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Count a task as running for as long as the guard lives
    pub(crate) fn begin_run(&self) -> RunningGuard {
        self.inner.running.fetch_add(1, Ordering::SeqCst);
        RunningGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of tasks currently running
    pub(crate) fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the queue for stats reporting
    pub(crate) async fn stats(&self, accepting_new: bool) -> QueueStats {
        let pending = self.inner.pending.lock().await.len();
        let running = self.running();
        QueueStats {
            total: pending + running,
            running,
            pending,
            accepting_new,
        }
    }
}
