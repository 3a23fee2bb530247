//! Dual-priority bounded queue with backpressure.
//!
//! Two bounded queues, `high` (fresh files) and `standard` (backlog).
//! Producers block up to a timeout when their queue is full; the single
//! consumer always drains `high` first. Fairness between the two classes
//! is the scheduler's job, not the queue's: starving `standard` while
//! fresh work arrives is by contract.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Queue admission priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Freshly produced pipeline output.
    High,
    /// Backlog drained during idle capacity.
    Standard,
}

/// One parsed JSONL line waiting to be flushed.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// The record payload, already stamped with index timestamps.
    pub data: Value,
    /// Source file the line came from.
    pub file_path: PathBuf,
    /// Admission priority.
    pub priority: Priority,
}

#[derive(Default)]
struct Inner {
    high: VecDeque<QueueItem>,
    standard: VecDeque<QueueItem>,
}

/// Bounded dual-priority queue, safe under concurrent producers and a
/// single consumer.
pub struct DualPriorityQueue {
    inner: Mutex<Inner>,
    high_capacity: usize,
    standard_capacity: usize,
    /// Signalled when space frees up.
    space: Notify,
    /// Signalled when an item arrives.
    items: Notify,
}

impl DualPriorityQueue {
    /// Creates a queue with the given per-priority capacities.
    #[must_use]
    pub fn new(high_capacity: usize, standard_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            high_capacity: high_capacity.max(1),
            standard_capacity: standard_capacity.max(1),
            space: Notify::new(),
            items: Notify::new(),
        }
    }

    /// Enqueues an item, blocking up to `timeout` when the target queue is
    /// full. Returns `false` when the item could not be admitted.
    pub async fn put(&self, item: QueueItem, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.space.notified();
            {
                #[allow(clippy::unwrap_used)] // mutex poisoning is fatal
                let mut inner = self.inner.lock().unwrap();
                let (queue, capacity) = match item.priority {
                    Priority::High => (&mut inner.high, self.high_capacity),
                    Priority::Standard => (&mut inner.standard, self.standard_capacity),
                };
                if queue.len() < capacity {
                    queue.push_back(item);
                    self.items.notify_one();
                    return true;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                // One more admission attempt after the deadline passes.
                return self.try_put_now(&item);
            }
        }
    }

    fn try_put_now(&self, item: &QueueItem) -> bool {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.lock().unwrap();
        let (queue, capacity) = match item.priority {
            Priority::High => (&mut inner.high, self.high_capacity),
            Priority::Standard => (&mut inner.standard, self.standard_capacity),
        };
        if queue.len() < capacity {
            queue.push_back(item.clone());
            self.items.notify_one();
            true
        } else {
            false
        }
    }

    /// Dequeues one item, always preferring `high`. Blocks up to `timeout`
    /// when both queues are empty.
    pub async fn get(&self, timeout: Duration) -> Option<QueueItem> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.items.notified();
            {
                #[allow(clippy::unwrap_used)]
                let mut inner = self.inner.lock().unwrap();
                if let Some(item) = inner.high.pop_front() {
                    self.space.notify_one();
                    return Some(item);
                }
                if let Some(item) = inner.standard.pop_front() {
                    self.space.notify_one();
                    return Some(item);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Returns `(high, standard)` queue depths.
    #[must_use]
    pub fn qsize(&self) -> (usize, usize) {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.lock().unwrap();
        (inner.high.len(), inner.standard.len())
    }

    /// True when either queue is at or above 90% of its capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let (high, standard) = self.qsize();
        high * 10 >= self.high_capacity * 9 || standard * 10 >= self.standard_capacity * 9
    }

    /// True when both queues are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qsize() == (0, 0)
    }
}
