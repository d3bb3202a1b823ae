//! In-memory work queue shared by a project's workers
//!
//! A deduplicating FIFO with a bounded capacity, a dequeue timeout, and
//! in-flight accounting. The accounting lets an idle worker tell a frontier
//! that is momentarily empty from one that is exhausted.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Outcome of a dequeue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeue {
    /// A URL to crawl; the caller must call `complete` when done
    Item(String),

    /// Nothing arrived before the timeout
    Empty,

    /// The queue was closed; workers should exit
    Closed,
}

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<String>,
    /// Pending plus in-flight URLs
    members: HashSet<String>,
    in_flight: usize,
    /// Bumped on every push and completion
    generation: u64,
    closed: bool,
}

/// Deduplicating work queue
#[derive(Debug)]
pub struct WorkQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    available: Notify,
    shutdown: Notify,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            available: Notify::new(),
            shutdown: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a URL unless it is pending, in flight, or the queue is full
    pub fn try_push(&self, url: &str) -> bool {
        let mut inner = self.lock();
        if inner.closed || inner.pending.len() >= self.capacity || inner.members.contains(url) {
            return false;
        }
        inner.members.insert(url.to_string());
        inner.pending.push_back(url.to_string());
        inner.generation += 1;
        drop(inner);

        self.available.notify_one();
        true
    }

    /// Pushes every URL that fits; returns how many were added
    pub fn push_many<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for url in urls {
            if self.is_full() {
                break;
            }
            if self.try_push(url.as_ref()) {
                added += 1;
            }
        }
        added
    }

    /// Waits up to `timeout` for a URL
    pub async fn pop_timeout(&self, timeout: Duration) -> Dequeue {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return Dequeue::Closed;
                }
                if let Some(url) = inner.pending.pop_front() {
                    inner.in_flight += 1;
                    return Dequeue::Item(url);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Dequeue::Empty;
            }
        }
    }

    /// Marks a dequeued URL as finished
    pub fn complete(&self, url: &str) {
        let mut inner = self.lock();
        if inner.members.remove(url) {
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.generation += 1;
        }
    }

    /// Generation stamp if nothing is pending or in flight
    pub fn idle_generation(&self) -> Option<u64> {
        let inner = self.lock();
        (inner.pending.is_empty() && inner.in_flight == 0).then_some(inner.generation)
    }

    /// True if the queue stayed idle and untouched since `generation`
    pub fn idle_since(&self, generation: u64) -> bool {
        self.idle_generation() == Some(generation)
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// URLs dequeued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Stops the queue and wakes everyone waiting on it
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
        self.shutdown.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        loop {
            let notified = self.shutdown.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}
