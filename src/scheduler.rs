//! Concurrency throttle for outbound requests
//!
//! At most `max_concurrent` tasks run at once; the rest wait in submission
//! order. After a task finishes, its slot is held for `request_delay` so the
//! upstream API never sees back-to-back bursts.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{AcquireError, Semaphore};

/// FIFO, concurrency-bounded task scheduler
pub struct RequestScheduler {
    // tokio's semaphore is fair: waiters acquire in the order they queued
    permits: Semaphore,
    max_concurrent: usize,
    request_delay: Duration,
    active: AtomicUsize,
    queued: AtomicUsize,
}

impl RequestScheduler {
    pub fn new(max_concurrent: usize, request_delay: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Semaphore::new(max_concurrent),
            max_concurrent,
            request_delay,
            active: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
        }
    }

    /// Runs `task` once a slot is free and returns its output
    ///
    /// The output (success or failure) is handed back only after the pacing
    /// delay has elapsed and the slot has been released to the next waiter.
    /// Dropping the returned future while queued gives up the place in line.
    ///
    /// Fails without running `task` once the scheduler has been closed.
    pub async fn schedule<F, T>(&self, task: F) -> Result<T, AcquireError>
    where
        F: Future<Output = T>,
    {
        let waiting = Gauge::enter(&self.queued);
        let permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Request scheduler is closed, dropping task");
                return Err(e);
            }
        };
        drop(waiting);

        let running = Gauge::enter(&self.active);
        let output = task.await;

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        drop(running);
        drop(permit);

        Ok(output)
    }

    /// Stops admitting tasks. Queued and future tasks fail; running ones finish.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Tasks currently holding a slot
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Tasks waiting for a slot
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }
}

/// Counts a task in a gauge for as long as it is alive
struct Gauge<'a>(&'a AtomicUsize);

impl<'a> Gauge<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Gauge<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
