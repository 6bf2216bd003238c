// Delivery latch
//
// A countdown of expected deliveries. Listener tasks call count_down() once
// per accepted delivery; the orchestrator awaits wait(timeout). Unlike a
// plain countdown latch, running out of time is reported as
// DemoError::LatchTimeout carrying the outstanding count.
//
// Waiters register interest on the Notify *before* reading the counter, so a
// count_down racing with a waiter can never be missed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::error::{DemoError, Result};

/// Countdown of expected deliveries with an explicit timeout path
#[derive(Debug)]
pub struct DeliveryLatch {
    name: String,
    initial: usize,
    remaining: AtomicUsize,
    notify: Notify,
}

impl DeliveryLatch {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            initial: count,
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count the latch was created with
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Deliveries still outstanding
    pub fn count(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Record one delivery and return the outstanding count
    ///
    /// Counting down an open latch is a no-op.
    pub fn count_down(&self) -> usize {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => {
                let remaining = previous - 1;
                if remaining == 0 {
                    self.notify.notify_waiters();
                }
                remaining
            }
            Err(_) => 0,
        }
    }

    /// Wait until every expected delivery has been counted
    ///
    /// Returns `LatchTimeout` if `timeout` elapses first.
    pub async fn wait(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return Ok(());
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let remaining = self.count();
                if remaining == 0 {
                    return Ok(());
                }
                return Err(DemoError::LatchTimeout {
                    latch: self.name.clone(),
                    remaining,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }
}
