//! Single-shot reconnect timer
//!
//! At most one reconnect is pending per account. Scheduling while one is
//! already pending changes nothing and reports how long is left. The timer is
//! a deadline polled by the owning account's event loop, so a cancelled timer
//! can never fire.

use std::future::pending;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(30 * 60);

/// Outcome of `ReconnectScheduler::schedule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// A new timer was armed.
    Armed { delay: Duration },
    /// A timer was already pending; nothing changed.
    AlreadyPending { remaining_secs: u64 },
}

#[derive(Debug)]
pub struct ReconnectScheduler {
    delay: Duration,
    due: Option<Instant>,
}

impl ReconnectScheduler {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    /// Arm the timer unless one is already pending.
    pub fn schedule(&mut self) -> Scheduled {
        match self.remaining_secs() {
            Some(remaining_secs) => Scheduled::AlreadyPending { remaining_secs },
            None => {
                self.due = Some(Instant::now() + self.delay);
                Scheduled::Armed { delay: self.delay }
            }
        }
    }

    /// Disarm the timer. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Whole seconds until the pending timer fires, rounded up.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.due.map(|due| {
            let left = due.saturating_duration_since(Instant::now());
            left.as_millis().div_ceil(1000) as u64
        })
    }

    /// Resolves when the pending timer is due. Never resolves while idle.
    pub async fn expired(&self) {
        match self.due {
            Some(due) => tokio::time::sleep_until(due).await,
            None => pending().await,
        }
    }

    /// Clear the pending marker once the timer has fired.
    pub fn mark_fired(&mut self) {
        self.due = None;
    }
}
