//! Repeating retry timer for session conflicts
//!
//! While another session holds the account, logging in again immediately
//! would just kick one of the two sessions off. The account instead retries
//! on a long fixed period until the conflict clears or it is stopped.

use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

pub const DEFAULT_CONFLICT_RETRY_PERIOD: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug)]
pub struct PeriodicRetryScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl PeriodicRetryScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking one period from now. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        true
    }

    /// Stop ticking. Returns whether the timer was running.
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on each tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending().await,
        }
    }
}
