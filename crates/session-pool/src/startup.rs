//! Staggered first logons
//!
//! Logging every account in at once looks like abuse to the service, so each
//! account starts a random gap after the previous one. Offsets are a running
//! sum of gaps drawn uniformly from `[min_gap, max_gap]`; the first account
//! starts immediately.

use std::time::Duration;

use rand::RngExt;

pub const DEFAULT_MIN_START_GAP: Duration = Duration::from_secs(12);
pub const DEFAULT_MAX_START_GAP: Duration = Duration::from_secs(20);

/// Start offset of one account, and the gap drawn before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSlot {
    pub offset: Duration,
    pub next_gap: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct StartupScheduler {
    min_gap: Duration,
    max_gap: Duration,
}

impl Default for StartupScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_START_GAP, DEFAULT_MAX_START_GAP)
    }
}

impl StartupScheduler {
    /// Bounds are inclusive; they are swapped if given in the wrong order.
    pub fn new(min_gap: Duration, max_gap: Duration) -> Self {
        if min_gap <= max_gap {
            Self { min_gap, max_gap }
        } else {
            Self {
                min_gap: max_gap,
                max_gap: min_gap,
            }
        }
    }

    /// Plan `count` slots with gaps drawn from the thread-local RNG.
    pub fn plan(&self, count: usize) -> Vec<StartSlot> {
        let low = self.min_gap.as_millis() as u64;
        let high = self.max_gap.as_millis() as u64;
        let mut rng = rand::rng();
        self.plan_with(count, || Duration::from_millis(rng.random_range(low..=high)))
    }

    /// Plan `count` slots, taking each gap from `next_gap`.
    pub fn plan_with(&self, count: usize, mut next_gap: impl FnMut() -> Duration) -> Vec<StartSlot> {
        let mut offset = Duration::ZERO;
        (0..count)
            .map(|_| {
                let gap = next_gap();
                let slot = StartSlot {
                    offset,
                    next_gap: gap,
                };
                offset += gap;
                slot
            })
            .collect()
    }
}
