//! Millisecond clock used for `created_at`/`updated_at` stamping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of epoch-millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Returns the next `updated_at` value for an entity last stamped at `previous`.
///
/// Strictly greater than `previous` even when the clock has not moved or has
/// gone backwards.
pub fn next_timestamp(clock: &dyn Clock, previous: i64) -> i64 {
    clock.now_ms().max(previous.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::{next_timestamp, ManualClock};

    #[test]
    fn next_timestamp_follows_clock_when_it_moves_forward() {
        let clock = ManualClock::new(5_000);
        assert_eq!(next_timestamp(&clock, 1_000), 5_000);
    }

    #[test]
    fn next_timestamp_is_strictly_increasing_when_clock_stalls() {
        let clock = ManualClock::new(1_000);
        assert_eq!(next_timestamp(&clock, 1_000), 1_001);
        clock.set(10);
        assert_eq!(next_timestamp(&clock, 1_001), 1_002);
    }
}
