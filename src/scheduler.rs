//! Capture cadence for the controlling loop.
//!
//! A [`CaptureScheduler`] wraps a tokio interval with
//! [`MissedTickBehavior::Skip`]: when a cycle overruns, the late tick fires
//! once and the ticks that fell behind it are dropped instead of bursting.
//! Each tick reports how many were dropped so the session can count them.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Capture cadence (about 33 ticks per second).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug)]
pub struct CaptureScheduler {
    interval: Interval,
    period: Duration,
    last: Option<Instant>,
}

impl CaptureScheduler {
    /// First tick is due one period from now. Periods under 1ms are raised
    /// to 1ms. Must be called inside a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            period,
            last: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick. Returns the number of ticks skipped since
    /// the previous one.
    pub async fn tick(&mut self) -> u64 {
        let at = self.interval.tick().await;
        let skipped = match self.last {
            Some(prev) => {
                let periods = at.duration_since(prev).as_nanos() / self.period.as_nanos();
                u64::try_from(periods.saturating_sub(1)).unwrap_or(u64::MAX)
            }
            None => 0,
        };
        self.last = Some(at);
        skipped
    }
}

impl Default for CaptureScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// The paused clock lands on timer deadlines, give or take the timer
    /// wheel's 1ms resolution.
    fn assert_at(start: Instant, millis: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= ms(millis) && elapsed < ms(millis + 2),
            "expected ~{}ms, got {:?}",
            millis,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let start = Instant::now();
        let mut ticker = CaptureScheduler::default();
        assert_eq!(ticker.tick().await, 0);
        assert_at(start, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_time_ticks_skip_nothing() {
        let start = Instant::now();
        let mut ticker = CaptureScheduler::default();
        for _ in 0..10 {
            assert_eq!(ticker.tick().await, 0);
        }
        assert_at(start, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_missed_ticks() {
        let start = Instant::now();
        let mut ticker = CaptureScheduler::default();
        assert_eq!(ticker.tick().await, 0);

        // A cycle that runs from 30ms to 100ms: the tick due at 60 fires
        // late, the one at 90 is dropped and the next lands on 120.
        time::advance(ms(70)).await;
        assert_eq!(ticker.tick().await, 0);
        assert_at(start, 100);
        assert_eq!(ticker.tick().await, 1);
        assert_at(start, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_period_is_raised() {
        let ticker = CaptureScheduler::new(Duration::ZERO);
        assert_eq!(ticker.period(), ms(1));
    }
}
