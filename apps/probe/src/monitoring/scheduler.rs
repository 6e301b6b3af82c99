use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Timing of the probe loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Delay between two probe passes
    pub probe_interval: Duration,

    /// Number of ticks between two flushes to the store
    pub flush_every_n_ticks: u32,
}

impl Schedule {
    pub fn new(probe_interval: Duration, flush_every_n_ticks: u32) -> Self {
        Self { probe_interval, flush_every_n_ticks: flush_every_n_ticks.max(1) }
    }
}

/// Periodic trigger for the probe loop
///
/// The first tick fires one interval after creation. Ticks that fall due
/// while the previous one is still being processed are dropped rather than
/// queued, so at most one tick is ever pending.
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_period_is_at_least_one() {
        let schedule = Schedule::new(Duration::from_millis(10), 0);
        assert_eq!(schedule.flush_every_n_ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_period() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(250));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(250));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ticks_are_skipped() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100));

        // A slow pass spanning several periods
        tokio::time::sleep(Duration::from_millis(350)).await;

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(350));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }
}
