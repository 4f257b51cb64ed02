use std::time::{Duration, Instant};

/// Failure-counting guard.
///
/// Every failure bumps the counter. Reaching `threshold` opens the breaker
/// until `now + cooldown`; once that deadline passes, [`poll`](Self::poll)
/// closes it and the counter starts again from zero.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    errors: u32,
    open_until: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            errors: 0,
            open_until: None,
        }
    }

    /// Records a failure. Returns true when this failure tripped the breaker.
    ///
    /// An expired window is closed first, so failures after the cool-down
    /// count from zero even if nobody polled in between.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.poll(now);
        self.errors = self.errors.saturating_add(1);
        if self.open_until.is_none() && self.errors >= self.threshold {
            self.open_until = Some(now + self.cooldown);
            return true;
        }
        false
    }

    pub fn is_open(&self, now: Instant) -> bool {
        matches!(self.open_until, Some(until) if now < until)
    }

    /// Closes an expired breaker. Returns true when it just closed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.open_until {
            Some(until) if now >= until => {
                self.open_until = None;
                self.errors = 0;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.open_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Failures left before the breaker opens.
    pub fn headroom(&self) -> u32 {
        self.threshold.saturating_sub(self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_on_threshold() {
        let start = Instant::now();
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(10));

        assert!(!breaker.record_failure(start));
        assert!(!breaker.record_failure(start));
        assert!(!breaker.is_open(start));
        assert!(breaker.record_failure(start));
        assert!(breaker.is_open(start));
        assert_eq!(breaker.remaining(start), Duration::from_secs(10));
    }

    #[test]
    fn test_cooldown_resets_counter() {
        let start = Instant::now();
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(10));
        for _ in 0..3 {
            breaker.record_failure(start);
        }

        let almost = start + Duration::from_millis(9_999);
        assert!(!breaker.poll(almost));
        assert!(breaker.is_open(almost));

        let after = start + Duration::from_secs(10);
        assert!(!breaker.is_open(after));
        assert!(breaker.poll(after));
        assert_eq!(breaker.error_count(), 0);
        assert!(!breaker.poll(after));
    }

    #[test]
    fn test_failures_while_open_do_not_extend() {
        let start = Instant::now();
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        assert!(breaker.record_failure(start));
        assert!(!breaker.record_failure(start + Duration::from_secs(5)));
        assert_eq!(breaker.remaining(start), Duration::from_secs(10));
    }

    #[test]
    fn test_failure_after_cooldown_starts_fresh() {
        let start = Instant::now();
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(10));
        for _ in 0..3 {
            breaker.record_failure(start);
        }

        let later = start + Duration::from_secs(11);
        assert!(!breaker.record_failure(later));
        assert_eq!(breaker.error_count(), 1);
        assert!(!breaker.record_failure(later));
        assert!(breaker.record_failure(later));
        assert!(breaker.is_open(later));
    }
}
