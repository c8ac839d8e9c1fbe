use std::time::Duration;

/// Pause after each line read, and floor of the idle delay.
pub const BASE_DELAY: Duration = Duration::from_millis(20);
/// Ceiling of the idle delay.
pub const MAX_DELAY: Duration = Duration::from_secs(5);
/// How fast the idle delay grows with the number of empty reads.
pub const GROWTH_FACTOR: f64 = 5.0;

/// Logarithmic backoff applied while the log has nothing new.
///
/// After `n` consecutive empty reads the delay is
/// `clamp(base * ln(1 + n * factor), base, max)`: it rises quickly over the
/// first idle iterations then flattens, and never leaves `[base, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleBackoff {
    base: Duration,
    max: Duration,
    factor: f64,
    idle_count: u32,
}

impl Default for IdleBackoff {
    fn default() -> Self {
        Self::new(BASE_DELAY, MAX_DELAY, GROWTH_FACTOR)
    }
}

impl IdleBackoff {
    /// A `max` below `base` is raised to `base`; a negative or NaN factor is
    /// read as zero.
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            factor: if factor.is_finite() && factor > 0.0 { factor } else { 0.0 },
            idle_count: 0,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn idle_count(&self) -> u32 {
        self.idle_count
    }

    /// Delay after `idle_count` consecutive empty reads.
    pub fn delay_for(&self, idle_count: u32) -> Duration {
        let scaled = self.base.as_secs_f64() * (f64::from(idle_count) * self.factor).ln_1p();
        let bounded = scaled.clamp(self.base.as_secs_f64(), self.max.as_secs_f64());
        Duration::from_secs_f64(bounded)
    }

    /// Records one more empty read and returns the delay to wait.
    pub fn next_idle(&mut self) -> Duration {
        self.idle_count = self.idle_count.saturating_add(1);
        self.delay_for(self.idle_count)
    }

    /// Back to reading mode; returns the base delay.
    pub fn reset(&mut self) -> Duration {
        self.idle_count = 0;
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let backoff = IdleBackoff::default();
        assert_eq!(backoff.base(), Duration::from_millis(20));
        assert_eq!(backoff.max(), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_is_monotonic_and_bounded() {
        let backoff = IdleBackoff::default();
        let samples = [0u32, 1, 2, 3, 5, 10, 100, 1_000, 100_000, u32::MAX];

        let mut previous = Duration::ZERO;
        for n in samples {
            let delay = backoff.delay_for(n);
            assert!(delay >= previous, "delay for {} went down", n);
            assert!(delay >= backoff.base() && delay <= backoff.max());
            previous = delay;
        }
    }

    #[test]
    fn test_first_idle_delay_follows_log_curve() {
        let mut backoff = IdleBackoff::default();
        let expected = 0.020 * 6f64.ln();
        let delay = backoff.next_idle();

        assert_eq!(backoff.idle_count(), 1);
        assert!((delay.as_secs_f64() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_delay_saturates_at_max() {
        let backoff = IdleBackoff::new(Duration::from_secs(1), Duration::from_secs(3), 5.0);

        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1_000), Duration::from_secs(3));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(3));
    }

    #[test]
    fn test_reset_returns_to_base() {
        let mut backoff = IdleBackoff::default();
        for _ in 0..50 {
            backoff.next_idle();
        }

        assert_eq!(backoff.reset(), BASE_DELAY);
        assert_eq!(backoff.idle_count(), 0);
    }

    #[test]
    fn test_max_below_base_is_raised() {
        let backoff = IdleBackoff::new(Duration::from_millis(50), Duration::from_millis(10), 5.0);
        assert_eq!(backoff.max(), Duration::from_millis(50));
        assert_eq!(backoff.delay_for(1_000_000), Duration::from_millis(50));
    }
}
