//! Interval gating for work that should run at most once per period

/// Gate that opens at most once per `interval` seconds of host time.
///
/// Times are host-supplied seconds (typically time since startup), not wall
/// clock. The first opening happens once `now >= start + interval`.
///
/// # Example
///
/// ```rust
/// use perf::Throttle;
///
/// let mut throttle = Throttle::new(1.0);
/// assert!(!throttle.ready(0.5));
/// assert!(throttle.ready(1.0));
/// assert!(!throttle.ready(1.5));
/// assert!(throttle.ready(2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    interval: f64,
    last: f64,
}

impl Throttle {
    /// Create a throttle whose reference point is time zero.
    pub fn new(interval: f64) -> Self {
        Self::starting_at(interval, 0.0)
    }

    /// Create a throttle whose reference point is `now`.
    pub fn starting_at(interval: f64, now: f64) -> Self {
        Self {
            interval: interval.max(0.0),
            last: now,
        }
    }

    /// Returns true and moves the reference point to `now` if the interval has elapsed.
    #[inline]
    pub fn ready(&mut self, now: f64) -> bool {
        if self.is_due(now) {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Check whether the interval has elapsed without consuming it.
    #[inline]
    pub fn is_due(&self, now: f64) -> bool {
        now >= self.last + self.interval
    }

    /// Time until the gate next opens, zero if already due.
    pub fn remaining(&self, now: f64) -> f64 {
        (self.last + self.interval - now).max(0.0)
    }

    /// Change the interval, keeping the reference point.
    pub fn set_interval(&mut self, interval: f64) {
        self.interval = interval.max(0.0);
    }

    /// The configured interval in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// The time the gate last opened.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Move the reference point to `now`.
    pub fn reset(&mut self, now: f64) {
        self.last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_first_opening() {
        let mut throttle = Throttle::new(0.5);
        assert!(!throttle.ready(0.25));
        assert!(throttle.ready(0.5));
        assert_eq!(throttle.last(), 0.5);
    }

    #[test]
    fn test_throttle_defers_between_openings() {
        let mut throttle = Throttle::starting_at(1.0, 10.0);
        assert!(!throttle.ready(10.9));
        assert!(throttle.ready(11.2));
        assert!(!throttle.ready(12.1));
        assert!(throttle.ready(12.25));
    }

    #[test]
    fn test_throttle_zero_interval_always_ready() {
        let mut throttle = Throttle::new(0.0);
        assert!(throttle.ready(0.0));
        assert!(throttle.ready(0.0));
    }

    #[test]
    fn test_throttle_negative_interval_clamped() {
        let throttle = Throttle::new(-5.0);
        assert_eq!(throttle.interval(), 0.0);
    }

    #[test]
    fn test_throttle_remaining_and_peek() {
        let mut throttle = Throttle::new(1.0);
        assert_eq!(throttle.remaining(0.25), 0.75);
        assert!(!throttle.is_due(0.25));
        assert_eq!(throttle.remaining(3.0), 0.0);
        assert!(throttle.is_due(3.0));
        // peeking does not consume
        assert!(throttle.ready(3.0));
    }

    #[test]
    fn test_throttle_set_interval_and_reset() {
        let mut throttle = Throttle::new(1.0);
        throttle.set_interval(2.0);
        assert!(!throttle.ready(1.5));
        throttle.reset(5.0);
        assert!(!throttle.ready(6.0));
        assert!(throttle.ready(7.0));
    }
}
