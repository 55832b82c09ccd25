//! Deadline-based timing primitives.
//!
//! Everything here is driven by explicit `Instant`s handed in by the caller,
//! so the engine stays single-threaded and tests can step time without
//! sleeping. Nothing fires on its own: the owner polls on each frame tick.

use std::time::{Duration, Instant};

/// Trailing-edge debounce: a burst of triggers collapses into one firing
/// `window` after the last trigger.
#[derive(Debug, Clone)]
pub struct Coalescer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns true exactly once per burst, on the first poll at or past the
    /// deadline.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Fixed-period poll. Missed periods are not replayed.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    last: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// One-shot delayed action. Re-arming moves the deadline earlier only, so a
/// stream of requests cannot starve it.
#[derive(Debug, Clone)]
pub struct Deferred {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Deferred {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        let next = now + self.delay;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing <= next => existing,
            _ => next,
        });
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalescer_collapses_bursts() {
        let start = Instant::now();
        let mut c = Coalescer::new(Duration::from_millis(300));
        c.trigger(start);
        c.trigger(start + Duration::from_millis(100));
        c.trigger(start + Duration::from_millis(200));
        // 300ms after the first trigger, but only 100ms after the last one
        assert!(!c.fire_due(start + Duration::from_millis(300)));
        assert!(c.fire_due(start + Duration::from_millis(500)));
        // fired once; nothing pending afterwards
        assert!(!c.fire_due(start + Duration::from_millis(900)));
        assert!(!c.is_pending());
    }

    #[test]
    fn coalescer_cancel_drops_pending() {
        let start = Instant::now();
        let mut c = Coalescer::new(Duration::from_millis(10));
        c.trigger(start);
        c.cancel();
        assert!(!c.fire_due(start + Duration::from_secs(1)));
    }

    #[test]
    fn interval_fires_once_per_period() {
        let start = Instant::now();
        let mut i = Interval::new(Duration::from_millis(400));
        assert!(i.due(start));
        assert!(!i.due(start + Duration::from_millis(399)));
        assert!(i.due(start + Duration::from_millis(400)));
        assert!(!i.due(start + Duration::from_millis(500)));
    }

    #[test]
    fn deferred_keeps_earliest_deadline() {
        let start = Instant::now();
        let mut d = Deferred::new(Duration::from_millis(10));
        d.arm(start);
        d.arm(start + Duration::from_millis(8));
        assert!(d.take_due(start + Duration::from_millis(10)));
        assert!(!d.is_armed());
    }
}
