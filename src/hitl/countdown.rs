//! Per-request countdown.
//!
//! Remaining time is always recomputed from the receipt anchor, never
//! decremented per tick, so a stalled tick loop catches up on the next
//! tick instead of drifting.

use std::time::{Duration, Instant};

/// Remaining seconds at or below which a prompt is shown as `warning`.
pub const WARNING_SECS: u64 = 10;
/// Remaining seconds at or below which a prompt is shown as `critical`.
pub const CRITICAL_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

impl Urgency {
    pub fn for_remaining(remaining: u64) -> Self {
        if remaining <= CRITICAL_SECS {
            Urgency::Critical
        } else if remaining <= WARNING_SECS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub remaining: u64,
    pub urgency: Urgency,
}

impl Reading {
    pub fn expired(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone)]
pub struct Countdown {
    anchor: Instant,
    budget_secs: u64,
    /// Lowest value handed out so far; readings never go back up even if
    /// a caller passes an older `now`.
    floor: u64,
}

impl Countdown {
    pub fn new(anchor: Instant, budget_secs: u64) -> Self {
        Self {
            anchor,
            budget_secs,
            floor: budget_secs,
        }
    }

    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    pub fn budget_secs(&self) -> u64 {
        self.budget_secs
    }

    pub fn deadline(&self) -> Instant {
        self.anchor + Duration::from_secs(self.budget_secs)
    }

    /// Whole seconds left at `now`; elapsed time is floored.
    pub fn remaining_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.anchor).as_secs();
        self.budget_secs.saturating_sub(elapsed)
    }

    pub fn read(&mut self, now: Instant) -> Reading {
        let remaining = self.remaining_at(now).min(self.floor);
        self.floor = remaining;
        Reading {
            remaining,
            urgency: Urgency::for_remaining(remaining),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_thresholds() {
        assert_eq!(Urgency::for_remaining(30), Urgency::Normal);
        assert_eq!(Urgency::for_remaining(11), Urgency::Normal);
        assert_eq!(Urgency::for_remaining(10), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(6), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(5), Urgency::Critical);
        assert_eq!(Urgency::for_remaining(0), Urgency::Critical);
    }

    #[test]
    fn test_remaining_uses_wall_clock_delta() {
        let t0 = Instant::now();
        let mut c = Countdown::new(t0, 30);
        assert_eq!(c.read(t0).remaining, 30);
        assert_eq!(c.read(t0 + Duration::from_millis(999)).remaining, 30);
        assert_eq!(c.read(t0 + Duration::from_secs(1)).remaining, 29);
        // A 25s stall is caught up in one reading.
        assert_eq!(c.read(t0 + Duration::from_secs(26)).remaining, 4);
    }

    #[test]
    fn test_reaches_zero_exactly_at_deadline() {
        let t0 = Instant::now();
        let mut c = Countdown::new(t0, 30);
        assert!(!c.read(t0 + Duration::from_millis(29_999)).expired());
        let at_deadline = c.read(c.deadline());
        assert!(at_deadline.expired());
        assert_eq!(c.read(t0 + Duration::from_secs(500)).remaining, 0);
    }

    #[test]
    fn test_readings_never_increase() {
        let t0 = Instant::now();
        let mut c = Countdown::new(t0, 20);
        let mut last = u64::MAX;
        for step in [0u64, 3, 1, 7, 7, 2, 19, 12, 25] {
            let r = c.read(t0 + Duration::from_secs(step)).remaining;
            assert!(r <= last, "went from {} to {}", last, r);
            last = r;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_zero_budget_is_immediately_expired() {
        let t0 = Instant::now();
        let mut c = Countdown::new(t0, 0);
        assert!(c.read(t0).expired());
    }
}
