//! One-shot timer handle
//!
//! Holds a deadline rather than a running task, so the owner decides when to
//! check it and cancellation is just forgetting the deadline.

use std::time::Duration;

use tokio::time::Instant;

/// A re-armable one-shot timer
#[derive(Debug, Clone)]
pub struct Timer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    /// Create a disarmed timer that fires `delay` after each arm
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm (or re-arm) relative to `now`, replacing any pending fire
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any pending fire
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending fire if it is due at `now`
    ///
    /// Returns true at most once per arm.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
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
    fn test_timer_fires_once() {
        let start = Instant::now();
        let mut timer = Timer::new(Duration::from_millis(500));
        assert!(!timer.is_armed());

        timer.arm(start);
        assert!(!timer.fire(start + Duration::from_millis(499)));
        assert!(timer.fire(start + Duration::from_millis(500)));
        assert!(!timer.fire(start + Duration::from_millis(900)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new(Duration::from_millis(500));

        timer.arm(start);
        timer.arm(start + Duration::from_millis(300));
        assert!(!timer.fire(start + Duration::from_millis(600)));
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(800)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = Timer::new(Duration::from_millis(10));
        timer.arm(start);
        timer.cancel();
        assert!(!timer.fire(start + Duration::from_secs(1)));
    }
}
