//! Single-slot debounce timer
//!
//! Holds at most one deadline. Arming always replaces the previous deadline,
//! so each logical operation has exactly one pending timer at a time.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the quiet period from `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and report true if the deadline has passed
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
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
    fn test_rearm_replaces_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(350));

        debounce.arm(start);
        debounce.arm(start + Duration::from_millis(200));

        assert!(!debounce.fire_if_due(start + Duration::from_millis(400)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(550)));
        assert!(!debounce.is_armed());
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(500));
        debounce.arm(start);
        debounce.cancel();
        assert!(debounce.deadline().is_none());
        assert!(!debounce.fire_if_due(start + Duration::from_secs(1)));
    }
}
