//! Trailing-edge debouncer driven by an injected clock.

use std::time::{Duration, Instant};

/// At most one pending deadline; each trigger pushes it back.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arms the timer to fire `delay` after `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns `true` exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    #[test]
    fn fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(200));

        assert!(!debouncer.poll(start + Duration::from_millis(300)));
        assert!(debouncer.poll(start + Duration::from_millis(500)));
        assert!(!debouncer.poll(start + Duration::from_millis(900)));
    }

    #[test]
    fn cancel_clears_pending_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.schedule(start);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.poll(start + Duration::from_secs(1)));
    }
}
