//! Virtual time

use picgp_core::timing::Clock;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A clock that only moves when waited on
///
/// Clones share the same time, so the engine and the simulated target see
/// the same elapsed durations.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl VirtualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Time waited so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn wait_until(&self, deadline: Instant) {
        let target = deadline.saturating_duration_since(self.origin);
        if target > self.elapsed.get() {
            self.elapsed.set(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_time() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.wait_for(Duration::from_millis(475));
        assert_eq!(other.elapsed(), Duration::from_millis(475));
    }

    #[test]
    fn test_wait_until_past_deadline() {
        let clock = VirtualClock::new();
        let start = clock.now();
        clock.wait_for(Duration::from_micros(10));
        clock.wait_until(start);
        assert_eq!(clock.elapsed(), Duration::from_micros(10));
    }
}
