//! Timing source
//!
//! ICSP holds are in the microsecond range, well below the granularity of
//! the OS scheduler, so waits spin on a monotonic clock instead of sleeping.
//! They are minimums: host jitter can only make them longer.

use std::time::{Duration, Instant};

/// Monotonic clock with a busy-wait primitive
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Spin until `deadline` has been reached
    fn wait_until(&self, deadline: Instant);

    /// Spin for at least `duration`
    fn wait_for(&self, duration: Duration) {
        self.wait_until(self.now() + duration);
    }
}

/// Host clock backed by [`Instant`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinClock;

impl Clock for SpinClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait_until(&self, deadline: Instant) {
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
