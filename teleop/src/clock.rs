use std::time::{Duration, Instant};

/// Time source of the control loop. Settle delays and cycle pacing go
/// through it so they can be observed without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
