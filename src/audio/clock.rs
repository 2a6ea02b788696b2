//! Wall-clock source for elapsed-time accounting.
//!
//! The recorder derives elapsed time from start/pause instants rather than
//! counting ticks, so it only needs "now".  Production code uses
//! [`SystemClock`]; tests drive a manual clock forward explicitly.

use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Instant;
}

/// `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::Clock;

    /// A clock that only moves when told to.  Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        base: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
            *offset += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
            self.base + offset
        }
    }
}
