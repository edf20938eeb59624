//! Session clocks
//!
//! Gaze samples are stamped on the receiving side. A clock reports the time
//! elapsed since its own origin, so sample timestamps are plain durations.

use std::time::{Duration, Instant};

/// Source of arrival instants for gaze samples
pub trait Clock {
    /// Time elapsed since the clock origin
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction, never going backwards
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::Clock;

    /// Test clock advanced by hand
    #[derive(Clone, Default)]
    pub struct ManualClock {
        now: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_ms(&self, ms: u64) {
            self.now.set(Duration::from_millis(ms));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now.get()
        }
    }
}
