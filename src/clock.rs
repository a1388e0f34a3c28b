// Time sources. The engine reads timestamps synchronously and never sleeps.

use std::cell::Cell;
use std::rc::Rc;

use crate::types::{Millis, Timestamp};

/// Wall-clock source in milliseconds.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Browser clock backed by `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    #[cfg(target_arch = "wasm32")]
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(js_sys::Date::now() as u64)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now(&self) -> Timestamp {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp::from_millis(since_epoch.as_millis() as u64)
    }
}

/// Hand-driven clock for tests and replays. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start.as_millis())),
        }
    }

    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get() + by.as_millis());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(Timestamp::from_millis(100));
        let handle = clock.clone();
        handle.advance(Millis::new(250));
        assert_eq!(clock.now(), Timestamp::from_millis(350));
    }

    #[test]
    fn js_clock_is_past_epoch() {
        assert!(JsClock.now().as_millis() > 0);
    }
}
