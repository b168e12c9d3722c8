//! Time source for expiration checks.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock stopped at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_epoch();
        assert_eq!(clock.now().timestamp_millis(), 0);

        clock.advance(chrono::Duration::milliseconds(10));
        assert_eq!(clock.now().timestamp_millis(), 10);

        clock.set(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(3));
        assert_eq!(clock.now().timestamp_millis(), 3000);
    }

    #[test]
    fn test_shared_clock_observes_updates() {
        let clock = std::sync::Arc::new(ManualClock::at_epoch());
        let shared = clock.clone();
        clock.advance(chrono::Duration::milliseconds(5));
        assert_eq!(Clock::now(&shared).timestamp_millis(), 5);
    }
}
