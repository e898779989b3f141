//! Wall-clock abstraction.
//!
//! Token expiry, key retirement timestamps and audit timestamps all read the
//! time through [`Clock`], so tests can drive time explicitly with
//! [`ManualClock`] instead of sleeping.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use gradeguard_storage::{Clock, ManualClock};
//!
//! let clock = ManualClock::new(Utc::now());
//! let before = clock.now();
//! clock.advance(Duration::hours(2));
//! assert_eq!(clock.now() - before, Duration::hours(2));
//! ```

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
///
/// Time only moves when [`advance`](Self::advance) or [`set`](Self::set) is
/// called. Cloning shares the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Moves the clock forward (or backward, for a negative delta).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    /// Starts at the current time truncated to whole seconds.
    fn default() -> Self {
        Self::new(Utc::now().trunc_subsecs(0))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
