//! Wall-clock injection.
//!
//! The core never reads wall-clock time directly inside its algorithms:
//! `now` is resolved once at the operation boundary and threaded down as a
//! plain value. `Clock` is the seam a caller (or a test) plugs into; every
//! component below the boundary takes `now: DateTime<Utc>` as an ordinary
//! parameter, never `Utc::now()` itself.

use chrono::{DateTime, Utc};

/// Supplies the current instant to an operation boundary.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock, used by the running service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_advances() {
        let t = Utc::now();
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), clock.now());
    }
}
