//! Time sources for validity and freshness decisions.

/// Supplies the current time as Unix seconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ts(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ts(&self) -> i64 {
        crate::util::unix_now()
    }
}

/// A clock frozen at a fixed Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ts(&self) -> i64 {
        self.0
    }
}
