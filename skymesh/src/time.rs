//! Virtual-clock time types.
//!
//! Nothing in the stack reads a platform clock: every handler receives
//! the current [`Timestamp`] from its driver, and every wait is a
//! deadline computed with a [`Duration`]. Both count whole nanoseconds.
//! That resolution is dictated by the MAC layer: backoff windows are a
//! few milliseconds, per-receiver jitter reaches into the tens of
//! microseconds, and the distance term of the propagation delay is
//! under a microsecond at radio ranges (260 m at c is about 870 ns).
//! Config values arrive as fractional seconds and cross over through
//! [`Duration::from_secs_f64`].

use core::ops::{Add, AddAssign, Sub};

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// An instant on the virtual clock, in nanoseconds since the start of
/// the run.
///
/// Instants are totally ordered, which is what lets an event queue key
/// on them; ties are broken by the driver, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Start of the run.
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Timestamp(ns)
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms * NANOS_PER_MILLI)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs * NANOS_PER_SEC)
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Fractional seconds, for reports and log lines.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Deadline arithmetic that pins at the far future instead of
    /// wrapping.
    #[inline]
    pub const fn saturating_add(self, d: Duration) -> Self {
        Timestamp(self.0.saturating_add(d.0))
    }

    /// Elapsed time since `earlier`, clamped to zero when `earlier` is
    /// actually later. Keeps age and latency computations total even if
    /// a frame carries a timestamp from the same instant it is read.
    #[inline]
    pub const fn saturating_sub(self, earlier: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// A span of virtual time, in nanoseconds.
///
/// Task periods, timeouts, backoff windows and end-to-end latencies are
/// all `Duration`s; adding one to a [`Timestamp`] yields the next
/// deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Duration(ns)
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms * NANOS_PER_MILLI)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs * NANOS_PER_SEC)
    }

    /// Convert a configured value in fractional seconds.
    ///
    /// Rounds to the nearest nanosecond. Non-positive inputs become
    /// zero; config validation rejects negatives before they get here,
    /// this only keeps the conversion total.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration((secs * NANOS_PER_SEC as f64).round() as u64)
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Fractional seconds, for reports and averages.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Integer division of the span. The aging task runs at
    /// `neighbor_timeout.div(2)`, for example.
    #[inline]
    pub const fn div(self, n: u64) -> Self {
        Duration(self.0 / n)
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}
