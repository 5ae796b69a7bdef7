//! Time types for the gradmesh protocol.
//!
//! All time values are passed explicitly through handler arguments, never
//! read from a platform clock inside the core. This keeps every handler
//! replayable under the deterministic simulator.

use core::ops::{Add, AddAssign, Sub};

/// Protocol timestamp in milliseconds.
///
/// Wraps a u64 to enforce explicit unit conversions and prevent mixing
/// milliseconds with seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp (epoch).
    pub const ZERO: Timestamp = Timestamp(0);

    /// Maximum timestamp.
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Create a timestamp from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1000))
    }

    /// Get the timestamp as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the timestamp as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Saturating addition of a duration.
    #[inline]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.0))
    }

    /// Saturating subtraction of another timestamp, returning a duration.
    #[inline]
    pub const fn saturating_sub(self, other: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// Duration in milliseconds.
///
/// Represents a time span, not a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    /// Create a duration from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs.saturating_mul(1000))
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the duration as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Duration) -> Self {
        Duration(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline]
    pub const fn saturating_sub(self, other: Duration) -> Self {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_creation() {
        let t1 = Timestamp::from_millis(1500);
        assert_eq!(t1.as_millis(), 1500);
        assert_eq!(t1.as_secs(), 1);

        let t2 = Timestamp::from_secs(60);
        assert_eq!(t2.as_millis(), 60_000);
        assert_eq!(t2.as_secs(), 60);
    }

    #[test]
    fn test_duration_creation() {
        let d = Duration::from_secs(30);
        assert_eq!(d.as_millis(), 30_000);
        assert_eq!(d.as_secs(), 30);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let t1 = Timestamp::from_secs(10);
        let d = Duration::from_secs(5);

        assert_eq!((t1 + d).as_secs(), 15);
        assert_eq!((Timestamp::from_secs(20) - t1).as_secs(), 10);
    }

    #[test]
    fn test_saturating_operations() {
        let t = Timestamp::MAX;
        assert_eq!(t.saturating_add(Duration::from_secs(1)), Timestamp::MAX);

        let t1 = Timestamp::from_secs(5);
        let t2 = Timestamp::from_secs(10);
        assert_eq!(t1.saturating_sub(t2), Duration::ZERO);
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::from_secs(5) < Timestamp::from_secs(10));
        assert!(Duration::from_secs(3) < Duration::from_secs(7));
    }
}
