// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time and tick-rate conversion.
//!
//! [`HostTime`] represents a point in time as ticks of a fixed-frequency
//! monotonic counter (e.g. `QueryPerformanceCounter` on Windows,
//! `mach_absolute_time` on macOS).
//!
//! [`TickRate`] carries the counter frequency in ticks per second and converts
//! tick counts into the millisecond values shown to users.
//!
//! [`Duration`] represents a duration in the same tick units as [`HostTime`].
//! Integer conversions use `u128` intermediates to avoid overflow.

use core::fmt;
use core::ops::{Add, Sub};

/// A point in time expressed as monotonic counter ticks.
///
/// `HostTime(0)` is never produced by a running clock and is rejected where a
/// real timestamp is required.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// The latest representable time.
    pub const MAX: Self = Self(u64::MAX);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Adds a duration, clamping at [`HostTime::MAX`].
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.0))
    }

    /// Subtracts a duration, clamping at zero.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.0))
    }

    /// Checked subtraction of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, duration: Duration) -> Option<Self> {
        match self.0.checked_sub(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Frequency of the monotonic counter, in ticks per second.
///
/// The correct instance comes from the platform (the performance-counter
/// frequency on Windows, `1e9` for nanosecond clocks).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickRate {
    ticks_per_second: u64,
}

impl TickRate {
    /// A clock whose ticks are nanoseconds.
    pub const NANOS: Self = Self {
        ticks_per_second: 1_000_000_000,
    };

    /// A clock whose ticks are microseconds.
    pub const MICROS: Self = Self {
        ticks_per_second: 1_000_000,
    };

    /// Creates a tick rate.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_second` is zero.
    #[inline]
    #[must_use]
    pub const fn new(ticks_per_second: u64) -> Self {
        assert!(ticks_per_second != 0, "tick rate must not be zero");
        Self { ticks_per_second }
    }

    /// Returns the number of ticks in one second.
    #[inline]
    #[must_use]
    pub const fn ticks_per_second(self) -> u64 {
        self.ticks_per_second
    }

    /// Converts a whole number of seconds to ticks, saturating on overflow.
    #[inline]
    #[must_use]
    pub const fn seconds_to_ticks(self, seconds: u64) -> u64 {
        seconds.saturating_mul(self.ticks_per_second)
    }

    /// Converts a tick count to milliseconds.
    #[inline]
    #[must_use]
    pub fn ticks_to_millis(self, ticks: u64) -> f64 {
        1000.0 * ticks as f64 / self.ticks_per_second as f64
    }

    /// Converts a tick count to microseconds.
    #[inline]
    #[must_use]
    pub fn ticks_to_micros(self, ticks: u64) -> f64 {
        1_000_000.0 * ticks as f64 / self.ticks_per_second as f64
    }

    /// Converts a tick count to whole nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = ticks as u128 * 1_000_000_000 / self.ticks_per_second as u128;
        wide as u64
    }

    /// Converts whole nanoseconds to a tick count.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        let wide = nanos as u128 * self.ticks_per_second as u128 / 1_000_000_000;
        wide as u64
    }
}

impl fmt::Debug for TickRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TickRate({}/s)", self.ticks_per_second)
    }
}

/// A duration in counter ticks.
///
/// Arithmetic uses the same tick units as [`HostTime`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Creates a duration of whole seconds at the given rate.
    #[inline]
    #[must_use]
    pub const fn from_secs(seconds: u64, rate: TickRate) -> Self {
        Self(rate.seconds_to_ticks(seconds))
    }

    /// Converts this duration to milliseconds at the given rate.
    #[inline]
    #[must_use]
    pub fn as_millis_f64(self, rate: TickRate) -> f64 {
        rate.ticks_to_millis(self.0)
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_from_qpc_style_rate() {
        // Typical QueryPerformanceFrequency on modern Windows: 10 MHz.
        let rate = TickRate::new(10_000_000);
        assert_eq!(rate.ticks_to_millis(166_667), 16.6667, "one 60 Hz frame");
        assert_eq!(rate.seconds_to_ticks(2), 20_000_000);
    }

    #[test]
    fn nanos_round_trip() {
        let rate = TickRate::new(24_000_000);
        let nanos = rate.ticks_to_nanos(24_000_000);
        assert_eq!(nanos, 1_000_000_000, "24 MHz → 1s");
        assert_eq!(rate.nanos_to_ticks(nanos), 24_000_000);
    }

    #[test]
    fn overflow_safe_conversion() {
        let rate = TickRate::new(3);
        // Should not panic; result is approximate but deterministic
        let _nanos = rate.ticks_to_nanos(u64::MAX / 2);
        assert_eq!(rate.seconds_to_ticks(u64::MAX), u64::MAX, "saturates");
    }

    #[test]
    #[should_panic(expected = "tick rate must not be zero")]
    fn zero_rate_rejected() {
        let _ = TickRate::new(0);
    }

    #[test]
    fn duration_arithmetic() {
        let a = Duration(100);
        let b = Duration(30);
        assert_eq!((a + b).ticks(), 130);
        assert_eq!((a - b).ticks(), 70);
        assert_eq!(a.saturating_sub(Duration(200)), Duration::ZERO);
        assert_eq!(Duration::from_secs(3, TickRate::MICROS), Duration(3_000_000));
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration(200);
        assert_eq!((t + d).ticks(), 1200);
        assert_eq!((t - d).ticks(), 800);
        assert_eq!(t.saturating_sub(Duration(5000)), HostTime(0));
        assert_eq!(HostTime::MAX.saturating_add(d), HostTime::MAX);
        assert_eq!(t.saturating_duration_since(HostTime(1500)), Duration::ZERO);
        assert_eq!(t.saturating_duration_since(HostTime(400)), Duration(600));
    }
}
