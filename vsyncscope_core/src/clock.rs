// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock sources for instrumentation timestamps.
//!
//! [`Clock`] is the seam between the instrumentation context and the platform
//! counter. Backends implement it over their native monotonic counter;
//! [`ManualClock`] is a caller-driven clock for simulation and tests.

use core::cell::Cell;

use crate::time::{Duration, HostTime, TickRate};

/// A monotonic, fixed-frequency time source.
pub trait Clock {
    /// Returns the current counter value.
    ///
    /// Successive calls must never go backwards.
    fn now(&self) -> HostTime;

    /// Returns the counter frequency.
    fn tick_rate(&self) -> TickRate;
}

/// A clock that only moves when told to.
///
/// Interior mutability lets the owner advance time while the clock is
/// borrowed by an instrumentation context.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<HostTime>,
    rate: TickRate,
}

impl ManualClock {
    /// Creates a clock reading `start` at the given rate.
    #[must_use]
    pub const fn new(start: HostTime, rate: TickRate) -> Self {
        Self {
            now: Cell::new(start),
            rate,
        }
    }

    /// Jumps to `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` is earlier than the current reading.
    pub fn set(&self, t: HostTime) {
        assert!(t >= self.now.get(), "manual clock must not go backwards");
        self.now.set(t);
    }

    /// Advances the clock by `d` and returns the new reading.
    pub fn advance(&self, d: Duration) -> HostTime {
        let t = self.now.get().saturating_add(d);
        self.now.set(t);
        t
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> HostTime {
        self.now.get()
    }

    #[inline]
    fn tick_rate(&self) -> TickRate {
        self.rate
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> HostTime {
        (**self).now()
    }

    #[inline]
    fn tick_rate(&self) -> TickRate {
        (**self).tick_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(HostTime(100), TickRate::MICROS);
        assert_eq!(clock.now(), HostTime(100));
        assert_eq!(clock.advance(Duration(50)), HostTime(150));
        clock.set(HostTime(400));
        assert_eq!(clock.now(), HostTime(400));
        assert_eq!(clock.tick_rate(), TickRate::MICROS);
    }

    #[test]
    fn borrowed_clock_reads_through() {
        let clock = ManualClock::new(HostTime(7), TickRate::NANOS);
        let by_ref: &ManualClock = &clock;
        clock.advance(Duration(3));
        assert_eq!(Clock::now(&by_ref), HostTime(10));
    }

    #[test]
    #[should_panic(expected = "manual clock must not go backwards")]
    fn manual_clock_rejects_rewind() {
        let clock = ManualClock::new(HostTime(100), TickRate::MICROS);
        clock.set(HostTime(99));
    }
}
