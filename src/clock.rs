//! Time-of-day counter kept by the scan driver.
//!
//! The scan task adds one frame period to a millisecond accumulator at the end
//! of every frame and bumps the seconds-of-day counter whenever a full second
//! has accumulated. The two values are updated together, so they live behind
//! a [`critical_section::Mutex`] that is only ever held for a couple of loads
//! and stores. Nothing else in the crate takes a lock.

use core::cell::Cell;

use critical_section::Mutex;

/// Seconds in one day; the time of day is always below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Milliseconds per second of accumulated frame time.
pub const MILLIS_PER_SECOND: u16 = 1000;

/// Seconds since midnight, in `0..SECONDS_PER_DAY`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Midnight.
    pub const MIDNIGHT: Self = Self(0);

    /// Seconds since midnight, wrapped into a single day.
    #[must_use]
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds % SECONDS_PER_DAY)
    }

    /// Build from hours, minutes and seconds, wrapped into a single day.
    #[must_use]
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self::from_seconds(hours * 3600 + minutes * 60 + seconds)
    }

    /// Seconds since midnight.
    #[must_use]
    pub const fn as_seconds(self) -> u32 {
        self.0
    }

    /// Hour of the day, 0..24.
    #[must_use]
    pub const fn hours(self) -> u32 {
        self.0 / 3600
    }

    /// Minute of the hour, 0..60.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0 / 60 % 60
    }

    /// Second of the minute, 0..60.
    #[must_use]
    pub const fn seconds(self) -> u32 {
        self.0 % 60
    }

    /// The following second, rolling over at midnight.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.0 + 1 >= SECONDS_PER_DAY {
            Self(0)
        } else {
            Self(self.0 + 1)
        }
    }
}

/// What happened to the clock at the end of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockTick {
    /// A full second elapsed and the time of day advanced.
    Second,
    /// Milliseconds accumulated so far in the current second.
    Millis(u16),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counter {
    millis: u16,
    time: TimeOfDay,
}

/// Shared clock state: millisecond accumulator plus time of day.
pub struct ClockState {
    counter: Mutex<Cell<Counter>>,
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockState {
    /// Midnight, zero milliseconds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: Mutex::new(Cell::new(Counter {
                millis: 0,
                time: TimeOfDay::MIDNIGHT,
            })),
        }
    }

    /// Set the time of day and restart the current second.
    pub fn set_time_of_day(&self, time: TimeOfDay) {
        critical_section::with(|cs| {
            self.counter.borrow(cs).set(Counter { millis: 0, time });
        });
    }

    /// Current time of day.
    #[must_use]
    pub fn time_of_day(&self) -> TimeOfDay {
        critical_section::with(|cs| self.counter.borrow(cs).get().time)
    }

    /// Milliseconds accumulated in the current second.
    #[must_use]
    pub fn millis(&self) -> u16 {
        critical_section::with(|cs| self.counter.borrow(cs).get().millis)
    }

    /// Account for one finished frame of `frame_ms` milliseconds.
    ///
    /// `frame_ms` has to divide 1000 so a second boundary is hit exactly;
    /// [`crate::config::ScanConfig`] guarantees that.
    pub fn advance(&self, frame_ms: u16) -> ClockTick {
        critical_section::with(|cs| {
            let cell = self.counter.borrow(cs);
            let mut counter = cell.get();
            counter.millis += frame_ms;
            let tick = if counter.millis >= MILLIS_PER_SECOND {
                counter.millis = 0;
                counter.time = counter.time.next();
                ClockTick::Second
            } else {
                ClockTick::Millis(counter.millis)
            };
            cell.set(counter);
            tick
        })
    }
}

impl core::fmt::Debug for ClockState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let counter = critical_section::with(|cs| self.counter.borrow(cs).get());
        f.debug_struct("ClockState")
            .field("millis", &counter.millis)
            .field("time", &counter.time)
            .finish()
    }
}
