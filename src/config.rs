//! Scan timing configuration.
//!
//! Everything time-related that the scan driver needs is derived here from
//! two numbers: the CPU (timer input) clock and the frame rate. The row timer
//! fires `frame_rate * ROWS` times per second and the time-of-day counter
//! advances by whole frame periods, so the frame period has to divide one
//! second exactly. 100 Hz (10 ms, more time for the application) and 125 Hz
//! (8 ms, less flicker) are the usual choices.

use derive_more::{Display, Error};

use crate::protocol::CommandWord;
use crate::ROWS;

/// Default frame rate in Hz.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 125;

/// Default CPU clock in Hz, a 16 MHz AVR class board.
pub const DEFAULT_CPU_HZ: u32 = 16_000_000;

/// Default time the heartbeat indicator stays lit after each second, in ms.
pub const DEFAULT_HEARTBEAT_MS: u16 = 20;

/// Reasons a [`ScanConfig`] can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum ConfigError {
    /// A frame rate of zero was requested.
    #[display("frame rate must be non-zero")]
    ZeroFrameRate,
    /// The frame period is not a whole divisor of one second.
    #[display("frame rate {frame_rate_hz} Hz does not divide one second into whole milliseconds")]
    UnevenFramePeriod {
        /// Requested frame rate.
        frame_rate_hz: u32,
    },
    /// The CPU clock cannot produce the row interrupt rate.
    #[display("cpu clock {cpu_hz} Hz is too slow for a {row_hz} Hz row timer")]
    ClockTooSlow {
        /// Requested CPU clock.
        cpu_hz: u32,
        /// Required row interrupt rate.
        row_hz: u32,
    },
}

/// Delays around the latch, in microseconds.
///
/// The MY9221 datasheet asks for 220 µs between the last data clock and the
/// latch. In practice the time spent blanking, selecting the row and reading
/// the ADC covers most of that, and shorter waits keep the display lit for
/// longer. Anything much below these values produces ghosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LatchTiming {
    /// Wait after the last data bit before blanking.
    pub pre_blank_us: u32,
    /// Wait between blanking and switching the row select lines.
    pub blank_to_select_us: u32,
    /// Settle time after latching before the display is enabled again.
    pub post_latch_us: u32,
    /// Data line toggles, with the clock held, that latch the shifted data.
    pub latch_toggles: u8,
}

impl LatchTiming {
    /// Values known to work with the Rainbow Block boards in 8-bit mode.
    pub const MY9221: Self = Self {
        pre_blank_us: 30,
        blank_to_select_us: 10,
        post_latch_us: 30,
        latch_toggles: 8,
    };
}

impl Default for LatchTiming {
    fn default() -> Self {
        Self::MY9221
    }
}

/// Validated scan driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanConfig {
    frame_rate_hz: u32,
    cpu_hz: u32,
    timer_adjust: i32,
    timing: LatchTiming,
    command: CommandWord,
    heartbeat_ms: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            cpu_hz: DEFAULT_CPU_HZ,
            timer_adjust: 0,
            timing: LatchTiming::MY9221,
            command: CommandWord::DEFAULT,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

impl ScanConfig {
    /// Create a configuration for the given frame rate and CPU clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame period does not divide one second into
    /// whole milliseconds, or when `cpu_hz` is too slow to time rows.
    pub fn new(frame_rate_hz: u32, cpu_hz: u32) -> Result<Self, ConfigError> {
        if frame_rate_hz == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if 1000 % frame_rate_hz != 0 {
            return Err(ConfigError::UnevenFramePeriod { frame_rate_hz });
        }
        let row_hz = frame_rate_hz * ROWS as u32;
        if cpu_hz / row_hz < 2 {
            return Err(ConfigError::ClockTooSlow { cpu_hz, row_hz });
        }
        Ok(Self {
            frame_rate_hz,
            cpu_hz,
            ..Self::default()
        })
    }

    /// Trim the timer reload value by a few counts to correct for a crystal
    /// that runs slightly off.
    #[must_use]
    pub const fn with_timer_adjust(mut self, adjust: i32) -> Self {
        self.timer_adjust = adjust;
        self
    }

    /// Replace the latch timing.
    #[must_use]
    pub const fn with_timing(mut self, timing: LatchTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Replace the command word sent in front of every pixel group.
    #[must_use]
    pub const fn with_command(mut self, command: CommandWord) -> Self {
        self.command = command;
        self
    }

    /// How long the heartbeat stays lit after each second.
    #[must_use]
    pub const fn with_heartbeat_ms(mut self, heartbeat_ms: u16) -> Self {
        self.heartbeat_ms = heartbeat_ms;
        self
    }

    /// Frames per second.
    #[must_use]
    pub const fn frame_rate_hz(&self) -> u32 {
        self.frame_rate_hz
    }

    /// CPU clock the timer values are derived from.
    #[must_use]
    pub const fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }

    /// Length of one frame in milliseconds.
    #[must_use]
    pub const fn frame_ms(&self) -> u16 {
        (1000 / self.frame_rate_hz) as u16
    }

    /// Row interrupts per second.
    #[must_use]
    pub const fn row_hz(&self) -> u32 {
        self.frame_rate_hz * ROWS as u32
    }

    /// Row period in nanoseconds.
    #[must_use]
    pub const fn row_period_ns(&self) -> u32 {
        1_000_000_000 / self.row_hz()
    }

    /// Compare value for a clear-on-match timer with no prescaler:
    /// `cpu_hz / row_hz - 1`, plus the configured adjustment.
    #[must_use]
    pub const fn timer_reload(&self) -> u32 {
        let base = (self.cpu_hz / self.row_hz()) as i64 - 1;
        let adjusted = base + self.timer_adjust as i64;
        if adjusted < 0 {
            0
        } else {
            adjusted as u32
        }
    }

    /// Latch timing.
    #[must_use]
    pub const fn timing(&self) -> &LatchTiming {
        &self.timing
    }

    /// Command word.
    #[must_use]
    pub const fn command(&self) -> CommandWord {
        self.command
    }

    /// Heartbeat on-time in milliseconds.
    #[must_use]
    pub const fn heartbeat_ms(&self) -> u16 {
        self.heartbeat_ms
    }
}
