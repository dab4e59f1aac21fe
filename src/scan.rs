//! The periodic row task.
//!
//! [`ScanDriver::tick`] is meant to run from a timer interrupt (or a high
//! priority task) at [`ScanConfig::row_hz`]. Each call shifts the next row of
//! the main framebuffer into the driver chips, blanks the display just long
//! enough to switch the row decoder and latch, and re-enables it. The wait
//! before the latch doubles as housekeeping time: the analog sample for the
//! row is collected and, once per frame, the time-of-day clock advances.
//!
//! The application talks to the driver only through [`ScanShared`], which is
//! all atomics apart from the clock.

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::clock::{ClockState, ClockTick};
use crate::config::ScanConfig;
use crate::framebuffer::Framebuffer;
use crate::hardware::MatrixHardware;
use crate::protocol::{Bus, CHANNELS_PER_GROUP, GROUPS_PER_PANEL};
use crate::{PANEL_COLS, ROWS};

/// State shared between the scan driver and the application.
pub struct ScanShared {
    frame_ready: AtomicBool,
    frames: AtomicU32,
    dark: AtomicBool,
    samples: [AtomicU8; ROWS],
    clock: ClockState,
}

impl Default for ScanShared {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanShared {
    /// No frame yet, display at normal brightness, midnight.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame_ready: AtomicBool::new(false),
            frames: AtomicU32::new(0),
            dark: AtomicBool::new(false),
            samples: [const { AtomicU8::new(0) }; ROWS],
            clock: ClockState::new(),
        }
    }

    /// Returns `true` once after every completed frame.
    pub fn take_frame(&self) -> bool {
        self.frame_ready.swap(false, Ordering::Acquire)
    }

    /// Frames completed since start-up, wrapping.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.frames.load(Ordering::Acquire)
    }

    /// Blank each row while its data is being shifted, roughly halving the
    /// on-time.
    pub fn set_dark(&self, dark: bool) {
        self.dark.store(dark, Ordering::Relaxed);
    }

    /// Whether dark mode is on.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.dark.load(Ordering::Relaxed)
    }

    /// Last analog sample taken while `row` was selected.
    #[must_use]
    pub fn sample(&self, row: usize) -> Option<u8> {
        self.samples.get(row).map(|s| s.load(Ordering::Relaxed))
    }

    /// The last sample of every row.
    #[must_use]
    pub fn samples(&self) -> [u8; ROWS] {
        core::array::from_fn(|row| self.samples[row].load(Ordering::Relaxed))
    }

    /// The time-of-day clock.
    #[must_use]
    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    fn finish_frame(&self) {
        self.frames.fetch_add(1, Ordering::Release);
        self.frame_ready.store(true, Ordering::Release);
    }
}

impl core::fmt::Debug for ScanShared {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanShared")
            .field("frames", &self.frame_count())
            .field("dark", &self.is_dark())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Streams a framebuffer to a chain of MY9221 panels, one row per tick.
pub struct ScanDriver<'a, H, const COLS: usize, const BYTES: usize> {
    buffer: &'a Framebuffer<COLS, BYTES>,
    shared: &'a ScanShared,
    bus: Bus<H>,
    config: ScanConfig,
    row: u8,
    cursor: usize,
}

impl<'a, H, const COLS: usize, const BYTES: usize> ScanDriver<'a, H, COLS, BYTES>
where
    H: MatrixHardware,
{
    /// Number of daisy-chained panels.
    pub const PANELS: usize = COLS / PANEL_COLS;

    /// Bind a buffer and the shared state to the hardware.
    pub fn new(
        buffer: &'a Framebuffer<COLS, BYTES>,
        shared: &'a ScanShared,
        hardware: H,
        config: ScanConfig,
    ) -> Self {
        Self {
            buffer,
            shared,
            bus: Bus::new(hardware),
            config,
            row: 0,
            cursor: 0,
        }
    }

    /// Put the board into a known state before the first [`ScanDriver::tick`].
    ///
    /// Drives both bus lines low, blanks the display, selects row 0, lights
    /// the heartbeat and starts the first analog conversion.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn init(&mut self) -> Result<(), H::Error> {
        #[cfg(feature = "log")]
        log::info!(
            "argb-matrix: {} panel(s), {} Hz frames, {} Hz rows, timer reload {}",
            Self::PANELS,
            self.config.frame_rate_hz(),
            self.config.row_hz(),
            self.config.timer_reload()
        );

        self.row = 0;
        self.cursor = 0;
        self.bus.reset()?;
        let hw = self.bus.hardware();
        hw.set_display_enabled(false)?;
        hw.select_row(0)?;
        hw.set_heartbeat(true)?;
        hw.start_sample();
        Ok(())
    }

    /// Handle one row period.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware. The row and byte cursors only
    /// move once the row is latched, so a failure before that leaves them
    /// alone and the next tick resends the same row.
    pub fn tick(&mut self) -> Result<(), H::Error> {
        let timing = *self.config.timing();

        if self.shared.is_dark() {
            self.bus.hardware().set_display_enabled(false)?;
        }

        self.send_row()?;

        let hw = self.bus.hardware();
        hw.delay_us(timing.pre_blank_us);
        hw.set_display_enabled(false)?;
        hw.delay_us(timing.blank_to_select_us);
        hw.select_row(self.row)?;

        let sample = hw.read_sample();
        self.shared.samples[usize::from(self.row)].store(sample, Ordering::Relaxed);
        hw.start_sample();

        self.bus.latch(timing.latch_toggles)?;

        self.next_row()?;

        let hw = self.bus.hardware();
        hw.delay_us(timing.post_latch_us);
        hw.set_display_enabled(true)
    }

    fn send_row(&mut self) -> Result<(), H::Error> {
        let command = self.config.command();
        let buffer = self.buffer;
        let mut start = self.cursor;
        for _ in 0..Self::PANELS * GROUPS_PER_PANEL {
            self.bus.send_group(
                command,
                (start..start + CHANNELS_PER_GROUP).map(|i| buffer.load(i)),
            )?;
            start += CHANNELS_PER_GROUP;
        }
        Ok(())
    }

    fn next_row(&mut self) -> Result<(), H::Error> {
        self.row += 1;
        if usize::from(self.row) < ROWS {
            self.cursor = usize::from(self.row) * Framebuffer::<COLS, BYTES>::ROW_BYTES;
            return Ok(());
        }

        self.row = 0;
        self.cursor = 0;
        self.shared.finish_frame();

        match self.shared.clock.advance(self.config.frame_ms()) {
            ClockTick::Second => self.bus.hardware().set_heartbeat(true),
            ClockTick::Millis(ms) if ms >= self.config.heartbeat_ms() => {
                self.bus.hardware().set_heartbeat(false)
            }
            ClockTick::Millis(_) => Ok(()),
        }
    }

    /// Row that the next tick will send.
    #[must_use]
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Byte offset into the framebuffer of the next row.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Stop scanning and give the hardware back.
    pub fn release(self) -> H {
        self.bus.release()
    }
}

impl<H, const COLS: usize, const BYTES: usize> core::fmt::Debug for ScanDriver<'_, H, COLS, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanDriver")
            .field("row", &self.row)
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use embedded_hal::digital::ErrorKind;

    use super::*;
    use crate::clock::TimeOfDay;
    use crate::compute_buffer_bytes;
    use crate::mock::{Event, MockHardware};
    use crate::protocol::CommandWord;

    const TEST_COLS: usize = 16;
    const TEST_BYTES: usize = compute_buffer_bytes(TEST_COLS);

    type TestBuffer = Framebuffer<TEST_COLS, TEST_BYTES>;
    type TestDriver<'a> = ScanDriver<'a, MockHardware, TEST_COLS, TEST_BYTES>;

    fn driver<'a>(buffer: &'a TestBuffer, shared: &'a ScanShared) -> TestDriver<'a> {
        let mut driver = ScanDriver::new(buffer, shared, MockHardware::default(), ScanConfig::default());
        driver.init().unwrap();
        driver.bus.hardware().clear();
        driver
    }

    #[test]
    fn test_one_frame_flag_per_eight_rows() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        for frame in 1..=3u32 {
            for row in 0..ROWS {
                assert!(!shared.take_frame(), "early flag at row {row}");
                scan.tick().unwrap();
            }
            assert!(shared.take_frame());
            assert!(!shared.take_frame());
            assert_eq!(shared.frame_count(), frame);
        }
    }

    #[test]
    fn test_cursor_resets_with_row() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        for row in 1..ROWS {
            scan.tick().unwrap();
            assert_eq!(usize::from(scan.row()), row);
            assert_eq!(scan.cursor(), row * TestBuffer::ROW_BYTES);
        }
        scan.tick().unwrap();
        assert_eq!(scan.row(), 0);
        assert_eq!(scan.cursor(), 0);
    }

    #[test]
    fn test_row_decodes_on_the_wire() {
        let buffer = TestBuffer::new();
        for i in 0..TEST_BYTES {
            buffer.store(i, i as u8);
        }
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        scan.tick().unwrap();
        scan.bus.hardware().clear();
        scan.tick().unwrap();

        let words = scan.release().decoded_words();
        let groups = TEST_COLS / PANEL_COLS * GROUPS_PER_PANEL;
        assert_eq!(words.len(), groups * (1 + CHANNELS_PER_GROUP));

        let row_start = TestBuffer::ROW_BYTES;
        for (g, group) in words.chunks_exact(1 + CHANNELS_PER_GROUP).enumerate() {
            assert_eq!(group[0], CommandWord::DEFAULT.bits());
            for (c, &word) in group[1..].iter().enumerate() {
                let index = row_start + g * CHANNELS_PER_GROUP + c;
                assert_eq!(word, u16::from(buffer.byte(index)), "group {g} channel {c}");
            }
        }
    }

    /// Fails selected pin writes, otherwise records like [`MockHardware`].
    #[derive(Default)]
    struct FlakyHardware {
        inner: MockHardware,
        blank_failures: usize,
        clock_edges_left: Option<usize>,
    }

    impl MatrixHardware for FlakyHardware {
        type Error = ErrorKind;

        fn set_data(&mut self, high: bool) -> Result<(), Self::Error> {
            self.inner.set_data(high).map_err(|e| match e {})
        }

        fn set_clock(&mut self, high: bool) -> Result<(), Self::Error> {
            match &mut self.clock_edges_left {
                Some(0) => {
                    self.clock_edges_left = None;
                    return Err(ErrorKind::Other);
                }
                Some(left) => *left -= 1,
                None => {}
            }
            self.inner.set_clock(high).map_err(|e| match e {})
        }

        fn select_row(&mut self, row: u8) -> Result<(), Self::Error> {
            self.inner.select_row(row).map_err(|e| match e {})
        }

        fn set_display_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
            if !enabled && self.blank_failures > 0 {
                self.blank_failures -= 1;
                return Err(ErrorKind::Other);
            }
            self.inner.set_display_enabled(enabled).map_err(|e| match e {})
        }

        fn set_heartbeat(&mut self, on: bool) -> Result<(), Self::Error> {
            self.inner.set_heartbeat(on).map_err(|e| match e {})
        }

        fn read_sample(&mut self) -> u8 {
            self.inner.read_sample()
        }

        fn start_sample(&mut self) {
            self.inner.start_sample();
        }

        fn delay_us(&mut self, us: u32) {
            self.inner.delay_us(us);
        }
    }

    #[test]
    fn test_failed_blank_keeps_row_and_cursor() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = ScanDriver::new(&buffer, &shared, FlakyHardware::default(), ScanConfig::default());
        scan.init().unwrap();
        scan.tick().unwrap();

        scan.bus.hardware().blank_failures = 1;
        assert_eq!(scan.tick(), Err(ErrorKind::Other));
        assert_eq!(scan.row(), 1);
        assert_eq!(scan.cursor(), TestBuffer::ROW_BYTES);

        // the rest of the frame scans and wraps cleanly
        for row in 1..ROWS {
            assert_eq!(usize::from(scan.row()), row);
            assert_eq!(scan.cursor(), row * TestBuffer::ROW_BYTES);
            scan.tick().unwrap();
        }
        assert_eq!(scan.row(), 0);
        assert_eq!(scan.cursor(), 0);
        assert!(shared.take_frame());
        for _ in 0..ROWS {
            scan.tick().unwrap();
        }
        assert_eq!(shared.frame_count(), 2);
    }

    #[test]
    fn test_failed_shift_resends_same_row() {
        let buffer = TestBuffer::new();
        for i in 0..TEST_BYTES {
            buffer.store(i, i as u8);
        }
        let shared = ScanShared::new();
        let mut scan = ScanDriver::new(&buffer, &shared, FlakyHardware::default(), ScanConfig::default());
        scan.init().unwrap();

        // fail partway through the second group of row 0
        let group_bits = 16 * (1 + CHANNELS_PER_GROUP);
        scan.bus.hardware().clock_edges_left = Some(group_bits + 40);
        assert_eq!(scan.tick(), Err(ErrorKind::Other));
        assert_eq!(scan.row(), 0);
        assert_eq!(scan.cursor(), 0);

        scan.bus.hardware().inner.clear();
        scan.tick().unwrap();
        let words = scan.release().inner.decoded_words();
        assert_eq!(&words[1..4], &[0, 1, 2]);
        let second = &words[1 + CHANNELS_PER_GROUP..];
        assert_eq!(second[0], CommandWord::DEFAULT.bits());
        assert_eq!(second[1], u16::from(buffer.byte(CHANNELS_PER_GROUP)));
    }

    #[test]
    fn test_custom_command_word_is_sent() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let config = ScanConfig::default().with_command(CommandWord::from_bits(0x0410));
        let mut scan = ScanDriver::new(&buffer, &shared, MockHardware::default(), config);
        scan.init().unwrap();
        scan.tick().unwrap();
        let words = scan.release().decoded_words();
        assert_eq!(words[0], 0x0410);
        assert_eq!(words[1 + CHANNELS_PER_GROUP], 0x0410);
    }

    #[test]
    fn test_blank_select_latch_enable_order() {
        let buffer = TestBuffer::new();
        buffer.fill(0xFF, 0xFF, 0xFF);
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        scan.tick().unwrap();
        let hw = scan.release();

        let blank = hw.position(Event::Enable(false)).unwrap();
        let select = hw.position(Event::Row(0)).unwrap();
        assert_eq!(hw.events[blank - 1], Event::Delay(30));
        assert_eq!(hw.events[blank + 1], Event::Delay(10));
        assert!(select > blank);

        // eight data toggles with the clock untouched, right after the next conversion starts
        let start = hw.position(Event::StartSample).unwrap();
        let latch: Vec<Event> = hw.events[start + 1..start + 9].to_vec();
        assert!(latch.iter().all(|e| matches!(e, Event::Data(_))));
        for pair in latch.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(
            &hw.events[hw.events.len() - 2..],
            &[Event::Delay(30), Event::Enable(true)]
        );
        assert_eq!(hw.count(|e| matches!(e, Event::Enable(_))), 2);
    }

    #[test]
    fn test_dark_mode_blanks_before_data() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        shared.set_dark(true);
        scan.tick().unwrap();
        let hw = scan.release();
        assert_eq!(hw.events[0], Event::Enable(false));
        assert_eq!(hw.count(|e| *e == Event::Enable(false)), 2);
        assert_eq!(hw.events.last(), Some(&Event::Enable(true)));
    }

    #[test]
    fn test_samples_are_stored_per_row() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        // init started one conversion, so the first read is 1
        for _ in 0..ROWS {
            scan.tick().unwrap();
        }
        assert_eq!(shared.samples(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(shared.sample(7), Some(8));
        assert_eq!(shared.sample(ROWS), None);
    }

    #[test]
    fn test_heartbeat_follows_second() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = driver(&buffer, &shared);
        let mut beats = Vec::new();
        // 125 Hz, two seconds
        for frame in 0..250 {
            for _ in 0..ROWS {
                scan.tick().unwrap();
            }
            let hw = scan.bus.hardware();
            if let Some(Event::Heartbeat(on)) =
                hw.events.iter().rev().find(|e| matches!(e, Event::Heartbeat(_)))
            {
                beats.push((frame, *on));
            }
            hw.clear();
        }
        // off at 24 ms is the first frame past 20 ms; on again at each second
        assert_eq!(beats[0], (2, false));
        assert!(beats.contains(&(124, true)));
        assert!(beats.contains(&(127, false)));
        assert!(beats.contains(&(249, true)));
        assert_eq!(shared.clock().time_of_day(), TimeOfDay::from_seconds(2));
    }

    #[test]
    fn test_time_of_day_rolls_over() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        shared.clock().set_time_of_day(TimeOfDay::from_hms(23, 59, 59));
        let mut scan = driver(&buffer, &shared);
        for _ in 0..125 * ROWS {
            scan.tick().unwrap();
        }
        assert_eq!(shared.clock().time_of_day(), TimeOfDay::MIDNIGHT);
    }

    #[test]
    fn test_init_state() {
        let buffer = TestBuffer::new();
        let shared = ScanShared::new();
        let mut scan = ScanDriver::new(&buffer, &shared, MockHardware::default(), ScanConfig::default());
        scan.init().unwrap();
        let hw = scan.release();
        assert_eq!(
            hw.events,
            [
                Event::Data(false),
                Event::Clock(false),
                Event::Enable(false),
                Event::Row(0),
                Event::Heartbeat(true),
                Event::StartSample,
            ]
        );
        assert_eq!(TestDriver::PANELS, 2);
    }
}
