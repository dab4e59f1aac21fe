//! Alpha-blending graphics engine and scan driver for MY9221 based 8x8 RGB
//! LED panels ("Rainbow Block" and compatibles).
//!
//! ## How Rainbow Block Panels Work
//!
//! Each panel is an 8 × 8 grid of RGB LEDs driven by two MY9221 12-channel
//! constant-current chips. Only one row is lit at a time: the chips drive the
//! 24 column channels of the lit row while a 3-to-8 decoder selects which row
//! sinks the current. Several panels daisy-chain their serial data so a
//! display of `n` panels is `8n` columns wide and always 8 rows tall.
//!
//! ### Signal names
//! - **DI** – Serial data into the first chip of the chain
//! - **DCKI** – Serial clock; the chips sample DI on *both* edges, so every toggle moves one bit
//! - **A0 A1 A2** – Row decoder select lines
//! - **EN** – Row enable; the LEDs are dark while it is low
//!
//! ### Row scanning workflow
//! 1. While row N − 1 is still lit, the data for row N is shifted in: per pixel group
//!    a 16-bit command word followed by 12 channel words (4 pixels × R, G, B).
//! 2. After a short settle time EN is driven low to blank the display.
//! 3. With the display blank the decoder is switched to row N.
//! 4. The shifted data is latched into the output stage by toggling DI eight times while DCKI is held.
//! 5. After the latch settles EN goes high again, lighting row N.
//! 6. Steps 1–5 repeat for every row, 8 rows per frame, 100 or 125 frames per second.
//!
//! The chips generate the brightness PWM themselves, so unlike HUB75 panels
//! the controller only needs to send each row once per frame. Shifting a row
//! is still a few hundred clock toggles per panel, which is why it happens in
//! a timer interrupt rather than from the application.
//!
//! ## Crate Layout
//!
//! - [`Matrix`] owns the two framebuffers and the state shared with the scan
//!   task. It is `const`-constructible so it can live in a `static`.
//! - [`Display`] is the drawing API: pixels, lines, rectangles, circles, text,
//!   clock digits, fading and scrolling, all with per-pixel alpha. It also
//!   implements `embedded-graphics`' [`DrawTarget`](embedded_graphics::draw_target::DrawTarget).
//! - [`ScanDriver`] is the periodic row task. Call [`ScanDriver::tick`] from a
//!   timer running at [`ScanConfig::row_hz`].
//! - [`MatrixHardware`] is the boundary to the board; [`GpioHardware`] binds it
//!   to `embedded-hal` pins.
//! - [`Argb`], [`color::blend`] and the base palette cover color math.
//!
//! ## Frame Synchronisation
//!
//! Pixel data is never locked. The scan task reads the main buffer while the
//! application may be drawing into it; every byte is an atomic so this is
//! sound, and the worst case is a row that shows half an update for one frame.
//! For tear-free animation draw into the alternate buffer, wait for
//! [`Matrix::take_frame`] and copy the result to main while the scan is busy
//! with the top rows.
//!
//! ```rust
//! use argb_matrix::{compute_buffer_bytes, compute_cols, Argb, Matrix};
//!
//! const COLS: usize = compute_cols(2);
//! const BYTES: usize = compute_buffer_bytes(COLS);
//! static MATRIX: Matrix<COLS, BYTES> = Matrix::new();
//!
//! let mut display = MATRIX.display();
//! display.select_alt();
//! display.fill(Argb::BLACK);
//! display.draw_rect(0, 0, 15, 7, Argb::rgb(0, 0, 255));
//! if MATRIX.take_frame() {
//!     display.copy_alt_to_main();
//! }
//! ```
//!
//! ## Available Feature Flags
//!
//! ### `log` Feature
//! Logs the scan configuration through the `log` facade when the driver is
//! initialised. Nothing is logged per row.
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for the public types so they can be emitted with
//! the `defmt` logging framework. No functional changes; purely adds a trait impl.
//!
//! ### `critical-section-atomics` Feature
//! Enables `portable-atomic`'s critical-section fallback, required on targets
//! without native atomic read-modify-write instructions (AVR, Cortex-M0).
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod clock;
pub mod color;
pub mod config;
pub mod display;
pub mod framebuffer;
pub mod glyph;
pub mod hardware;
pub mod protocol;
pub mod scan;

#[cfg(test)]
mod mock;

pub use clock::TimeOfDay;
pub use color::Argb;
pub use config::{ConfigError, LatchTiming, ScanConfig};
pub use display::{Buffer, Display};
pub use framebuffer::Framebuffer;
pub use glyph::GlyphProvider;
pub use hardware::{AnalogSampler, GpioHardware, MatrixHardware, MatrixPins, NoSampler};
pub use protocol::CommandWord;
pub use scan::{ScanDriver, ScanShared};

/// Rows on every panel.
pub const ROWS: usize = 8;

/// Columns on one panel.
pub const PANEL_COLS: usize = 8;

/// Computes the display width for a chain of panels
///
/// # Arguments
///
/// * `panels` - Number of daisy-chained panels
///
/// # Returns
///
/// Number of columns, the `COLS` parameter of [`Matrix`]
#[must_use]
pub const fn compute_cols(panels: usize) -> usize {
    panels * PANEL_COLS
}

/// Computes the framebuffer size in bytes for a display width
///
/// # Arguments
///
/// * `cols` - Number of columns, see [`compute_cols`]
///
/// # Returns
///
/// Number of bytes, the `BYTES` parameter of [`Matrix`]
#[must_use]
pub const fn compute_buffer_bytes(cols: usize) -> usize {
    cols * ROWS * framebuffer::BYTES_PER_PIXEL
}

/// The device context: both framebuffers plus everything the scan task
/// shares with the application.
///
/// # Type Parameters
/// - `COLS`: Display width, 8 per panel (see [`compute_cols`])
/// - `BYTES`: Size of each framebuffer (see [`compute_buffer_bytes`])
pub struct Matrix<const COLS: usize, const BYTES: usize> {
    main: Framebuffer<COLS, BYTES>,
    alt: Framebuffer<COLS, BYTES>,
    shared: ScanShared,
}

impl<const COLS: usize, const BYTES: usize> Default for Matrix<COLS, BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const COLS: usize, const BYTES: usize> Matrix<COLS, BYTES> {
    /// Both buffers black, no frame scanned yet, clock at midnight.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            main: Framebuffer::new(),
            alt: Framebuffer::new(),
            shared: ScanShared::new(),
        }
    }

    /// A drawing context, initially drawing into the main buffer.
    #[must_use]
    pub fn display(&self) -> Display<'_, COLS, BYTES> {
        Display::new(&self.main, &self.alt)
    }

    /// A scan driver streaming the main buffer to `hardware`.
    ///
    /// Call [`ScanDriver::init`] once, then [`ScanDriver::tick`] every
    /// [`ScanConfig::row_period_ns`].
    pub fn scan_driver<H: MatrixHardware>(
        &self,
        hardware: H,
        config: ScanConfig,
    ) -> ScanDriver<'_, H, COLS, BYTES> {
        ScanDriver::new(&self.main, &self.shared, hardware, config)
    }

    /// The buffer being scanned.
    #[must_use]
    pub fn main(&self) -> &Framebuffer<COLS, BYTES> {
        &self.main
    }

    /// The off-screen buffer.
    #[must_use]
    pub fn alt(&self) -> &Framebuffer<COLS, BYTES> {
        &self.alt
    }

    /// State shared with the scan driver.
    #[must_use]
    pub fn shared(&self) -> &ScanShared {
        &self.shared
    }

    /// Set the clock to `seconds` past midnight, wrapped into one day.
    pub fn set_time_of_day(&self, seconds: u32) {
        self.shared
            .clock()
            .set_time_of_day(TimeOfDay::from_seconds(seconds));
    }

    /// Current time of day.
    #[must_use]
    pub fn time_of_day(&self) -> TimeOfDay {
        self.shared.clock().time_of_day()
    }

    /// Returns `true` once for every frame the scan driver has completed.
    pub fn take_frame(&self) -> bool {
        self.shared.take_frame()
    }

    /// Spin until the scan driver completes a frame.
    pub fn wait_frame(&self) {
        while !self.take_frame() {
            core::hint::spin_loop();
        }
    }

    /// Frames completed since start-up.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.shared.frame_count()
    }

    /// Turn dark mode on or off.
    pub fn set_dark(&self, dark: bool) {
        self.shared.set_dark(dark);
    }

    /// Last analog sample taken on `row`.
    #[must_use]
    pub fn sample(&self, row: usize) -> Option<u8> {
        self.shared.sample(row)
    }

    /// Last analog sample of every row.
    #[must_use]
    pub fn samples(&self) -> [u8; ROWS] {
        self.shared.samples()
    }
}

impl<const COLS: usize, const BYTES: usize> core::fmt::Debug for Matrix<COLS, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Matrix")
            .field("cols", &COLS)
            .field("rows", &ROWS)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt")]
impl<const COLS: usize, const BYTES: usize> defmt::Format for Matrix<COLS, BYTES> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Matrix<{}, {}>", COLS, BYTES);
    }
}
