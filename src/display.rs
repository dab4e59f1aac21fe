//! Drawing primitives over the two framebuffers.
//!
//! A [`Display`] draws into whichever buffer is selected. The usual pattern
//! is to build a frame in the alternate buffer, then [`Display::copy_alt_to_main`]
//! right after [`crate::Matrix::take_frame`] reports the scan is back at the
//! top, or to draw straight into main for effects that fade and scroll what
//! is already on screen.
//!
//! Coordinates are signed so shapes can be partially off screen; everything
//! is clipped to the buffer. Colors carry alpha: 255 overwrites, anything
//! lower is mixed with what is already there.
//!
//! The line and circle rasterizers follow Alois Zingl, "The Beauty of
//! Bresenham's Algorithm".
//!
//! # Example
//! ```rust
//! use argb_matrix::{compute_buffer_bytes, compute_cols, Argb, Matrix};
//!
//! const COLS: usize = compute_cols(1);
//! const BYTES: usize = compute_buffer_bytes(COLS);
//! static MATRIX: Matrix<COLS, BYTES> = Matrix::new();
//!
//! let mut display = MATRIX.display();
//! display.select_alt();
//! display.clear();
//! display.fill_circle(3, 3, 3, Argb::rgb(255, 0, 0));
//! display.draw_line(0, 7, 7, 0, Argb::WHITE.with_alpha(128));
//! display.copy_alt_to_main();
//! ```

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{OriginDimensions, Size};
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::Pixel;

use crate::color::Argb;
use crate::framebuffer::Framebuffer;
use crate::glyph::{digit_glyph, printable_or_fallback, GlyphProvider, DIGIT_NONE};
use crate::ROWS;

/// Which framebuffer drawing goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Buffer {
    /// The buffer the scan driver shows.
    #[default]
    Main,
    /// The off-screen buffer.
    Alt,
}

/// Drawing context over a main and an alternate framebuffer.
pub struct Display<'a, const COLS: usize, const BYTES: usize> {
    main: &'a Framebuffer<COLS, BYTES>,
    alt: &'a Framebuffer<COLS, BYTES>,
    selected: Buffer,
}

impl<'a, const COLS: usize, const BYTES: usize> Display<'a, COLS, BYTES> {
    /// Draw into `main` until another buffer is selected.
    pub fn new(main: &'a Framebuffer<COLS, BYTES>, alt: &'a Framebuffer<COLS, BYTES>) -> Self {
        Self {
            main,
            alt,
            selected: Buffer::Main,
        }
    }

    /// Draw into the main (displayed) buffer.
    pub fn select_main(&mut self) {
        self.selected = Buffer::Main;
    }

    /// Draw into the alternate (off-screen) buffer.
    pub fn select_alt(&mut self) {
        self.selected = Buffer::Alt;
    }

    /// The buffer drawing currently goes to.
    #[must_use]
    pub fn selected(&self) -> Buffer {
        self.selected
    }

    /// The selected framebuffer.
    #[must_use]
    pub fn buffer(&self) -> &'a Framebuffer<COLS, BYTES> {
        match self.selected {
            Buffer::Main => self.main,
            Buffer::Alt => self.alt,
        }
    }

    /// Overwrite main with the contents of alt.
    pub fn copy_alt_to_main(&mut self) {
        self.main.copy_from(self.alt);
    }

    /// Overwrite alt with the contents of main.
    pub fn copy_main_to_alt(&mut self) {
        self.alt.copy_from(self.main);
    }

    /// Set the selected buffer to black.
    pub fn clear(&mut self) {
        self.buffer().clear();
    }

    /// Set every pixel of the selected buffer to `color`, ignoring alpha.
    pub fn fill(&mut self, color: Argb) {
        self.buffer().fill(color.red(), color.green(), color.blue());
    }

    /// Darken the selected buffer: every channel becomes `scale * v / 256`.
    pub fn fade(&mut self, scale: u8) {
        self.buffer().fade(scale);
    }

    /// Shift the selected buffer `steps` columns left, blacking the right edge.
    pub fn scroll_left(&mut self, steps: usize) {
        self.buffer().scroll_left(steps);
    }

    #[inline]
    fn clip(x: i64, y: i64) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < COLS && y < ROWS).then_some((x, y))
    }

    fn plot(&self, x: usize, y: usize, color: Argb) {
        let fb = self.buffer();
        let at = Framebuffer::<COLS, BYTES>::offset(x, y);
        let channels = [color.red(), color.green(), color.blue()];

        let alpha = color.alpha();
        if alpha == u8::MAX {
            for (i, value) in channels.into_iter().enumerate() {
                fb.store(at + i, value);
            }
            return;
        }

        let weight = u16::from(alpha);
        let keep = u16::from(!alpha);
        for (i, value) in channels.into_iter().enumerate() {
            let old = u16::from(fb.load(at + i));
            fb.store(at + i, ((keep * old + weight * u16::from(value)) >> 8) as u8);
        }
    }

    #[inline]
    fn plot_clipped(&self, x: i64, y: i64, color: Argb) {
        if let Some((x, y)) = Self::clip(x, y) {
            self.plot(x, y, color);
        }
    }

    /// Draw one pixel, mixing by the color's alpha. Off-screen pixels are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Argb) {
        self.plot_clipped(i64::from(x), i64::from(y), color);
    }

    /// Read back a pixel of the selected buffer as an opaque color.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Argb> {
        let (x, y) = Self::clip(i64::from(x), i64::from(y))?;
        let [r, g, b] = self.buffer().pixel(x, y)?;
        Some(Argb::rgb(r, g, b))
    }

    /// Clamp the half-open span `start..start + len` to `0..limit`.
    fn span(start: i32, len: u32, limit: usize) -> core::ops::Range<usize> {
        let end = (i64::from(start) + i64::from(len)).min(limit as i64);
        let start = i64::from(start).max(0);
        if start >= end {
            return 0..0;
        }
        start as usize..end as usize
    }

    /// Horizontal line of `len` pixels starting at (x, y) and going right.
    pub fn hline(&mut self, x: i32, y: i32, len: u32, color: Argb) {
        let Ok(y) = usize::try_from(y) else { return };
        if y >= ROWS {
            return;
        }
        for x in Self::span(x, len, COLS) {
            self.plot(x, y, color);
        }
    }

    /// Vertical line of `len` pixels starting at (x, y) and going down.
    pub fn vline(&mut self, x: i32, y: i32, len: u32, color: Argb) {
        let Ok(x) = usize::try_from(x) else { return };
        if x >= COLS {
            return;
        }
        for y in Self::span(y, len, ROWS) {
            self.plot(x, y, color);
        }
    }

    /// Rectangle outline through two opposite corners, both inclusive.
    ///
    /// No pixel is drawn twice, so translucent outlines blend evenly.
    pub fn draw_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Argb) {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        let width = left.abs_diff(right).saturating_add(1);
        let height = top.abs_diff(bottom).saturating_add(1);

        self.hline(left, top, width, color);
        if bottom != top {
            self.hline(left, bottom, width, color);
        }
        if height > 2 {
            self.vline(left, top + 1, height - 2, color);
            if right != left {
                self.vline(right, top + 1, height - 2, color);
            }
        }
    }

    /// Filled `width` by `height` rectangle with its top-left corner at (x, y).
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Argb) {
        let cols = Self::span(x, width, COLS);
        for y in Self::span(y, height, ROWS) {
            for x in cols.clone() {
                self.plot(x, y, color);
            }
        }
    }

    /// Circle outline of radius `r` around (cx, cy).
    pub fn draw_circle(&mut self, cx: i32, cy: i32, r: u8, color: Argb) {
        let (cx, cy) = (i64::from(cx), i64::from(cy));
        let mut x = -i64::from(r);
        let mut y = 0;
        let mut err = 2 - 2 * i64::from(r);
        loop {
            // the four quadrants, skipping repeats on the axes
            self.plot_clipped(cx - x, cy + y, color);
            if x != 0 {
                self.plot_clipped(cx + x, cy + y, color);
            }
            if y != 0 {
                self.plot_clipped(cx + x, cy - y, color);
                if x != 0 {
                    self.plot_clipped(cx - x, cy - y, color);
                }
            }

            let mut e2 = err;
            if e2 <= y {
                y += 1;
                err += y * 2 + 1;
                if -x == y && e2 <= x {
                    e2 = 0;
                }
            }
            if e2 > x {
                x += 1;
                err += x * 2 + 1;
            }
            if x > 0 {
                break;
            }
        }
    }

    /// Filled circle of radius `r` around (cx, cy).
    ///
    /// Steps exactly like [`Display::draw_circle`], so the fill covers the
    /// outline. Each column pair is drawn once, when the outline leaves it.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: u8, color: Argb) {
        let (cx, cy) = (i64::from(cx), i64::from(cy));
        let mut x = -i64::from(r);
        let mut y = 0;
        let mut err = 2 - 2 * i64::from(r);
        loop {
            let (column, reach) = (x, y);

            let mut e2 = err;
            if e2 <= y {
                y += 1;
                err += y * 2 + 1;
                if -x == y && e2 <= x {
                    e2 = 0;
                }
            }
            if e2 > x {
                x += 1;
                err += x * 2 + 1;
                self.column_span(cx - column, cy - reach, cy + reach, color);
                if column != 0 {
                    self.column_span(cx + column, cy - reach, cy + reach, color);
                }
            }
            if x > 0 {
                break;
            }
        }
    }

    fn column_span(&self, x: i64, top: i64, bottom: i64, color: Argb) {
        let Some(x) = usize::try_from(x).ok().filter(|&x| x < COLS) else {
            return;
        };
        let top = top.max(0);
        let bottom = bottom.min(ROWS as i64 - 1);
        for y in top..=bottom {
            self.plot(x, y as usize, color);
        }
    }

    /// Line from (x0, y0) to (x1, y1), both ends included.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Argb) {
        let (mut x, mut y) = (i64::from(x0), i64::from(y0));
        let (x1, y1) = (i64::from(x1), i64::from(y1));
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot_clipped(x, y, color);
            let e2 = 2 * err;
            if e2 >= dy {
                if x == x1 {
                    break;
                }
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                if y == y1 {
                    break;
                }
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw an 8x8 character with its top-left corner at (x, y).
    ///
    /// Bytes outside printable ASCII draw as `-`. Returns the index of the
    /// glyph's rightmost lit column, which is the advance to the next
    /// character minus the gap.
    pub fn draw_char<F>(&mut self, ascii: u8, x: i32, y: i32, color: Argb, font: &F) -> u8
    where
        F: GlyphProvider + ?Sized,
    {
        let glyph = font.glyph(printable_or_fallback(ascii));
        for (i, &column) in glyph.iter().enumerate() {
            self.draw_strip(i64::from(x) + i as i64, i64::from(y), column, color);
        }
        glyph.iter().rposition(|&column| column != 0).unwrap_or(0) as u8
    }

    fn draw_strip(&self, x: i64, y: i64, bits: u8, color: Argb) {
        if bits == 0 {
            return;
        }
        for row in 0..8 {
            if bits & (1 << row) != 0 {
                self.plot_clipped(x, y + row, color);
            }
        }
    }

    /// Draw a narrow 3x5 clock digit: 0-9, [`crate::glyph::DIGIT_COLON`],
    /// [`crate::glyph::DIGIT_HOURS`] or [`crate::glyph::DIGIT_MINUTES`].
    /// Other values draw nothing.
    pub fn draw_digit(&mut self, digit: u8, x: i32, y: i32, color: Argb) {
        let Some(strips) = digit_glyph(digit) else {
            return;
        };
        for (i, &bits) in strips.iter().enumerate() {
            self.draw_strip(i64::from(x) + i as i64, i64::from(y), bits, color);
        }
    }

    /// Roll from `digit1` to `digit2` as `blend` goes from 0 to 255.
    ///
    /// The old digit moves up out of the way while the new one follows from
    /// below. Equal digits do not move; [`DIGIT_NONE`] draws nothing in its
    /// place.
    pub fn blend_digits(&mut self, digit1: u8, digit2: u8, blend: u8, x: i32, y: i32, color: Argb) {
        let blend = if digit1 == digit2 { 0 } else { blend };
        let shift = i32::from(blend / 32);

        if digit1 != DIGIT_NONE {
            self.draw_digit(digit1, x, y - shift, color);
        }
        if blend != 0 && digit2 != DIGIT_NONE {
            self.draw_digit(digit2, x, y - shift + 7, color);
        }
    }
}

impl<const COLS: usize, const BYTES: usize> OriginDimensions for Display<'_, COLS, BYTES> {
    fn size(&self) -> Size {
        Size::new(COLS as u32, ROWS as u32)
    }
}

impl<const COLS: usize, const BYTES: usize> DrawTarget for Display<'_, COLS, BYTES> {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.into());
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_rect(
            area.top_left.x,
            area.top_left.y,
            area.size.width,
            area.size.height,
            color.into(),
        );
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.into());
        Ok(())
    }
}

impl<const COLS: usize, const BYTES: usize> core::fmt::Debug for Display<'_, COLS, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Display")
            .field("cols", &COLS)
            .field("rows", &ROWS)
            .field("selected", &self.selected)
            .finish()
    }
}
