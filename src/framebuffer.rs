//! Raw pixel storage in MY9221 wire order.
//!
//! # Memory Layout
//! Pixels are stored row by row, top row first. Within a row the columns run
//! **right to left** (stored index 0 is the rightmost column) and every pixel
//! is three bytes R, G, B. This is exactly the order the driver chips expect
//! the channel data to be shifted in, so the scan driver streams the buffer
//! front to back without any transformation.
//!
//! # Sharing
//! The main buffer is read by the scan task while the application draws into
//! it. Every byte is a relaxed [`AtomicU8`] so that concurrent access never
//! becomes undefined behavior; on the targets this runs on a relaxed byte
//! load/store compiles to a plain load/store. There is no lock:
//! an application racing the scan cursor can at worst show a half-updated
//! row for one frame.

use embedded_dma::ReadBuffer;
use portable_atomic::{AtomicU8, Ordering};

use crate::ROWS;

/// Bytes per stored pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// One of the two display buffers.
///
/// # Type Parameters
/// - `COLS`: Number of columns, 8 per panel (see [`crate::compute_cols`])
/// - `BYTES`: Buffer size, `COLS * ROWS * 3` (see [`crate::compute_buffer_bytes`])
pub struct Framebuffer<const COLS: usize, const BYTES: usize> {
    data: [AtomicU8; BYTES],
}

impl<const COLS: usize, const BYTES: usize> Default for Framebuffer<COLS, BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const COLS: usize, const BYTES: usize> Framebuffer<COLS, BYTES> {
    const LAYOUT_OK: () = assert!(
        COLS > 0 && COLS % 8 == 0 && BYTES == COLS * ROWS * BYTES_PER_PIXEL,
        "BYTES must equal COLS * ROWS * 3 and COLS must be a multiple of 8"
    );

    /// Bytes in one row.
    pub const ROW_BYTES: usize = COLS * BYTES_PER_PIXEL;

    /// Create a black framebuffer.
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::LAYOUT_OK;
        Self {
            data: [const { AtomicU8::new(0) }; BYTES],
        }
    }

    /// Offset of the red byte of pixel (x, y).
    ///
    /// Callers guarantee `x < COLS` and `y < ROWS`.
    #[inline]
    pub(crate) const fn offset(x: usize, y: usize) -> usize {
        BYTES_PER_PIXEL * ((COLS - 1 - x) + y * COLS)
    }

    #[inline]
    pub(crate) fn load(&self, index: usize) -> u8 {
        self.data[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn store(&self, index: usize, value: u8) {
        self.data[index].store(value, Ordering::Relaxed);
    }

    /// Read pixel (x, y) as `[r, g, b]`, `None` when off the buffer.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= COLS || y >= ROWS {
            return None;
        }
        let at = Self::offset(x, y);
        Some([self.load(at), self.load(at + 1), self.load(at + 2)])
    }

    /// Read the byte at `index` of the wire-ordered stream.
    #[must_use]
    pub fn byte(&self, index: usize) -> u8 {
        self.load(index)
    }

    /// Snapshot of the whole wire-ordered stream.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; BYTES] {
        core::array::from_fn(|i| self.load(i))
    }

    /// Set every byte to zero.
    pub fn clear(&self) {
        for byte in &self.data {
            byte.store(0, Ordering::Relaxed);
        }
    }

    /// Set every pixel to the same color, ignoring any alpha.
    pub fn fill(&self, r: u8, g: u8, b: u8) {
        for pixel in self.data.chunks_exact(BYTES_PER_PIXEL) {
            pixel[0].store(r, Ordering::Relaxed);
            pixel[1].store(g, Ordering::Relaxed);
            pixel[2].store(b, Ordering::Relaxed);
        }
    }

    /// Scale every channel by `scale / 256`.
    pub fn fade(&self, scale: u8) {
        let scale = u16::from(scale);
        for byte in &self.data {
            let v = u16::from(byte.load(Ordering::Relaxed));
            byte.store(((scale * v) >> 8) as u8, Ordering::Relaxed);
        }
    }

    /// Move every row's content `steps` columns to the left.
    ///
    /// The rightmost `steps` columns become black. A shift of the full width
    /// or more clears the buffer.
    pub fn scroll_left(&self, steps: usize) {
        if steps >= COLS {
            self.clear();
            return;
        }
        let shift = steps * BYTES_PER_PIXEL;
        for row in self.data.chunks_exact(Self::ROW_BYTES) {
            // leftmost pixel sits at the end of the row, walk toward the start
            for i in (shift..Self::ROW_BYTES).rev() {
                row[i].store(row[i - shift].load(Ordering::Relaxed), Ordering::Relaxed);
            }
            for byte in &row[..shift] {
                byte.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Copy the full contents of `other` into this buffer.
    pub fn copy_from(&self, other: &Self) {
        for (dst, src) in self.data.iter().zip(other.data.iter()) {
            dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }
}

unsafe impl<const COLS: usize, const BYTES: usize> ReadBuffer for &Framebuffer<COLS, BYTES> {
    type Word = u8;

    unsafe fn read_buffer(&self) -> (*const u8, usize) {
        // AtomicU8 has the same in-memory representation as u8
        (self.data.as_ptr().cast::<u8>(), BYTES)
    }
}

impl<const COLS: usize, const BYTES: usize> core::fmt::Debug for Framebuffer<COLS, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("cols", &COLS)
            .field("rows", &ROWS)
            .field("size", &BYTES)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<const COLS: usize, const BYTES: usize> defmt::Format for Framebuffer<COLS, BYTES> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Framebuffer<{}, {}>", COLS, BYTES);
    }
}
