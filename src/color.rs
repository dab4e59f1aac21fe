//! Packed ARGB colors, alpha blending and the base palette.
//!
//! Colors are carried as a single `u32` laid out as `0xAARRGGBB`. On a
//! little-endian MCU the in-memory byte order is therefore B, G, R, A which is
//! the order the channels are plucked out when compositing into the
//! framebuffer.
//!
//! All blending arithmetic truncates (`>> 8`) instead of rounding, so a ratio
//! of 255 does *not* reproduce the second color exactly and a fade of 255 is
//! only a near-identity.

use bitfield::bitfield;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::pixelcolor::RgbColor;

bitfield! {
    /// 32-bit packed color with an alpha (opacity) channel.
    ///
    /// The bit layout is as follows:
    /// - Bits 31-24: Alpha, 255 = opaque, 0 = fully transparent
    /// - Bits 23-16: Red
    /// - Bits 15-8: Green
    /// - Bits 7-0: Blue
    #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct Argb(u32);
    impl Debug;
    pub u8, alpha, set_alpha: 31, 24;
    pub u8, red, set_red: 23, 16;
    pub u8, green, set_green: 15, 8;
    pub u8, blue, set_blue: 7, 0;
}

impl Argb {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(255, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Compose a color from its four channels.
    #[must_use]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Compose an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(255, r, g, b)
    }

    /// Build a color from its packed `0xAARRGGBB` value.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// The packed `0xAARRGGBB` value.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Channels in memory order: blue, green, red, alpha.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Returns a copy of this color with the alpha channel replaced.
    #[must_use]
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.set_alpha(alpha);
        self
    }

    /// `true` when drawing this color replaces the stored pixel outright.
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.alpha() == 255
    }
}

impl From<Rgb888> for Argb {
    fn from(color: Rgb888) -> Self {
        Self::rgb(color.r(), color.g(), color.b())
    }
}

impl From<Argb> for Rgb888 {
    fn from(color: Argb) -> Self {
        Rgb888::new(color.red(), color.green(), color.blue())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Argb {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Argb({=u32:#010x})", self.0);
    }
}

#[inline]
fn mix(first: u8, second: u8, ratio_first: u16, ratio_second: u16) -> u8 {
    ((ratio_first * u16::from(first) + ratio_second * u16::from(second)) >> 8) as u8
}

/// Blend two colors and optionally darken the result.
///
/// `ratio` runs from 0 (all `c1`) to 255 (all `c2`). `fade` scales both
/// weights before mixing so the result darkens toward black rather than
/// toward `c1`; 255 leaves it alone. Alpha is always mixed with the unscaled
/// ratio.
#[must_use]
pub fn blend(c1: Argb, c2: Argb, ratio: u8, fade: u8) -> Argb {
    let alpha_second = u16::from(ratio);
    let alpha_first = u16::from(!ratio);

    let (mut ratio_second, mut ratio_first) = (alpha_second, alpha_first);
    if fade != 255 {
        ratio_second = (u16::from(fade) * ratio_second) >> 8;
        ratio_first = (u16::from(fade) * ratio_first) >> 8;
    }

    Argb::new(
        mix(c1.alpha(), c2.alpha(), alpha_first, alpha_second),
        mix(c1.red(), c2.red(), ratio_first, ratio_second),
        mix(c1.green(), c2.green(), ratio_first, ratio_second),
        mix(c1.blue(), c2.blue(), ratio_first, ratio_second),
    )
}

/// Number of entries in [`BASE_PALETTE`].
pub const PALETTE_LEN: u8 = 12;

/// Primary color wheel: pure red, green and blue at 0, 4 and 8 with blends
/// in between. Green is scaled down for its higher perceived intensity.
pub const BASE_PALETTE: [Argb; PALETTE_LEN as usize] = [
    Argb(0xFFFF_0000),
    Argb(0xFFFF_2000),
    Argb(0xFFFF_8000),
    Argb(0xFF80_8000),
    Argb(0xFF00_8000),
    Argb(0xFF00_8080),
    Argb(0xFF00_80FF),
    Argb(0xFF00_20FF),
    Argb(0xFF00_00FF),
    Argb(0xFF80_00FF),
    Argb(0xFFFF_00FF),
    Argb(0xFFFF_0080),
];

/// Palette entry for `index`, wrapping modulo [`PALETTE_LEN`].
#[must_use]
pub const fn palette_color(index: u8) -> Argb {
    BASE_PALETTE[(index % PALETTE_LEN) as usize]
}

/// Blend two palette entries, see [`blend`].
#[must_use]
pub fn blend_palette(index1: u8, index2: u8, ratio: u8, fade: u8) -> Argb {
    blend(palette_color(index1), palette_color(index2), ratio, fade)
}

/// Pick a palette entry at random.
///
/// `draw` is the caller's random source: it receives the number of entries
/// and should return a uniformly distributed value below it.
#[must_use]
pub fn random_palette_color(draw: impl FnOnce(u8) -> u8) -> Argb {
    palette_color(draw(PALETTE_LEN))
}
