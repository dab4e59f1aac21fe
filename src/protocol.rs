//! MY9221 serial protocol.
//!
//! The MY9221 is a 12 channel constant current LED driver with a two wire
//! (DI/DCKI) input. Data is shifted in MSB first and the chip samples DI on
//! **both** edges of DCKI, so one bit costs a single clock toggle rather than a
//! full pulse. One transfer ("pixel group") is 208 bits:
//!
//! | bits | content                                     |
//! |------|---------------------------------------------|
//! | 16   | command word, see [`CommandWord`]           |
//! | 12×16| channel data, 4 pixels × R, G, B            |
//!
//! In 8-bit grayscale mode the upper byte of every channel word is zero. Each
//! Rainbow Block panel has two chips in a chain, so a panel row of 8 pixels is
//! two groups. After the last group the data is latched into the output stage
//! by toggling DI 8 times while DCKI is held steady.

use bitfield::bitfield;

use crate::hardware::MatrixHardware;

/// Pixels sent after one command word.
pub const PIXELS_PER_GROUP: usize = 4;

/// Channel words sent after one command word.
pub const CHANNELS_PER_GROUP: usize = PIXELS_PER_GROUP * 3;

/// Pixel groups per panel row.
pub const GROUPS_PER_PANEL: usize = 2;

/// Bits in a command or channel word.
pub const WORD_BITS: u32 = 16;

bitfield! {
    /// 16-bit command word sent in front of every pixel group.
    ///
    /// The bit layout is as follows:
    /// - Bits 15-11: Reserved, zero
    /// - Bit 10: High speed mode
    /// - Bits 9-8: Grayscale resolution, 0 = 8-bit
    /// - Bits 7-5: Grayscale clock divider
    /// - Bit 4: Separated (APDM) PWM waveform
    /// - Bit 3: External grayscale clock
    /// - Bit 2: Output polarity
    /// - Bit 1: Counter reset mode
    /// - Bit 0: One-shot mode
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct CommandWord(u16);
    impl Debug;
    pub high_speed, set_high_speed: 10;
    pub u8, grayscale, set_grayscale: 9, 8;
    pub u8, clock_divider, set_clock_divider: 7, 5;
    pub separated_pwm, set_separated_pwm: 4;
    pub external_clock, set_external_clock: 3;
    pub inverted_polarity, set_inverted_polarity: 2;
    pub counter_reset, set_counter_reset: 1;
    pub one_shot, set_one_shot: 0;
}

impl CommandWord {
    /// 8-bit grayscale with the APDM waveform, which flickers least.
    ///
    /// High speed mode did not help and 12-bit grayscale is too slow to shift
    /// at the row rate, so neither is used.
    pub const DEFAULT: Self = Self(0x0010);

    /// Wrap a raw command value.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// The raw command value.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl Default for CommandWord {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandWord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "CommandWord({=u16:#06x})", self.0);
    }
}

/// Bit-banged MY9221 bus.
///
/// Keeps track of the current clock and data levels so a bit can be sent as
/// a single clock toggle and the latch sequence can toggle the data line.
#[derive(Debug)]
pub struct Bus<H> {
    hw: H,
    clock: bool,
    data: bool,
}

impl<H: MatrixHardware> Bus<H> {
    /// Wrap the hardware. Call [`Bus::reset`] before the first transfer.
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            clock: false,
            data: false,
        }
    }

    /// Drive both lines low.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn reset(&mut self) -> Result<(), H::Error> {
        self.hw.set_data(false)?;
        self.hw.set_clock(false)?;
        self.data = false;
        self.clock = false;
        Ok(())
    }

    #[inline]
    fn set_data(&mut self, high: bool) -> Result<(), H::Error> {
        if self.data != high {
            self.hw.set_data(high)?;
            self.data = high;
        }
        Ok(())
    }

    #[inline]
    fn toggle_clock(&mut self) -> Result<(), H::Error> {
        self.hw.set_clock(!self.clock)?;
        self.clock = !self.clock;
        Ok(())
    }

    /// Shift out a 16-bit word, MSB first.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn send_word(&mut self, word: u16) -> Result<(), H::Error> {
        for bit in (0..WORD_BITS).rev() {
            self.set_data(word & (1 << bit) != 0)?;
            self.toggle_clock()?;
        }
        Ok(())
    }

    /// Shift out one 8-bit channel value as a 16-bit word.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn send_channel(&mut self, value: u8) -> Result<(), H::Error> {
        // top byte is always zero
        self.set_data(false)?;
        for _ in 0..8 {
            self.toggle_clock()?;
        }
        for bit in (0..8).rev() {
            self.set_data(value & (1 << bit) != 0)?;
            self.toggle_clock()?;
        }
        Ok(())
    }

    /// Shift out one pixel group: the command word then 12 channel values.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn send_group(
        &mut self,
        command: CommandWord,
        channels: impl IntoIterator<Item = u8>,
    ) -> Result<(), H::Error> {
        self.send_word(command.bits())?;
        for value in channels.into_iter().take(CHANNELS_PER_GROUP) {
            self.send_channel(value)?;
        }
        Ok(())
    }

    /// Latch the shifted data by toggling the data line with the clock held.
    ///
    /// # Errors
    ///
    /// Propagates pin errors from the hardware.
    pub fn latch(&mut self, toggles: u8) -> Result<(), H::Error> {
        for _ in 0..toggles {
            self.set_data(!self.data)?;
        }
        Ok(())
    }

    /// The wrapped hardware.
    pub fn hardware(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Unwrap the hardware.
    pub fn release(self) -> H {
        self.hw
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::mock::{Event, MockHardware};

    #[test]
    fn test_command_word_fields() {
        let cmd = CommandWord::DEFAULT;
        assert_eq!(cmd.bits(), 0x0010);
        assert!(cmd.separated_pwm());
        assert!(!cmd.high_speed());
        assert_eq!(cmd.grayscale(), 0);

        let mut cmd = CommandWord::from_bits(0);
        cmd.set_high_speed(true);
        assert_eq!(cmd.bits(), 0x0400);
        cmd.set_grayscale(1);
        assert_eq!(cmd.bits(), 0x0500);
        cmd.set_clock_divider(0b111);
        assert_eq!(cmd.bits() & 0x00E0, 0x00E0);
        cmd.set_one_shot(true);
        assert_eq!(cmd.bits() & 1, 1);
        assert_eq!(CommandWord::default(), CommandWord::DEFAULT);
    }

    #[test]
    fn test_send_word_is_msb_first_one_toggle_per_bit() {
        let mut bus = Bus::new(MockHardware::default());
        bus.reset().unwrap();
        bus.send_word(0x8001).unwrap();
        let hw = bus.release();
        assert_eq!(hw.clock_toggles(), 16);
        assert_eq!(hw.decoded_bits(), {
            let mut bits = vec![false; 16];
            bits[0] = true;
            bits[15] = true;
            bits
        });
    }

    #[test]
    fn test_send_channel_has_zero_high_byte() {
        let mut bus = Bus::new(MockHardware::default());
        bus.reset().unwrap();
        bus.send_channel(0xA5).unwrap();
        let hw = bus.release();
        assert_eq!(hw.decoded_words(), vec![0x00A5]);
    }

    #[test]
    fn test_send_group_layout() {
        let mut bus = Bus::new(MockHardware::default());
        bus.reset().unwrap();
        bus.send_group(CommandWord::DEFAULT, 1..=12).unwrap();
        let words = bus.release().decoded_words();
        let mut want = vec![0x0010];
        want.extend(1..=12u16);
        assert_eq!(words, want);
        assert_eq!(words.len() as u32 * WORD_BITS, 208);
    }

    #[test]
    fn test_latch_toggles_data_only() {
        let mut bus = Bus::new(MockHardware::default());
        bus.reset().unwrap();
        bus.send_word(0xFFFF).unwrap();
        let hw = bus.hardware();
        hw.events.clear();
        bus.latch(8).unwrap();
        let events: Vec<Event> = bus.release().events;
        assert_eq!(events.len(), 8);
        let mut level = true;
        for event in events {
            level = !level;
            assert_eq!(event, Event::Data(level));
        }
    }
}
