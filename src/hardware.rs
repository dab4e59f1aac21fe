//! The boundary between the scan driver and the physical board.
//!
//! [`MatrixHardware`] is the narrow set of operations the scan task needs:
//! two bus lines, the row decoder, the display enable, a heartbeat indicator,
//! one analog input and a microsecond delay. [`GpioHardware`] binds it to
//! `embedded-hal` pins so the same protocol code runs on any HAL, and tests
//! drive it with a recording mock instead.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, OutputPin, PinState};

/// Operations the scan driver performs on the board.
pub trait MatrixHardware {
    /// Error reported by the pins.
    type Error;

    /// Drive the serial data line.
    fn set_data(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Drive the serial clock line. The driver chips sample on both edges.
    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Drive the 3-bit row decoder.
    fn select_row(&mut self, row: u8) -> Result<(), Self::Error>;

    /// Light (`true`) or blank (`false`) the selected row.
    fn set_display_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Switch the once-per-second heartbeat indicator.
    fn set_heartbeat(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Result of the analog conversion started on the previous row.
    fn read_sample(&mut self) -> u8;

    /// Start the next analog conversion.
    fn start_sample(&mut self);

    /// Busy-wait for `us` microseconds.
    fn delay_us(&mut self, us: u32);
}

impl<T: MatrixHardware + ?Sized> MatrixHardware for &mut T {
    type Error = T::Error;

    fn set_data(&mut self, high: bool) -> Result<(), Self::Error> {
        T::set_data(self, high)
    }

    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error> {
        T::set_clock(self, high)
    }

    fn select_row(&mut self, row: u8) -> Result<(), Self::Error> {
        T::select_row(self, row)
    }

    fn set_display_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        T::set_display_enabled(self, enabled)
    }

    fn set_heartbeat(&mut self, on: bool) -> Result<(), Self::Error> {
        T::set_heartbeat(self, on)
    }

    fn read_sample(&mut self) -> u8 {
        T::read_sample(self)
    }

    fn start_sample(&mut self) {
        T::start_sample(self);
    }

    fn delay_us(&mut self, us: u32) {
        T::delay_us(self, us);
    }
}

/// A free-running 8-bit analog input.
///
/// `embedded-hal` 1.0 has no ADC trait, so HAL specific converters are
/// wrapped in this. Conversions are started one row ahead so reading never
/// has to wait.
pub trait AnalogSampler {
    /// Last completed conversion, left adjusted to 8 bits.
    fn read(&mut self) -> u8;

    /// Start a new conversion.
    fn start(&mut self);
}

/// Sampler for boards without an analog input; always reads zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSampler;

impl AnalogSampler for NoSampler {
    fn read(&mut self) -> u8 {
        0
    }

    fn start(&mut self) {}
}

/// Output pins of a Rainbow Block style board.
pub struct MatrixPins<DATA, CLK, A0, A1, A2, EN, LED> {
    /// Serial data into the first driver chip.
    pub data: DATA,
    /// Serial clock.
    pub clock: CLK,
    /// Row decoder bit 0.
    pub addr0: A0,
    /// Row decoder bit 1.
    pub addr1: A1,
    /// Row decoder bit 2.
    pub addr2: A2,
    /// Display enable, high lights the selected row.
    pub enable: EN,
    /// Heartbeat LED.
    pub heartbeat: LED,
}

/// [`MatrixHardware`] on top of `embedded-hal` pins.
pub struct GpioHardware<DATA, CLK, A0, A1, A2, EN, LED, D, S> {
    pins: MatrixPins<DATA, CLK, A0, A1, A2, EN, LED>,
    delay: D,
    sampler: S,
}

impl<DATA, CLK, A0, A1, A2, EN, LED, D, S> GpioHardware<DATA, CLK, A0, A1, A2, EN, LED, D, S>
where
    DATA: OutputPin,
    CLK: OutputPin,
    A0: OutputPin,
    A1: OutputPin,
    A2: OutputPin,
    EN: OutputPin,
    LED: OutputPin,
    D: DelayNs,
    S: AnalogSampler,
{
    /// Bind the pins, a delay provider and an analog sampler.
    pub fn new(pins: MatrixPins<DATA, CLK, A0, A1, A2, EN, LED>, delay: D, sampler: S) -> Self {
        Self {
            pins,
            delay,
            sampler,
        }
    }

    /// Give the pins, delay and sampler back.
    pub fn release(self) -> (MatrixPins<DATA, CLK, A0, A1, A2, EN, LED>, D, S) {
        (self.pins, self.delay, self.sampler)
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), ErrorKind> {
    pin.set_state(PinState::from(high)).map_err(|e| e.kind())
}

impl<DATA, CLK, A0, A1, A2, EN, LED, D, S> MatrixHardware
    for GpioHardware<DATA, CLK, A0, A1, A2, EN, LED, D, S>
where
    DATA: OutputPin,
    CLK: OutputPin,
    A0: OutputPin,
    A1: OutputPin,
    A2: OutputPin,
    EN: OutputPin,
    LED: OutputPin,
    D: DelayNs,
    S: AnalogSampler,
{
    type Error = ErrorKind;

    #[inline]
    fn set_data(&mut self, high: bool) -> Result<(), Self::Error> {
        drive(&mut self.pins.data, high)
    }

    #[inline]
    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error> {
        drive(&mut self.pins.clock, high)
    }

    fn select_row(&mut self, row: u8) -> Result<(), Self::Error> {
        drive(&mut self.pins.addr0, row & 1 != 0)?;
        drive(&mut self.pins.addr1, row & 2 != 0)?;
        drive(&mut self.pins.addr2, row & 4 != 0)
    }

    fn set_display_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        drive(&mut self.pins.enable, enabled)
    }

    fn set_heartbeat(&mut self, on: bool) -> Result<(), Self::Error> {
        drive(&mut self.pins.heartbeat, on)
    }

    fn read_sample(&mut self) -> u8 {
        self.sampler.read()
    }

    fn start_sample(&mut self) {
        self.sampler.start();
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
