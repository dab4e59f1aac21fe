//! Recording [`MatrixHardware`] used by the unit tests.

extern crate std;

use core::convert::Infallible;
use std::vec::Vec;

use crate::hardware::MatrixHardware;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Data(bool),
    Clock(bool),
    Row(u8),
    Enable(bool),
    Heartbeat(bool),
    ReadSample,
    StartSample,
    Delay(u32),
}

/// Records every call and decodes the bit stream on each clock edge.
#[derive(Debug, Default)]
pub(crate) struct MockHardware {
    pub events: Vec<Event>,
    bits: Vec<bool>,
    clock: bool,
    data: bool,
    /// Value returned by the next `read_sample`; bumped on every start.
    pub sample: u8,
}

impl MockHardware {
    pub fn clock_toggles(&self) -> usize {
        self.bits.len()
    }

    /// Data level seen at every clock edge.
    pub fn decoded_bits(&self) -> Vec<bool> {
        self.bits.clone()
    }

    /// The bit stream packed into 16-bit words, MSB first.
    pub fn decoded_words(&self) -> Vec<u16> {
        self.bits
            .chunks_exact(16)
            .map(|chunk| chunk.iter().fold(0u16, |w, &b| (w << 1) | u16::from(b)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.bits.clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events.iter().position(|e| *e == event)
    }
}

impl MatrixHardware for MockHardware {
    type Error = Infallible;

    fn set_data(&mut self, high: bool) -> Result<(), Self::Error> {
        self.data = high;
        self.events.push(Event::Data(high));
        Ok(())
    }

    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error> {
        if high != self.clock {
            self.bits.push(self.data);
        }
        self.clock = high;
        self.events.push(Event::Clock(high));
        Ok(())
    }

    fn select_row(&mut self, row: u8) -> Result<(), Self::Error> {
        self.events.push(Event::Row(row));
        Ok(())
    }

    fn set_display_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.events.push(Event::Enable(enabled));
        Ok(())
    }

    fn set_heartbeat(&mut self, on: bool) -> Result<(), Self::Error> {
        self.events.push(Event::Heartbeat(on));
        Ok(())
    }

    fn read_sample(&mut self) -> u8 {
        self.events.push(Event::ReadSample);
        self.sample
    }

    fn start_sample(&mut self) {
        self.events.push(Event::StartSample);
        self.sample = self.sample.wrapping_add(1);
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(Event::Delay(us));
    }
}
