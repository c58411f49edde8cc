//! Test doubles for the hardware seams.

#![allow(dead_code)]

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_nb::serial::{self, ErrorKind};

use crate::analog::{Analog, Channel, Reference};
use crate::bus::{BusLink, RxProgress};
use crate::frame::ResponseFrame;
use crate::hal::{CompareTimer, Edge, EdgeInterrupt, InterruptGate};

/// Output pin remembering every level written; reads back the last one.
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub history: Vec<bool>,
}

impl RecordingPin {
    /// Last level written, `true` for high.
    pub fn level(&self) -> Option<bool> {
        self.history.last().copied()
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.history.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.history.push(true);
        Ok(())
    }
}

impl InputPin for RecordingPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level().unwrap_or(false))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level().unwrap_or(false))
    }
}

#[derive(Debug, Default)]
pub struct FakeTimer {
    pub now: u16,
    pub compare: u16,
    pub armed: bool,
    pub running: bool,
    pub schedules: u32,
}

impl CompareTimer for FakeTimer {
    fn now(&mut self) -> u16 {
        self.now
    }

    fn compare(&self) -> u16 {
        self.compare
    }

    fn schedule(&mut self, at: u16) {
        self.compare = at;
        self.armed = true;
        self.schedules += 1;
    }

    fn cancel(&mut self) {
        self.armed = false;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug, Default)]
pub struct FakeEdge {
    pub listening: Option<Edge>,
}

impl EdgeInterrupt for FakeEdge {
    fn listen(&mut self, edge: Edge) {
        self.listening = Some(edge);
    }

    fn unlisten(&mut self) {
        self.listening = None;
    }
}

#[derive(Debug, Default)]
pub struct CountingGate {
    pub masked: bool,
    pub masks: u32,
    pub unmasks: u32,
}

impl InterruptGate for CountingGate {
    fn mask(&mut self) {
        self.masked = true;
        self.masks += 1;
    }

    fn unmask(&mut self) {
        self.masked = false;
        self.unmasks += 1;
    }
}

/// Converter returning a repeating script of values after a fixed number
/// of `WouldBlock` polls each.
#[derive(Debug)]
pub struct ScriptedAdc {
    pub values: Vec<u16>,
    pub delay_polls: u16,
    pub configured: Option<(Channel, Reference)>,
    pub conversions: usize,
    /// Conversions after this many never complete.
    pub stuck_after: Option<usize>,
    pending: u16,
}

impl ScriptedAdc {
    pub fn new(values: &[u16], delay_polls: u16) -> Self {
        Self {
            values: values.to_vec(),
            delay_polls,
            configured: None,
            conversions: 0,
            stuck_after: None,
            pending: delay_polls,
        }
    }
}

impl Analog for ScriptedAdc {
    type Error = ();

    fn configure(&mut self, channel: Channel, reference: Reference) {
        self.configured = Some((channel, reference));
    }

    fn convert(&mut self) -> nb::Result<u16, ()> {
        if self.stuck_after.is_some_and(|n| self.conversions >= n) {
            return Err(nb::Error::WouldBlock);
        }
        if self.pending > 0 {
            self.pending -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.pending = self.delay_polls;
        let value = self.values[self.conversions % self.values.len()];
        self.conversions += 1;
        Ok(value)
    }
}

/// Bus whose subordinate reveals one scripted byte every `per_byte` polls
/// once listening.
#[derive(Debug, Default)]
pub struct FakeBus {
    pub script: Vec<u8>,
    pub per_byte: u32,
    pub polls: u32,
    pub sent: Vec<u8>,
    pub relays: u32,
    pub released: bool,
    pub listening: bool,
    pub resets: Vec<bool>,
}

impl FakeBus {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn answering(script: &[u8], per_byte: u32) -> Self {
        Self {
            script: script.to_vec(),
            per_byte,
            ..Self::default()
        }
    }

    fn revealed(&self) -> &[u8] {
        let n = match self.per_byte {
            0 => self.script.len(),
            per => (self.polls / per) as usize,
        };
        &self.script[..n.min(self.script.len())]
    }
}

impl BusLink for FakeBus {
    fn begin_relay(&mut self) {
        self.relays += 1;
        self.released = false;
    }

    fn transmit(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn listen(&mut self) {
        self.listening = true;
        self.polls = 0;
    }

    fn progress(&mut self) -> RxProgress {
        self.polls += 1;
        let bytes = self.revealed();
        RxProgress {
            len: bytes.len(),
            terminated: bytes.last() == Some(&b'\r'),
        }
    }

    fn finish(&mut self) -> ResponseFrame {
        self.listening = false;
        let mut frame = ResponseFrame::new();
        let _ = frame.extend_from_slice(self.revealed());
        frame
    }

    fn hold_reset(&mut self, asserted: bool) {
        self.resets.push(asserted);
    }
}

/// Delay that only tallies what was asked of it.
#[derive(Debug, Default)]
pub struct NoDelay {
    pub ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns += u64::from(ns);
    }
}

/// Host serial port capturing everything written.
#[derive(Debug, Default)]
pub struct HostLog {
    pub written: Vec<u8>,
    pub fail: bool,
}

impl serial::ErrorType for HostLog {
    type Error = ErrorKind;
}

impl serial::Write<u8> for HostLog {
    fn write(&mut self, word: u8) -> nb::Result<(), ErrorKind> {
        if self.fail {
            return Err(nb::Error::Other(ErrorKind::Overrun));
        }
        self.written.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), ErrorKind> {
        Ok(())
    }
}
