//! Half-duplex software UART on the single-wire subordinate bus.
//!
//! This module provides [`SoftUart`], which bit-bangs 8N1 frames at 9600 baud
//! over one output pin (driving the bus) and one input pin (sensing it),
//! clocked by a compare-timer interrupt and synchronised to incoming frames
//! by a GPIO edge interrupt.
//!
//! The engine never blocks. Interrupt handlers call
//! [`on_timer`](SoftUart::on_timer) and [`on_edge`](SoftUart::on_edge); the
//! main loop drives it through [`BusLink`](crate::bus::BusLink).
//!
//! ## Polarity
//!
//! The line driver inverts:
//! - mark (logical `1`, idle, stop bit) = pin `LOW`, bus floats high
//! - space (logical `0`, start bit) = pin `HIGH`, bus pulled low
//!
//! so a start bit is seen at the sense pin as a rising edge, and a sampled
//! pin `LOW` reads as `1`.
//!
//! ## States
//!
//! Exactly one [`LineState`] holds at any time, and in each one only one of
//! the two interrupt sources is armed:
//!
//! | State          | Armed source                         |
//! |----------------|--------------------------------------|
//! | `Idle`         | edge (rising) while listening, else none |
//! | `Transmitting` | timer                                |
//! | `Receiving`    | timer                                |
//! | `AwaitingStop` | edge (falling) or timer, per [`StopBitMode`] |

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::bus::RxProgress;
use crate::frame::ResponseFrame;
use crate::hal::{CompareTimer, Edge, EdgeInterrupt};
use crate::timer::{BIT_TIME, BIT_TIME_RX, BIT_TIME_RX_INITIAL};

/// Bits shifted out per frame: start, eight data, stop.
const FRAME_BITS: u8 = 10;

/// Samples that shift the receive register; the eighth lands in place.
const SHIFTING_SAMPLES: u8 = 7;

/// Operating state of the engine.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LineState {
    /// Not transmitting; waiting for a start bit if listening.
    #[default]
    Idle,
    /// Shifting a frame out, one bit per compare interrupt.
    Transmitting,
    /// Sampling data bits, one per compare interrupt.
    Receiving,
    /// All data bits sampled; waiting for the stop bit.
    AwaitingStop,
}

/// How the end of a received frame is detected.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum StopBitMode {
    /// Wait for the stop-bit transition on the edge interrupt and deliver
    /// the byte when it arrives. A missing stop bit goes unnoticed.
    #[default]
    EdgeSync,
    /// Sample the line one bit period after the last data bit; deliver on
    /// mark, count a framing error on space.
    Sampled,
}

/// Interrupt-driven software UART.
///
/// ## Type Parameters
///
/// - `TX`: output pin driving the bus (inverted)
/// - `RX`: input pin sensing the bus (inverted)
/// - `T`: compare timer clocking the bits
/// - `E`: edge interrupt of the `RX` pin
#[derive(Debug)]
pub struct SoftUart<TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    /// Current state.
    pub state: LineState,
    /// Bus drive pin.
    pub tx: TX,
    /// Bus sense pin.
    pub rx: RX,
    /// Bit clock.
    pub timer: T,
    /// Start and stop edge detection.
    pub edge: E,
    /// Bytes received since the last [`listen`](SoftUart::listen).
    pub response: ResponseFrame,
    /// Frames rejected for a missing stop bit ([`StopBitMode::Sampled`]).
    pub framing_errors: u16,
    /// Bytes dropped because [`response`](SoftUart::response) was full.
    pub overruns: u16,
    stop_bit: StopBitMode,
    tx_shift: u16,
    rx_shift: u8,
    bits_left: u8,
}

impl<TX, RX, T, E> SoftUart<TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    /// Creates an idle engine and drives the line to mark.
    pub fn new(tx: TX, rx: RX, timer: T, edge: E, stop_bit: StopBitMode) -> Self {
        let mut tx = tx;
        let _ = tx.set_low();
        Self {
            state: LineState::Idle,
            tx,
            rx,
            timer,
            edge,
            response: ResponseFrame::new(),
            framing_errors: 0,
            overruns: 0,
            stop_bit,
            tx_shift: 0,
            rx_shift: 0,
            bits_left: 0,
        }
    }

    fn write_line(&mut self, mark: bool) {
        if mark {
            let _ = self.tx.set_low();
        } else {
            let _ = self.tx.set_high();
        }
    }

    fn sample_line(&mut self) -> bool {
        self.rx.is_low().unwrap_or(false)
    }

    /// Whether a frame is still being shifted out.
    pub fn is_busy(&self) -> bool {
        self.state == LineState::Transmitting
    }

    /// Starts transmitting `byte` unless a previous frame is still going
    /// out.
    pub fn try_transmit(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.is_busy() {
            return Err(nb::Error::WouldBlock);
        }
        self.start_transmit(byte);
        Ok(())
    }

    /// Loads `byte` into the shift register, starts the counter and arms
    /// the first bit, abandoning any frame in progress.
    pub fn start_transmit(&mut self, byte: u8) {
        // start (0) | data LSB first | stop (1)
        self.tx_shift = (u16::from(byte) | 0x100) << 1;
        self.bits_left = FRAME_BITS;
        self.state = LineState::Transmitting;
        // finish() stops the counter after every response
        self.timer.start();
        let now = self.timer.now();
        self.timer.schedule(now.wrapping_add(BIT_TIME));
    }

    /// Disarms both interrupt sources and returns to idle at mark.
    pub fn quiesce(&mut self) {
        self.edge.unlisten();
        self.timer.cancel();
        self.write_line(true);
        self.state = LineState::Idle;
    }

    /// Drives the line to mark so the bus floats high.
    pub fn idle_line(&mut self) {
        self.write_line(true);
    }

    /// Clears the response and arms start-bit detection.
    pub fn listen(&mut self) {
        self.response.clear();
        self.rx_shift = 0;
        self.state = LineState::Idle;
        self.timer.start();
        self.edge.listen(Edge::Rising);
    }

    /// How much of the response has arrived.
    pub fn progress(&self) -> RxProgress {
        RxProgress {
            len: self.response.len(),
            terminated: self.response.is_terminated(),
        }
    }

    /// Stops reception and hands the collected response over.
    pub fn finish(&mut self) -> ResponseFrame {
        self.timer.cancel();
        self.timer.stop();
        self.edge.unlisten();
        self.state = LineState::Idle;
        core::mem::take(&mut self.response)
    }

    /// Holds the bus low (`true`) or releases it (`false`).
    pub fn hold_reset(&mut self, asserted: bool) {
        self.write_line(!asserted);
    }

    fn deliver(&mut self) {
        if self.response.push(self.rx_shift).is_err() {
            self.overruns = self.overruns.saturating_add(1);
        }
    }

    /// Compare interrupt handler.
    pub fn on_timer(&mut self) {
        match self.state {
            LineState::Transmitting => {
                if self.bits_left == 0 {
                    self.timer.cancel();
                    self.state = LineState::Idle;
                    return;
                }
                self.write_line(self.tx_shift & 1 != 0);
                self.tx_shift >>= 1;
                self.bits_left -= 1;
                let next = self.timer.compare().wrapping_add(BIT_TIME);
                self.timer.schedule(next);
            }
            LineState::Receiving => {
                if self.sample_line() {
                    self.rx_shift |= 0x80;
                }
                let next = self.timer.compare().wrapping_add(BIT_TIME_RX);
                if self.bits_left > 0 {
                    self.rx_shift >>= 1;
                    self.bits_left -= 1;
                    self.timer.schedule(next);
                    return;
                }
                self.state = LineState::AwaitingStop;
                match self.stop_bit {
                    StopBitMode::EdgeSync => {
                        self.timer.cancel();
                        self.edge.listen(Edge::Falling);
                    }
                    StopBitMode::Sampled => self.timer.schedule(next),
                }
            }
            LineState::AwaitingStop => {
                if self.sample_line() {
                    self.deliver();
                } else {
                    self.framing_errors = self.framing_errors.saturating_add(1);
                }
                self.timer.cancel();
                self.state = LineState::Idle;
                self.edge.listen(Edge::Rising);
            }
            LineState::Idle => self.timer.cancel(),
        }
    }

    /// Edge interrupt handler.
    pub fn on_edge(&mut self) {
        match self.state {
            LineState::Idle => {
                self.edge.unlisten();
                self.rx_shift = 0;
                self.bits_left = SHIFTING_SAMPLES;
                self.state = LineState::Receiving;
                let now = self.timer.now();
                self.timer.schedule(now.wrapping_add(BIT_TIME_RX_INITIAL));
            }
            LineState::AwaitingStop => {
                self.deliver();
                self.timer.cancel();
                self.state = LineState::Idle;
                self.edge.listen(Edge::Rising);
            }
            LineState::Transmitting | LineState::Receiving => self.edge.unlisten(),
        }
    }
}
