//! Main-loop access to the subordinate bus.
//!
//! The dispatcher and the response collector talk to the bus only through
//! [`BusLink`]. On hardware the engine lives in a `critical_section` mutex
//! shared with its interrupt handlers, and [`SharedBus`] takes a short
//! critical section per call.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::frame::ResponseFrame;
use crate::hal::{CompareTimer, EdgeInterrupt};
use crate::softuart::SoftUart;
use crate::timer::TX_WAIT_LIMIT;

/// Snapshot of a response being received.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RxProgress {
    /// Bytes received so far.
    pub len: usize,
    /// Whether the last byte received is a CR.
    pub terminated: bool,
}

/// Operations the main loop performs on the bus.
pub trait BusLink {
    /// Disarms receive and transmit interrupts and drives the line to mark.
    fn begin_relay(&mut self);

    /// Sends one byte, waiting a bounded time for the previous one.
    fn transmit(&mut self, byte: u8);

    /// Waits for the last byte to leave and lets the bus float high.
    fn release(&mut self);

    /// Clears the response buffer and arms start-bit detection.
    fn listen(&mut self);

    /// Reports how much of the response has arrived.
    fn progress(&mut self) -> RxProgress;

    /// Stops receiving and returns the response.
    fn finish(&mut self) -> ResponseFrame;

    /// Holds the bus low to reset subordinates, or releases it.
    fn hold_reset(&mut self, asserted: bool);
}

/// Engine storage shared between the main loop and interrupt handlers.
pub type SharedSoftUart<TX, RX, T, E> = Mutex<RefCell<Option<SoftUart<TX, RX, T, E>>>>;

/// [`BusLink`] over a [`SoftUart`] held in a `critical_section` mutex.
///
/// Every call is a no-op (or returns an empty value) until the engine has
/// been placed in the mutex.
#[derive(Debug)]
pub struct SharedBus<'a, TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    uart: &'a SharedSoftUart<TX, RX, T, E>,
}

impl<'a, TX, RX, T, E> SharedBus<'a, TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    /// Wraps the shared engine.
    pub fn new(uart: &'a SharedSoftUart<TX, RX, T, E>) -> Self {
        Self { uart }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SoftUart<TX, RX, T, E>) -> R) -> Option<R> {
        critical_section::with(|cs| self.uart.borrow_ref_mut(cs).as_mut().map(f))
    }

    fn wait_idle(&self) -> bool {
        for _ in 0..TX_WAIT_LIMIT {
            if !self.with(|uart| uart.is_busy()).unwrap_or(false) {
                return true;
            }
        }
        false
    }
}

impl<TX, RX, T, E> BusLink for SharedBus<'_, TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    fn begin_relay(&mut self) {
        let _ = self.with(|uart| uart.quiesce());
    }

    fn transmit(&mut self, byte: u8) {
        if !self.wait_idle() {
            warn!("bus transmit wait exhausted before {}", byte);
        }
        let _ = self.with(|uart| uart.start_transmit(byte));
    }

    fn release(&mut self) {
        if !self.wait_idle() {
            warn!("bus release wait exhausted");
        }
        let _ = self.with(|uart| uart.idle_line());
    }

    fn listen(&mut self) {
        let _ = self.with(|uart| uart.listen());
    }

    fn progress(&mut self) -> RxProgress {
        self.with(|uart| uart.progress()).unwrap_or_default()
    }

    fn finish(&mut self) -> ResponseFrame {
        self.with(|uart| uart.finish()).unwrap_or_default()
    }

    fn hold_reset(&mut self, asserted: bool) {
        let _ = self.with(|uart| uart.hold_reset(asserted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softuart::{LineState, StopBitMode};
    use crate::testing::{FakeEdge, FakeTimer, RecordingPin};

    type Uart = SoftUart<RecordingPin, RecordingPin, FakeTimer, FakeEdge>;

    fn shared() -> SharedSoftUart<RecordingPin, RecordingPin, FakeTimer, FakeEdge> {
        Mutex::new(RefCell::new(None))
    }

    fn install(cell: &SharedSoftUart<RecordingPin, RecordingPin, FakeTimer, FakeEdge>) {
        let uart: Uart = SoftUart::new(
            RecordingPin::default(),
            RecordingPin::default(),
            FakeTimer::default(),
            FakeEdge::default(),
            StopBitMode::EdgeSync,
        );
        critical_section::with(|cs| {
            let _ = cell.borrow(cs).replace(Some(uart));
        });
    }

    fn inspect<R>(
        cell: &SharedSoftUart<RecordingPin, RecordingPin, FakeTimer, FakeEdge>,
        f: impl FnOnce(&mut Uart) -> R,
    ) -> R {
        critical_section::with(|cs| f(cell.borrow_ref_mut(cs).as_mut().unwrap()))
    }

    #[test]
    fn test_unset_engine_is_inert() {
        let cell = shared();
        let mut bus = SharedBus::new(&cell);
        bus.begin_relay();
        bus.transmit(b'x');
        bus.release();
        assert_eq!(bus.progress(), RxProgress::default());
        assert!(bus.finish().is_empty());
    }

    #[test]
    fn test_transmit_forces_byte_when_previous_never_finishes() {
        let cell = shared();
        install(&cell);
        let mut bus = SharedBus::new(&cell);
        bus.transmit(b'a');
        // No timer interrupts run, so the first byte never completes.
        bus.transmit(b'b');
        inspect(&cell, |uart| {
            assert_eq!(uart.state, LineState::Transmitting);
            assert_eq!(uart.timer.schedules, 2);
        });
    }

    #[test]
    fn test_listen_progress_finish() {
        let cell = shared();
        install(&cell);
        let mut bus = SharedBus::new(&cell);
        bus.begin_relay();
        bus.listen();
        inspect(&cell, |uart| {
            assert!(uart.timer.running);
            let _ = uart.response.extend_from_slice(b"1OK\r");
        });
        assert_eq!(
            bus.progress(),
            RxProgress {
                len: 4,
                terminated: true
            }
        );
        assert_eq!(bus.finish().as_slice(), b"1OK\r");
        inspect(&cell, |uart| assert!(!uart.timer.running));
    }

    #[test]
    fn test_hold_reset_drives_space() {
        let cell = shared();
        install(&cell);
        let mut bus = SharedBus::new(&cell);
        bus.hold_reset(true);
        inspect(&cell, |uart| assert_eq!(uart.tx.level(), Some(true)));
        bus.hold_reset(false);
        inspect(&cell, |uart| assert_eq!(uart.tx.level(), Some(false)));
    }
}
