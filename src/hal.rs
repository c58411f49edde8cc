//! Hardware seams not covered by `embedded-hal`.
//!
//! Pins, delays and the host serial port come from `embedded-hal` and
//! `embedded-hal-nb`. The software UART additionally needs a timer with a
//! compare channel and a GPIO edge interrupt, and the dispatcher needs to
//! mask individual interrupt sources. Boards implement these traits over
//! their registers.

/// Edge of the bus sense pin, as seen at the pin.
///
/// The bus is inverted at the pin: a start bit (bus falling) arrives as a
/// [`Rising`](Edge::Rising) pin edge.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

/// A free-running 16-bit counter with one compare channel and interrupt.
///
/// All values wrap; the engine only ever adds bit periods to them.
pub trait CompareTimer {
    /// Current counter value.
    fn now(&mut self) -> u16;

    /// Value last loaded into the compare register.
    fn compare(&self) -> u16;

    /// Loads `at` into the compare register and enables its interrupt.
    fn schedule(&mut self, at: u16);

    /// Disables the compare interrupt.
    fn cancel(&mut self);

    /// Starts the counter in continuous mode.
    fn start(&mut self);

    /// Stops the counter.
    fn stop(&mut self);
}

/// Edge interrupt of the bus sense pin.
pub trait EdgeInterrupt {
    /// Selects `edge`, clears any pending flag and enables the interrupt.
    fn listen(&mut self, edge: Edge);

    /// Disables the interrupt and clears any pending flag.
    fn unlisten(&mut self);
}

/// Enable bit of a single interrupt source.
pub trait InterruptGate {
    /// Disables the source.
    fn mask(&mut self);

    /// Re-enables the source.
    fn unmask(&mut self);
}

/// Scope guard holding an interrupt source masked.
///
/// The source is unmasked when the guard drops, whichever way the scope is
/// left.
#[derive(Debug)]
pub struct Masked<'a, G: InterruptGate> {
    gate: &'a mut G,
}

impl<'a, G: InterruptGate> Masked<'a, G> {
    /// Masks `gate` until the returned guard drops.
    pub fn new(gate: &'a mut G) -> Self {
        gate.mask();
        Self { gate }
    }
}

impl<G: InterruptGate> Drop for Masked<'_, G> {
    fn drop(&mut self) {
        self.gate.unmask();
    }
}

/// Forced restart of the whole node.
pub trait SystemReset {
    /// Resets the node. Never returns.
    fn reset(&mut self) -> !;
}
