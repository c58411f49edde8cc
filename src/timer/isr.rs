use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::bus::SharedSoftUart;
use crate::frame::{Assembly, CommandFrame};
use crate::hal::{CompareTimer, EdgeInterrupt, InterruptGate, SystemReset};
use crate::softuart::{SoftUart, StopBitMode};

/// Used to initialize the global static `SoftUart` for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// static SOFT_UART: SharedSoftUart<P1_1, P1_2, TimerA0, P1Edge> =
///     global_bus_init::<P1_1, P1_2, TimerA0, P1Edge>();
/// ```
pub const fn global_bus_init<TX, RX, T, E>() -> SharedSoftUart<TX, RX, T, E>
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    Mutex::new(RefCell::new(None))
}

/// Builds the engine and places it in the global static.
///
/// # Arguments
/// * The global static `SoftUart`
/// * The bus drive pin
/// * The bus sense pin
/// * The compare timer
/// * The sense pin edge interrupt
/// * How stop bits are detected
pub fn global_bus_setup<TX, RX, T, E>(
    global_uart: &'static SharedSoftUart<TX, RX, T, E>,
    tx: TX,
    rx: RX,
    timer: T,
    edge: E,
    stop_bit: StopBitMode,
) where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    critical_section::with(|cs| {
        let _ = global_uart
            .borrow(cs)
            .replace(Some(SoftUart::new(tx, rx, timer, edge, stop_bit)));
    });
}

/// Runs the engine's compare handler.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER0_A0() {
///     global_timer_compare(&SOFT_UART);
/// }
/// ```
pub fn global_timer_compare<TX, RX, T, E>(global_uart: &SharedSoftUart<TX, RX, T, E>)
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    critical_section::with(|cs| {
        if let Some(uart) = global_uart.borrow_ref_mut(cs).as_mut() {
            uart.on_timer();
        }
    });
}

/// Runs the engine's edge handler.
pub fn global_line_edge<TX, RX, T, E>(global_uart: &SharedSoftUart<TX, RX, T, E>)
where
    TX: OutputPin,
    RX: InputPin,
    T: CompareTimer,
    E: EdgeInterrupt,
{
    critical_section::with(|cs| {
        if let Some(uart) = global_uart.borrow_ref_mut(cs).as_mut() {
            uart.on_edge();
        }
    });
}

/// Used to initialize the global static command frame.
pub const fn global_command_init() -> Mutex<RefCell<CommandFrame>> {
    Mutex::new(RefCell::new(CommandFrame::new()))
}

/// Feeds one byte received from the host into the command frame.
///
/// Masks host receipt through `gate` once the frame is complete; the
/// dispatcher unmasks it after replying.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn USCIAB0RX() {
///     let byte = host_rx_register();
///     global_host_rx(&COMMAND, byte, &mut HostRxEnable);
/// }
/// ```
pub fn global_host_rx<G: InterruptGate>(
    command: &Mutex<RefCell<CommandFrame>>,
    byte: u8,
    gate: &mut G,
) -> Assembly {
    let assembly = critical_section::with(|cs| command.borrow_ref_mut(cs).push(byte));
    if assembly == Assembly::Complete {
        gate.mask();
    }
    assembly
}

/// Handler for interrupt vectors the node never enables. Forces a full
/// restart.
pub fn unexpected_interrupt<R: SystemReset>(reset: &mut R) -> ! {
    reset.reset()
}
