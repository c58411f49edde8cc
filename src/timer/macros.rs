/// Declares the static globals shared between the gateway's main loop and
/// its interrupt handlers: `SOFT_UART` and `COMMAND`.
///
/// # Arguments
/// - `$tx`: concrete type of the bus drive pin (must implement `OutputPin`)
/// - `$rx`: concrete type of the bus sense pin (must implement `InputPin`)
/// - `$timer`: concrete compare timer type (must implement `CompareTimer`)
/// - `$edge`: concrete edge interrupt type (must implement `EdgeInterrupt`)
///
/// # Example
/// ```rust,ignore
/// init_gateway!(P1_1, P1_2, TimerA0, P1Edge);
/// ```
#[macro_export]
macro_rules! init_gateway {
    ( $tx:ty, $rx:ty, $timer:ty, $edge:ty ) => {
        pub static SOFT_UART: $crate::bus::SharedSoftUart<$tx, $rx, $timer, $edge> =
            $crate::timer::global_bus_init();
        pub static COMMAND: $crate::critical_section::Mutex<
            core::cell::RefCell<$crate::frame::CommandFrame>,
        > = $crate::timer::global_command_init();
    };
}

/// Builds the software UART inside the `SOFT_UART` declared by
/// [`init_gateway!`].
///
/// The stop-bit mode defaults to `StopBitMode::EdgeSync` when omitted.
///
/// # Example
/// ```rust,ignore
/// setup_soft_uart!(tx, rx, timer, edge);
/// setup_soft_uart!(tx, rx, timer, edge, StopBitMode::Sampled);
/// ```
#[macro_export]
macro_rules! setup_soft_uart {
    ( $tx:expr, $rx:expr, $timer:expr, $edge:expr ) => {
        $crate::setup_soft_uart!(
            $tx,
            $rx,
            $timer,
            $edge,
            $crate::softuart::StopBitMode::EdgeSync
        )
    };
    ( $tx:expr, $rx:expr, $timer:expr, $edge:expr, $mode:expr ) => {
        $crate::timer::global_bus_setup(&SOFT_UART, $tx, $rx, $timer, $edge, $mode)
    };
}

/// Body of the compare timer interrupt handler.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER0_A0() {
///     bus_timer_isr!();
/// }
/// ```
#[macro_export]
macro_rules! bus_timer_isr {
    () => {
        $crate::timer::global_timer_compare(&SOFT_UART)
    };
}

/// Body of the bus sense pin interrupt handler.
#[macro_export]
macro_rules! bus_edge_isr {
    () => {
        $crate::timer::global_line_edge(&SOFT_UART)
    };
}

/// Body of the host receive interrupt handler.
///
/// # Arguments
/// - `$byte`: the received byte
/// - `$gate`: the host receive interrupt enable (must implement
///   `InterruptGate`)
#[macro_export]
macro_rules! host_rx_isr {
    ( $byte:expr, $gate:expr ) => {
        $crate::timer::global_host_rx(&COMMAND, $byte, $gate)
    };
}
