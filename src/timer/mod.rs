//! Bit timing and interrupt glue for the software UART.
//!
//! The engine is clocked by a free-running timer with one compare channel.
//! Every period below is expressed in timer counts at the node's 16 MHz
//! SMCLK, or in main-loop polls where noted.
//!
//! | Constant              | Value        | Meaning                                  |
//! |-----------------------|--------------|------------------------------------------|
//! | `BIT_TIME`            | 1667 counts  | one bit at 9600 baud                     |
//! | `BIT_TIME_RX_INITIAL` | 1667 counts  | start edge to first data sample          |
//! | `QUIET_TIME`          | 53 344 polls | idle gap ending a stalled response       |
//! | `TX_WAIT_LIMIT`       | 26 000 polls | cap on waiting for the previous byte     |
//! | `DEAD_TIME_NS`        | 17.5 µs      | own trailing edge settle before receive  |
//! | `RESET_PULSE_MS`      | 5 s          | bus held low to reset every subordinate  |
//!
//! Contains helpers for deriving the bit period for other clocks:
//! - `bit_time`: runtime calculator
//! - `const_bit_time`: compile-time calculator
//!
//! and, in [`isr`] and [`macros`], the functions and macros that bind the
//! engine and the command frame to interrupt handlers through
//! `critical_section`.

use libm::round;

mod isr;
pub use isr::*;

mod macros;
#[allow(unused_imports)]
pub use macros::*;

/// Timer input clock (SMCLK) in Hz.
pub const SMCLK_HZ: u32 = 16_000_000;

/// Bus bit rate.
pub const BAUD: u32 = 9_600;

/// Compare interval of one transmitted bit.
pub const BIT_TIME: u16 = const_bit_time(SMCLK_HZ, BAUD);

/// Compare interval between received samples.
pub const BIT_TIME_RX: u16 = BIT_TIME;

/// Delay from the start-bit edge to the first data sample, trimmed for
/// interrupt entry latency.
pub const BIT_TIME_RX_INITIAL: u16 = BIT_TIME;

/// Polls without a new character after which a started response is
/// considered finished (32 bit periods' worth).
pub const QUIET_TIME: u32 = (BIT_TIME as u32) << 5;

/// Polls spent waiting for the previous byte before transmitting anyway.
pub const TX_WAIT_LIMIT: u16 = 26_000;

/// Settle time between releasing the line and arming start-bit detection
/// (280 cycles at 16 MHz).
pub const DEAD_TIME_NS: u32 = 17_500;

/// Duration of the bus reset pulse.
pub const RESET_PULSE_MS: u32 = 5_000;

/// Computes the compare interval for one bit.
///
/// # Arguments
/// - `clock_hz`: timer input clock in Hz
/// - `baud`: bit rate
///
/// # Returns
/// - Timer counts per bit, rounded to nearest
pub fn bit_time(clock_hz: u32, baud: u32) -> u16 {
    round(f64::from(clock_hz) / f64::from(baud)) as u16
}

/// Compile-time bit interval calculator.
///
/// Integer rounding to nearest; see [`bit_time`].
pub const fn const_bit_time(clock_hz: u32, baud: u32) -> u16 {
    ((clock_hz + baud / 2) / baud) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_time_at_node_clock() {
        assert_eq!(BIT_TIME, 1667);
        assert_eq!(bit_time(SMCLK_HZ, BAUD), 1667);
        assert_eq!(QUIET_TIME, 53_344);
    }

    #[test]
    fn test_bit_time_other_clocks() {
        assert_eq!(bit_time(8_000_000, 9_600), const_bit_time(8_000_000, 9_600));
        assert_eq!(bit_time(1_000_000, 9_600), 104);
        assert_eq!(const_bit_time(16_000_000, 115_200), 139);
    }
}
