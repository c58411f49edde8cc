//! # samewire
//!
//! A portable, no_std gateway between a host serial link and a single-wire,
//! inverted, half-duplex subordinate bus.
//!
//! The gateway receives CR-terminated command frames from the host. Frames
//! that start with its own identifier (`~`) are executed locally; every
//! other frame is relayed verbatim onto the bus through an interrupt-driven
//! software UART, and the subordinate's answer is collected, checked for
//! duplicated-payload integrity and forwarded back to the host.
//!
//! This crate implements the gateway using:
//! - `embedded-hal` traits for pins and delays, `embedded-hal-nb` for the
//!   host serial port
//! - a software UART clocked by a compare timer and an edge interrupt
//! - interrupt-safe shared state with `critical-section`
//! - a read-modify-erase-write parameter store over information flash
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Disables `#![no_std]` and provides the in-memory flash `store::MemFlash` |
//! | `defmt-0-3` | Uses `defmt` logging |
//! | `log`       | Uses `log` logging |
//!
//! ## Wire protocol
//!
//! ```text
//! host → node   <ID><C><C>[':'<PARAM...>]<CR>
//! node → host   <ID><PAYLOAD><CR><LF>
//! ```
//!
//! | Command          | Reply payload                                |
//! |------------------|----------------------------------------------|
//! | `FV`             | firmware type and version (`MC07`)           |
//! | `AD:<chan><ref>` | averaged conversion, decimal                 |
//! | `RD:<decimal>`   | `OK` once the new timeout is persisted, else `NO` |
//! | `RD`             | persisted response timeout                   |
//! | `LD`             | last round-trip delay                        |
//! | `MD`             | maximum round-trip delay, then reset to 0    |
//! | `RS`             | `DONE` after a 5 s bus reset pulse           |
//!
//! ## Integration Notes
//!
//! - Bit timing assumes a 16 MHz timer clock and 9600 baud; see [`timer`]
//! - Declare the shared globals with [`init_gateway!`] and bind the
//!   interrupt handlers with [`bus_timer_isr!`], [`bus_edge_isr!`] and
//!   [`host_rx_isr!`]
//! - Only one engine instance should be active at a time

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]
#![warn(unused, unused_results)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub use critical_section;
pub use heapless;

pub mod analog;
pub mod bus;
pub mod codec;
pub mod collector;
pub mod consts;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod hal;
pub mod redundancy;
pub mod softuart;
pub mod store;
pub mod timer;

#[cfg(test)]
mod testing;
