//! Command and response frames.
//!
//! A [`CommandFrame`] is assembled byte by byte in the host-link receive
//! interrupt and handed to the dispatcher once its CR terminator arrives. A
//! [`ResponseFrame`] is either built by local command execution or filled by
//! the software UART while a subordinate answers.
//!
//! Wire grammar of a command:
//!
//! ```text
//! <ID><CMD_HI><CMD_LO>[':'<PARAM...>]<CR>
//! ```
//!
//! [`Command`] is the decoded form of a frame addressed to this node.

use core::ops::Deref;

use heapless::Vec;

use crate::analog::{Channel, Reference};
use crate::codec::parse_scaled_parameter;
use crate::consts::{
    COMMAND_CAPACITY, CR, PARAM_SEPARATOR, PARAM_SEPARATOR_INDEX, PARAM_START, RESPONSE_CAPACITY,
};

/// Result of feeding one byte to a [`CommandFrame`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Assembly {
    /// The byte was stored and the frame is still open.
    Pending,
    /// The byte was a CR: the frame is complete and host receipt should be
    /// masked until the dispatcher has consumed it.
    Complete,
    /// The buffer filled without a terminator and has been cleared.
    Overflow,
    /// A complete frame is waiting for dispatch; the byte was refused.
    Held,
}

/// Fixed-capacity command buffer filled by the host receive interrupt.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    buf: Vec<u8, COMMAND_CAPACITY>,
    complete: bool,
}

impl CommandFrame {
    /// Creates an empty frame. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            complete: false,
        }
    }

    /// Appends a byte received from the host.
    ///
    /// Reaching [`COMMAND_CAPACITY`] bytes without a terminator discards
    /// everything collected so far, the byte that caused it included, even
    /// if that byte was a CR.
    pub fn push(&mut self, byte: u8) -> Assembly {
        if self.complete {
            return Assembly::Held;
        }
        if self.buf.push(byte).is_err() || self.buf.len() >= COMMAND_CAPACITY {
            self.buf.clear();
            return Assembly::Overflow;
        }
        if byte == CR {
            self.complete = true;
            return Assembly::Complete;
        }
        Assembly::Pending
    }

    /// Moves a completed frame out, leaving this buffer empty and open.
    pub fn take_complete(&mut self) -> Option<CommandFrame> {
        if self.complete {
            Some(core::mem::take(self))
        } else {
            None
        }
    }

    /// The bytes received so far, terminator included once complete.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the frame starts with `id`.
    pub fn is_addressed_to(&self, id: u8) -> bool {
        self.buf.first() == Some(&id)
    }

    /// Whether the frame has the shape of a local command: exactly
    /// `ID C C CR`, or a ':' right after the command code.
    pub fn is_well_formed(&self) -> bool {
        let len = self.buf.len();
        len == PARAM_SEPARATOR_INDEX + 1
            || (len > PARAM_SEPARATOR_INDEX + 1
                && self.buf[PARAM_SEPARATOR_INDEX] == PARAM_SEPARATOR)
    }
}

impl Deref for CommandFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

/// Fixed-capacity reply buffer.
///
/// Overflowing pushes are refused; callers decide whether that matters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    buf: Vec<u8, RESPONSE_CAPACITY>,
}

impl ResponseFrame {
    /// Creates an empty frame.
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends one byte, handing it back if the frame is full.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        self.buf.push(byte)
    }

    /// Appends as many bytes of `bytes` as fit, returning `false` if any
    /// were dropped.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> bool {
        let mut fitted = true;
        for &b in bytes {
            if self.buf.push(b).is_err() {
                fitted = false;
            }
        }
        fitted
    }

    /// Shortens the frame to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Empties the frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Whether the last byte is a CR.
    pub fn is_terminated(&self) -> bool {
        self.buf.last() == Some(&CR)
    }

    /// The frame contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// The frame contents, for in-place rewriting.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Deref for ResponseFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

/// A command addressed to this node.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Command {
    /// `FV`: report firmware type and version.
    FirmwareVersion,
    /// `AD:<chan><ref>`: averaged analog measurement.
    Measure {
        /// Input to convert.
        channel: Channel,
        /// Reference voltage for the conversion.
        reference: Reference,
    },
    /// `RD:<decimal>`: persist a new response timeout. `None` when the
    /// parameter did not parse.
    SetReadDelay(Option<u32>),
    /// `RD`: report the persisted response timeout.
    ReadDelay,
    /// `LD`: report the last observed round-trip delay.
    LastDelay,
    /// `MD`: report and reset the maximum observed round-trip delay.
    MaxDelay,
    /// `RS`: hold the bus low long enough to reset every subordinate.
    ResetBus,
    /// Any other code; answered with an empty payload.
    Unknown,
}

impl Command {
    /// Decodes the command carried by a local frame (`ID C C [':' ...] CR`).
    ///
    /// `AD` falls back to the supply channel and supply reference for
    /// selectors it does not recognize.
    pub fn parse(frame: &[u8]) -> Self {
        let code = (frame.get(1).copied(), frame.get(2).copied());
        let has_params = frame.get(PARAM_SEPARATOR_INDEX) == Some(&PARAM_SEPARATOR);
        match code {
            (Some(b'F'), Some(b'V')) => Command::FirmwareVersion,
            (Some(b'A'), Some(b'D')) if has_params => Command::Measure {
                channel: frame
                    .get(PARAM_START)
                    .and_then(|&c| Channel::from_code(c))
                    .unwrap_or_default(),
                reference: frame
                    .get(PARAM_START + 1)
                    .and_then(|&r| Reference::from_code(r))
                    .unwrap_or_default(),
            },
            (Some(b'R'), Some(b'D')) if has_params => {
                Command::SetReadDelay(parse_scaled_parameter(frame, 0, 0))
            }
            (Some(b'R'), Some(b'D')) => Command::ReadDelay,
            (Some(b'L'), Some(b'D')) => Command::LastDelay,
            (Some(b'M'), Some(b'D')) => Command::MaxDelay,
            (Some(b'R'), Some(b'S')) => Command::ResetBus,
            _ => Command::Unknown,
        }
    }
}
