//! Constants used across the gateway implementation.
//!
//! This module defines the wire bytes, node identity, buffer sizing and
//! persisted layout shared by the command assembler, the dispatcher, the
//! redundancy validator and the parameter store.
//!
//! ## Key Concepts
//!
//! - **Node identifier**: the leading byte that marks a frame as addressed to
//!   this gateway rather than to a subordinate on the bus.
//! - **Sentinel**: the reserved byte that bounds the two copies of a
//!   duplicated subordinate response.
//! - **Buffer sizing**: the command and response buffers are fixed-capacity;
//!   the command buffer resets itself when it fills without a terminator.
//! - **Persisted layout**: the response timeout lives at the base of
//!   information segment D.
//!
//! Timing constants (bit period, dead time, reset pulse) live in
//! [`crate::timer`].

/// Identifier byte of this gateway (`~`).
///
/// Frames beginning with any other byte are opaque payload for the bus.
pub const NODE_ID: u8 = b'~';

/// Firmware type code reported by `FV` (`M`aster, `C`ontrol power).
pub const FIRMWARE_TYPE: [u8; 2] = *b"MC";

/// Firmware version reported by `FV`.
pub const FIRMWARE_VERSION: [u8; 2] = *b"07";

/// Carriage return, the frame terminator on both links.
pub const CR: u8 = 0x0D;

/// Line feed, appended after every response written to the host.
pub const LF: u8 = 0x0A;

/// Separator between a command code and its parameters.
pub const PARAM_SEPARATOR: u8 = b':';

/// Index of the parameter separator in a command frame (`ID C C :`).
pub const PARAM_SEPARATOR_INDEX: usize = 3;

/// Index of the first parameter byte in a command frame.
pub const PARAM_START: usize = 4;

/// Sentinel byte marking the structure of a duplicated response.
pub const SENTINEL: u8 = 31;

/// Number of bytes after which an unterminated command frame is discarded.
///
/// The byte that brings the buffer to this length is the one that
/// triggers the reset, so a frame may hold at most `COMMAND_CAPACITY - 1`
/// bytes including its CR.
pub const COMMAND_CAPACITY: usize = 31;

/// Capacity of a response frame, local or relayed.
pub const RESPONSE_CAPACITY: usize = 40;

/// Size of one erasable information flash segment.
pub const SEGMENT_LEN: usize = 64;

/// See [`SEGMENT_LEN`](crate::consts::SEGMENT_LEN)
pub const SEGMENT_LEN_U16: u16 = SEGMENT_LEN as u16;

/// Address of the persisted response timeout (base of segment D).
pub const READ_DELAY_ADDRESS: u16 = 0x1000;

/// Response timeout written on first boot, in wait-loop ticks.
pub const DEFAULT_READ_DELAY: u32 = 1000;

/// Value read back from an erased 32-bit flash cell.
pub const ERASED_WORD: u32 = u32::MAX;

/// Only the low 24 bits of a host-supplied timeout are persisted.
pub const READ_DELAY_MASK: u32 = 0x00FF_FFFF;

/// Reply payload for a successful parameter write.
pub const REPLY_OK: &[u8] = b"OK";

/// Reply payload for a failed parameter write.
pub const REPLY_NO: &[u8] = b"NO";

/// Reply payload after a bus reset pulse.
pub const REPLY_DONE: &[u8] = b"DONE";

/// Replacement payload for a corrupted duplicated response.
pub const REPLY_ERROR: &[u8] = b"ERROR";
