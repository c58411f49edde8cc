//! Error types.

use embedded_hal_nb::serial::ErrorKind;
use thiserror::Error;

/// Failure of a parameter store operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum StoreError {
    /// The destination range does not lie inside the target segment.
    #[error("{len} bytes at {address:#06x} do not fit segment {base:#06x}")]
    OutOfSegment {
        /// Base address of the segment.
        base: u16,
        /// Requested destination address.
        address: u16,
        /// Requested length.
        len: usize,
    },
    /// The flash driver reported an error while reading, erasing or writing.
    #[error("flash driver failed")]
    Flash,
    /// Read-back after programming differs from the intended image.
    #[error("verify mismatch at segment offset {0}")]
    Verify(usize),
}

/// Failure surfaced by [`Gateway::poll`](crate::dispatch::Gateway::poll).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    /// Writing to the host link failed.
    #[error("host link write failed: {0:?}")]
    HostLink(ErrorKind),
}
