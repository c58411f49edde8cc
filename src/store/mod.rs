//! Non-volatile parameter store.
//!
//! Parameters live in the small information flash segments. A segment must
//! be erased as a whole before any byte in it can be reprogrammed, so
//! [`ParamStore::write`] snapshots the full segment, erases it, writes the
//! snapshot back with the new bytes substituted, and verifies the result
//! byte for byte.
//!
//! The watchdog interval interrupt is masked and the flash controller
//! unlocked only for the duration of a write, through scope guards that
//! restore both on every exit path.
//!
//! The only parameter in use is the bus response timeout at
//! [`READ_DELAY_ADDRESS`].

use core::fmt::Debug;
use core::ops::{Deref, DerefMut};

use crate::consts::{
    DEFAULT_READ_DELAY, ERASED_WORD, READ_DELAY_ADDRESS, READ_DELAY_MASK, SEGMENT_LEN,
};
use crate::error::StoreError;
use crate::hal::{InterruptGate, Masked};

#[cfg(any(test, feature = "std"))]
mod mem;
#[cfg(any(test, feature = "std"))]
pub use mem::*;

/// Information flash segments.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Segment {
    /// Segment A, holding factory calibration data.
    A,
    /// Segment B.
    B,
    /// Segment C.
    C,
    /// Segment D, holding the response timeout.
    D,
}

impl Segment {
    /// First address of the segment.
    pub fn base(self) -> u16 {
        match self {
            Segment::A => 0x10C0,
            Segment::B => 0x1080,
            Segment::C => 0x1040,
            Segment::D => 0x1000,
        }
    }

    /// Whether `address..address + len` lies inside this segment.
    pub fn contains(self, address: u16, len: usize) -> bool {
        let base = usize::from(self.base());
        let start = usize::from(address);
        start >= base && start + len <= base + SEGMENT_LEN
    }
}

/// Byte-addressable information flash.
pub trait InfoFlash {
    /// Driver error.
    type Error: Debug;

    /// Reads `buf.len()` bytes starting at `address`.
    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Erases the segment starting at `base` to all ones.
    fn erase(&mut self, base: u16) -> Result<(), Self::Error>;

    /// Programs `data` starting at `address`.
    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Clears the controller lock so erase and write are accepted.
    fn unlock(&mut self);

    /// Sets the controller lock.
    fn lock(&mut self);
}

/// Scope guard over an unlocked flash controller.
struct Unlocked<'a, F: InfoFlash> {
    flash: &'a mut F,
}

impl<'a, F: InfoFlash> Unlocked<'a, F> {
    fn new(flash: &'a mut F) -> Self {
        flash.unlock();
        Self { flash }
    }
}

impl<F: InfoFlash> Deref for Unlocked<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.flash
    }
}

impl<F: InfoFlash> DerefMut for Unlocked<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.flash
    }
}

impl<F: InfoFlash> Drop for Unlocked<'_, F> {
    fn drop(&mut self) {
        self.flash.lock();
    }
}

/// Parameter store over information flash.
///
/// `W` is the watchdog interval interrupt, masked while a segment is being
/// reprogrammed.
#[derive(Debug)]
pub struct ParamStore<F, W>
where
    F: InfoFlash,
    W: InterruptGate,
{
    /// Flash driver.
    pub flash: F,
    /// Watchdog interval interrupt.
    pub watchdog: W,
}

impl<F, W> ParamStore<F, W>
where
    F: InfoFlash,
    W: InterruptGate,
{
    /// Creates a store over `flash`.
    pub fn new(flash: F, watchdog: W) -> Self {
        Self { flash, watchdog }
    }

    /// Replaces `source.len()` bytes at `address` inside `segment`,
    /// preserving every other byte of the segment.
    ///
    /// # Errors
    /// - [`StoreError::OutOfSegment`] if the destination range leaves the
    ///   segment; nothing is touched.
    /// - [`StoreError::Flash`] if the driver fails at any step.
    /// - [`StoreError::Verify`] with the first differing offset if the
    ///   read-back does not match.
    pub fn write(&mut self, segment: Segment, address: u16, source: &[u8]) -> Result<(), StoreError> {
        let base = segment.base();
        if !segment.contains(address, source.len()) {
            return Err(StoreError::OutOfSegment {
                base,
                address,
                len: source.len(),
            });
        }

        let _watchdog = Masked::new(&mut self.watchdog);

        let mut image = [0u8; SEGMENT_LEN];
        self.flash
            .read(base, &mut image)
            .map_err(|_| StoreError::Flash)?;
        let offset = usize::from(address - base);
        image[offset..offset + source.len()].copy_from_slice(source);

        {
            let mut flash = Unlocked::new(&mut self.flash);
            flash.erase(base).map_err(|_| StoreError::Flash)?;
            flash.write(base, &image).map_err(|_| StoreError::Flash)?;
        }

        let mut readback = [0u8; SEGMENT_LEN];
        self.flash
            .read(base, &mut readback)
            .map_err(|_| StoreError::Flash)?;
        match image.iter().zip(readback.iter()).position(|(a, b)| a != b) {
            Some(at) => Err(StoreError::Verify(at)),
            None => Ok(()),
        }
    }

    /// Reads the little-endian `u32` at `address`.
    pub fn read_u32(&mut self, address: u16) -> Result<u32, StoreError> {
        let mut bytes = [0u8; 4];
        self.flash
            .read(address, &mut bytes)
            .map_err(|_| StoreError::Flash)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// The persisted bus response timeout.
    pub fn read_delay(&mut self) -> Result<u32, StoreError> {
        self.read_u32(READ_DELAY_ADDRESS)
    }

    /// Persists a new bus response timeout. Only the low 24 bits are kept.
    pub fn set_read_delay(&mut self, ticks: u32) -> Result<(), StoreError> {
        let bytes = (ticks & READ_DELAY_MASK).to_le_bytes();
        self.write(Segment::D, READ_DELAY_ADDRESS, &bytes)
    }

    /// Writes [`DEFAULT_READ_DELAY`] if the timeout cell is still erased.
    ///
    /// Returns `true` if the default was written.
    pub fn ensure_default(&mut self) -> Result<bool, StoreError> {
        if self.read_delay()? != ERASED_WORD {
            return Ok(false);
        }
        self.write(
            Segment::D,
            READ_DELAY_ADDRESS,
            &DEFAULT_READ_DELAY.to_le_bytes(),
        )?;
        Ok(true)
    }
}
