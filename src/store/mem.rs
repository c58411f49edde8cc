//! RAM-backed information flash for host builds and tests.
//!
//! Models the controller closely enough to exercise [`ParamStore`]: erase
//! sets a whole segment to `0xFF`, programming can only clear bits, and
//! both are refused while the controller is locked.
//!
//! [`ParamStore`]: super::ParamStore

use thiserror::Error;

use super::InfoFlash;
use crate::consts::{SEGMENT_LEN, SEGMENT_LEN_U16};

/// First address covered by [`MemFlash`].
pub const INFO_BASE: u16 = 0x1000;

/// Number of segments covered by [`MemFlash`].
pub const INFO_SEGMENTS: usize = 4;

const INFO_LEN: usize = SEGMENT_LEN * INFO_SEGMENTS;

/// Errors reported by [`MemFlash`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemFlashError {
    /// Erase or write while the controller was locked.
    #[error("controller locked")]
    Locked,
    /// Access outside the modelled address range, or an erase not aligned
    /// to a segment.
    #[error("address {0:#06x} out of range")]
    Address(u16),
    /// Injected failure.
    #[error("injected fault")]
    Fault,
}

/// Simulated information flash.
#[derive(Debug, Clone)]
pub struct MemFlash {
    cells: [u8; INFO_LEN],
    unlocked: bool,
    erases: [u16; INFO_SEGMENTS],
    stuck: Option<(u16, u8)>,
    fail_erase: bool,
}

impl Default for MemFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFlash {
    /// A fully erased, locked device.
    pub fn new() -> Self {
        Self {
            cells: [0xFF; INFO_LEN],
            unlocked: false,
            erases: [0; INFO_SEGMENTS],
            stuck: None,
            fail_erase: false,
        }
    }

    fn range(address: u16, len: usize) -> Result<core::ops::Range<usize>, MemFlashError> {
        let start = usize::from(address)
            .checked_sub(usize::from(INFO_BASE))
            .ok_or(MemFlashError::Address(address))?;
        if start + len > INFO_LEN {
            return Err(MemFlashError::Address(address));
        }
        Ok(start..start + len)
    }

    /// Overwrites memory directly, bypassing lock and programming rules.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        if let Ok(range) = Self::range(address, data.len()) {
            self.cells[range].copy_from_slice(data);
        }
    }

    /// Raw memory contents. Empty if the range is not modelled.
    pub fn contents(&self, address: u16, len: usize) -> &[u8] {
        match Self::range(address, len) {
            Ok(range) => &self.cells[range],
            Err(_) => &[],
        }
    }

    /// Whether the controller is currently unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Number of erases of the segment at `base`.
    pub fn erase_count(&self, base: u16) -> u16 {
        let index = usize::from(base.wrapping_sub(INFO_BASE) / SEGMENT_LEN_U16);
        self.erases.get(index).copied().unwrap_or(0)
    }

    /// Pins the byte at `address` to `value` regardless of erase or write.
    pub fn stick(&mut self, address: u16, value: u8) {
        self.stuck = Some((address, value));
        self.apply_stuck();
    }

    /// Makes the next erase fail.
    pub fn fail_next_erase(&mut self) {
        self.fail_erase = true;
    }

    fn apply_stuck(&mut self) {
        if let Some((address, value)) = self.stuck {
            if let Ok(range) = Self::range(address, 1) {
                self.cells[range.start] = value;
            }
        }
    }
}

impl InfoFlash for MemFlash {
    type Error = MemFlashError;

    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        let range = Self::range(address, buf.len())?;
        buf.copy_from_slice(&self.cells[range]);
        Ok(())
    }

    fn erase(&mut self, base: u16) -> Result<(), Self::Error> {
        if !self.unlocked {
            return Err(MemFlashError::Locked);
        }
        if core::mem::take(&mut self.fail_erase) {
            return Err(MemFlashError::Fault);
        }
        let range = Self::range(base, SEGMENT_LEN)?;
        if range.start % SEGMENT_LEN != 0 {
            return Err(MemFlashError::Address(base));
        }
        self.erases[range.start / SEGMENT_LEN] += 1;
        self.cells[range].fill(0xFF);
        self.apply_stuck();
        Ok(())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Self::Error> {
        if !self.unlocked {
            return Err(MemFlashError::Locked);
        }
        let range = Self::range(address, data.len())?;
        for (cell, &byte) in self.cells[range].iter_mut().zip(data) {
            *cell &= byte;
        }
        self.apply_stuck();
        Ok(())
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn lock(&mut self) {
        self.unlocked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_controller_refuses_changes() {
        let mut flash = MemFlash::new();
        assert_eq!(flash.erase(0x1000), Err(MemFlashError::Locked));
        assert_eq!(flash.write(0x1000, &[0]), Err(MemFlashError::Locked));
        assert_eq!(flash.contents(0x1000, 1), &[0xFF]);
    }

    #[test]
    fn test_programming_only_clears_bits() {
        let mut flash = MemFlash::new();
        flash.unlock();
        flash.write(0x1010, &[0x0F]).unwrap();
        flash.write(0x1010, &[0xF0]).unwrap();
        assert_eq!(flash.contents(0x1010, 1), &[0x00]);
        flash.erase(0x1000).unwrap();
        assert_eq!(flash.contents(0x1010, 1), &[0xFF]);
        assert_eq!(flash.erase_count(0x1000), 1);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut flash = MemFlash::new();
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(0x0FFF, &mut buf), Err(MemFlashError::Address(0x0FFF)));
        assert_eq!(flash.read(0x10FE, &mut buf), Err(MemFlashError::Address(0x10FE)));
        flash.unlock();
        assert_eq!(flash.erase(0x1010), Err(MemFlashError::Address(0x1010)));
    }
}
