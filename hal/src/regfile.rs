//! # Register File Capability
//!
//! A [`RegisterFile`] is anything that can be addressed by byte offset:
//! a block of MMIO control registers, an on-device window RAM, or a plain
//! buffer standing in for either on the host.

use alloc::sync::Arc;

use crate::error::{HalError, HalResult};

/// Offset-addressed access to a hardware region.
///
/// Offsets are bytes from the start of the region. 32-bit accesses must be
/// 4-byte aligned. Implementations treat an out-of-range access as a driver
/// bug and panic; callers that cannot prove an offset is in range check it
/// first with [`RegisterFile::check_range`].
pub trait RegisterFile {
    /// Size of the region in bytes
    fn size(&self) -> usize;

    /// Read a 32-bit register
    fn read_u32(&self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write_u32(&self, offset: usize, value: u32);

    /// Copy `buf.len()` bytes out of the region starting at `offset`
    fn read_bytes(&self, offset: usize, buf: &mut [u8]);

    /// Copy `data` into the region starting at `offset`
    fn write_bytes(&self, offset: usize, data: &[u8]);

    /// Check that `[offset, offset + len)` lies inside the region
    fn check_range(&self, offset: usize, len: usize) -> HalResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size() => Ok(()),
            _ => Err(HalError::OutOfBounds { offset, len }),
        }
    }
}

impl<T: RegisterFile + ?Sized> RegisterFile for &T {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read_u32(&self, offset: usize) -> u32 {
        (**self).read_u32(offset)
    }

    fn write_u32(&self, offset: usize, value: u32) {
        (**self).write_u32(offset, value);
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        (**self).read_bytes(offset, buf);
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        (**self).write_bytes(offset, data);
    }
}

impl<T: RegisterFile + ?Sized> RegisterFile for Arc<T> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read_u32(&self, offset: usize) -> u32 {
        (**self).read_u32(offset)
    }

    fn write_u32(&self, offset: usize, value: u32) {
        (**self).write_u32(offset, value);
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        (**self).read_bytes(offset, buf);
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        (**self).write_bytes(offset, data);
    }
}

/// Helper to extract a bit field from a register value
pub const fn extract_field(value: u32, low_bit: u8, high_bit: u8) -> u32 {
    let width = high_bit - low_bit + 1;
    let mask = if width >= 32 { u32::MAX } else { ((1u32 << width) - 1) << low_bit };
    (value & mask) >> low_bit
}

/// Helper to insert a bit field into a register value
pub const fn insert_field(value: u32, field: u32, low_bit: u8, high_bit: u8) -> u32 {
    let width = high_bit - low_bit + 1;
    let mask = if width >= 32 { u32::MAX } else { ((1u32 << width) - 1) << low_bit };
    (value & !mask) | ((field << low_bit) & mask)
}
