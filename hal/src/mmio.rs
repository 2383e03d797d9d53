//! # Memory-Mapped I/O Region
//!
//! Volatile access to a mapped device region. The mapping itself (device
//! tree ranges, ioremap) is done by the platform code that hands the base
//! pointer in.

use core::ptr::{read_volatile, write_volatile};

use crate::error::{HalError, HalResult};
use crate::regfile::RegisterFile;

/// A mapped MMIO region
#[derive(Debug)]
pub struct MmioRegion {
    base: *mut u8,
    size: usize,
}

impl MmioRegion {
    /// Create a region over `size` bytes of mapped device memory
    ///
    /// # Safety
    ///
    /// `base` must point to a live device mapping of at least `size` bytes
    /// that stays mapped for the lifetime of the returned region, and no
    /// other code may hold a Rust reference into it.
    pub unsafe fn new(base: *mut u8, size: usize) -> HalResult<Self> {
        if size == 0 {
            return Err(HalError::ZeroSized);
        }
        if (base as usize) % 4 != 0 {
            return Err(HalError::Misaligned { value: base as usize });
        }
        if size % 4 != 0 {
            return Err(HalError::Misaligned { value: size });
        }

        Ok(Self { base, size })
    }

    /// Get the base address
    #[inline]
    pub const fn base(&self) -> *mut u8 {
        self.base
    }

    #[inline]
    fn assert_range(&self, offset: usize, len: usize) {
        if let Err(e) = self.check_range(offset, len) {
            panic!("MmioRegion: {}", e);
        }
    }
}

impl RegisterFile for MmioRegion {
    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn read_u32(&self, offset: usize) -> u32 {
        debug_assert!(offset % 4 == 0);
        self.assert_range(offset, 4);
        // SAFETY: offset is in bounds and aligned; the mapping is valid per `new`
        let value = unsafe { read_volatile(self.base.add(offset) as *const u32) };
        #[cfg(feature = "debug")]
        log::trace!("mmio rd {:#06x} -> {:#010x}", offset, value);
        value
    }

    #[inline]
    fn write_u32(&self, offset: usize, value: u32) {
        debug_assert!(offset % 4 == 0);
        self.assert_range(offset, 4);
        #[cfg(feature = "debug")]
        log::trace!("mmio wr {:#06x} <- {:#010x}", offset, value);
        // SAFETY: offset is in bounds and aligned; the mapping is valid per `new`
        unsafe { write_volatile(self.base.add(offset) as *mut u32, value) }
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        self.assert_range(offset, buf.len());
        for (i, byte) in buf.iter_mut().enumerate() {
            // SAFETY: the whole range was checked above
            *byte = unsafe { read_volatile(self.base.add(offset + i)) };
        }
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        self.assert_range(offset, data.len());
        for (i, byte) in data.iter().enumerate() {
            // SAFETY: the whole range was checked above
            unsafe { write_volatile(self.base.add(offset + i), *byte) }
        }
    }
}

// SAFETY: the region is only touched through volatile accesses; ordering
// between users is the driver's responsibility.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}
