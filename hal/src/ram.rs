//! # RAM-backed Region
//!
//! A zero-filled buffer that behaves like a device region. Used to stand in
//! for window RAM when running the offload core on the host.

use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{HalError, HalResult};
use crate::regfile::RegisterFile;

/// Heap-backed register file
#[derive(Debug)]
pub struct RamRegion {
    bytes: Mutex<Vec<u8>>,
    size: usize,
}

impl RamRegion {
    /// Create a zero-filled region of `size` bytes
    pub fn new(size: usize) -> HalResult<Self> {
        if size == 0 {
            return Err(HalError::ZeroSized);
        }
        if size % 4 != 0 {
            return Err(HalError::Misaligned { value: size });
        }

        Ok(Self {
            bytes: Mutex::new(vec![0u8; size]),
            size,
        })
    }

    fn bounds(&self, offset: usize, len: usize) -> core::ops::Range<usize> {
        if let Err(e) = self.check_range(offset, len) {
            panic!("RamRegion: {}", e);
        }
        offset..offset + len
    }
}

impl RegisterFile for RamRegion {
    fn size(&self) -> usize {
        self.size
    }

    fn read_u32(&self, offset: usize) -> u32 {
        debug_assert!(offset % 4 == 0);
        let range = self.bounds(offset, 4);
        let bytes = self.bytes.lock();
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[range]);
        u32::from_le_bytes(word)
    }

    fn write_u32(&self, offset: usize, value: u32) {
        debug_assert!(offset % 4 == 0);
        let range = self.bounds(offset, 4);
        self.bytes.lock()[range].copy_from_slice(&value.to_le_bytes());
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        let range = self.bounds(offset, buf.len());
        buf.copy_from_slice(&self.bytes.lock()[range]);
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        let range = self.bounds(offset, data.len());
        self.bytes.lock()[range].copy_from_slice(data);
    }
}
