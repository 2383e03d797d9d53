//! # Command and Result Descriptors
//!
//! Two views of every descriptor: the logical one callers build and read
//! ([`PkaCommand`], [`PkaResultDescriptor`]), and the fixed 64-byte layout
//! the engine reads from and writes to window RAM ([`HwCommandDescriptor`],
//! [`HwResultDescriptor`]).
//!
//! Operand lengths cross the interface in 32-bit words; pointers in the
//! hardware layouts are byte offsets into window RAM.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Operand vectors per command
pub const MAX_OPERANDS: usize = 5;

/// Result vectors per result
pub const MAX_RESULTS: usize = 4;

/// Size of a hardware command descriptor
pub const CMD_DESC_SIZE: u32 = 64;

/// Size of a hardware result descriptor
pub const RSLT_DESC_SIZE: u32 = 64;

// =============================================================================
// HARDWARE LAYOUTS
// =============================================================================

/// Command descriptor as the engine reads it
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct HwCommandDescriptor {
    /// Caller tag, echoed in the result
    pub tag: u64,
    /// Window offsets of operands A..E
    pub ptrs: [u32; MAX_OPERANDS],
    /// Operand lengths in words
    pub lengths: [u32; MAX_OPERANDS],
    /// Operation code
    pub command: u32,
    /// Command flags
    pub flags: u32,
    /// Reserved, zero
    pub reserved: [u32; 2],
}

/// Result descriptor as the engine writes it
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct HwResultDescriptor {
    /// Tag copied from the command
    pub tag: u64,
    /// Window offsets of result vectors
    pub ptrs: [u32; MAX_RESULTS],
    /// Result vector lengths in words
    pub lengths: [u32; MAX_RESULTS],
    /// Operation code copied from the command
    pub command: u32,
    /// Result code in bits 0..8, compare result in bits 8..11
    pub status: u32,
    /// Reserved, zero
    pub reserved: [u32; 4],
}

const_assert_eq!(core::mem::size_of::<HwCommandDescriptor>(), CMD_DESC_SIZE as usize);
const_assert_eq!(core::mem::size_of::<HwResultDescriptor>(), RSLT_DESC_SIZE as usize);

/// Results overwrite their command's slot
const_assert_eq!(CMD_DESC_SIZE, RSLT_DESC_SIZE);

impl HwCommandDescriptor {
    /// Encode to window-RAM bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode from window-RAM bytes
    pub fn from_bytes(bytes: &[u8; CMD_DESC_SIZE as usize]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }
}

impl HwResultDescriptor {
    /// Encode to window-RAM bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode from window-RAM bytes
    pub fn from_bytes(bytes: &[u8; RSLT_DESC_SIZE as usize]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Pack a result code and compare result into the status word
    pub const fn pack_status(result_code: u8, compare_result: u8) -> u32 {
        result_code as u32 | ((compare_result as u32 & 0x7) << 8)
    }
}

// =============================================================================
// LOGICAL DESCRIPTORS
// =============================================================================

/// One operation to submit
#[derive(Debug, Clone, Copy)]
pub struct PkaCommand<'a> {
    /// Correlates the result with this submission
    pub tag: u64,
    /// Operation code
    pub command: u32,
    /// Command flags
    pub flags: u32,
    /// Operands A..E; an empty slice means the operand is unused
    pub operands: [&'a [u32]; MAX_OPERANDS],
}

impl<'a> PkaCommand<'a> {
    /// Command with no operands
    pub const fn new(command: u32, tag: u64) -> Self {
        Self {
            tag,
            command,
            flags: 0,
            operands: [&[]; MAX_OPERANDS],
        }
    }

    /// Set operand `index` (0 = A .. 4 = E)
    pub fn with_operand(mut self, index: usize, words: &'a [u32]) -> Self {
        self.operands[index] = words;
        self
    }

    /// Set the command flags
    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Operand lengths in words
    pub fn lengths(&self) -> [u32; MAX_OPERANDS] {
        self.operands.map(|op| op.len() as u32)
    }

    /// Hardware layout with operands placed at `ptrs`
    pub fn to_hw(&self, ptrs: [u32; MAX_OPERANDS]) -> HwCommandDescriptor {
        HwCommandDescriptor {
            tag: self.tag,
            ptrs,
            lengths: self.lengths(),
            command: self.command,
            flags: self.flags,
            reserved: [0; 2],
        }
    }
}

/// A completed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkaResultDescriptor {
    /// Tag of the command this completes
    pub tag: u64,
    /// Operation code
    pub command: u32,
    /// Zero on success; anything else is an operation-level failure
    pub result_code: u8,
    /// Outcome of compare operations
    pub compare_result: u8,
    /// Result vector lengths in words, as reported by the engine
    pub lengths: [u32; MAX_RESULTS],
    /// Window offsets of the result vectors
    pub ptrs: [u32; MAX_RESULTS],
}

impl PkaResultDescriptor {
    /// Did the operation itself succeed
    pub const fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

impl From<&HwResultDescriptor> for PkaResultDescriptor {
    fn from(hw: &HwResultDescriptor) -> Self {
        Self {
            tag: hw.tag,
            command: hw.command,
            result_code: (hw.status & 0xFF) as u8,
            compare_result: ((hw.status >> 8) & 0x7) as u8,
            lengths: hw.lengths,
            ptrs: hw.ptrs,
        }
    }
}
