//! # PKA Register Map
//!
//! Control registers of the crypto engine, as byte offsets into the
//! register region handed to [`crate::PkaContext`].
//!
//! ## Register Map
//!
//! | Offset          | Register          | Description                         |
//! |-----------------|-------------------|-------------------------------------|
//! | 0x0000          | MASTER_CONTROL    | Engine enable, ring count           |
//! | 0x0004          | MASTER_STATUS     | Engine busy / error status          |
//! | 0x0100 + n*0x40 | RING_CMD_BASE     | Window offset of ring n commands    |
//! | 0x0104 + n*0x40 | RING_RSLT_BASE    | Window offset of ring n results     |
//! | 0x0108 + n*0x40 | RING_SIZE         | Number of descriptor slots          |
//! | 0x010C + n*0x40 | RING_DATA_BASE    | Window offset of ring n operand area|
//! | 0x0110 + n*0x40 | RING_ELEM_SIZE    | Operand bytes per slot              |
//! | 0x0114 + n*0x40 | RING_OPTIONS      | Priority / enable                   |
//! | 0x0118 + n*0x40 | RING_CMD_COUNT    | Write N: N more commands are ready  |
//! | 0x011C + n*0x40 | RING_RSLT_COUNT   | Read: results ready. Write N: N consumed |

use rbos_hal::regfile::{extract_field, insert_field};

// =============================================================================
// GEOMETRY
// =============================================================================

/// Size of the engine's window RAM in bytes
pub const WINDOW_RAM_SIZE: u32 = 0x4000;

/// Number of command/result rings the engine implements
pub const MAX_RINGS: usize = 4;

/// Size of the register region in bytes
pub const REGS_SIZE: usize = 0x200;

// =============================================================================
// GLOBAL REGISTERS
// =============================================================================

/// Master control register
pub const MASTER_CONTROL: usize = 0x0000;

/// Master status register
pub const MASTER_STATUS: usize = 0x0004;

/// First per-ring register block
pub const RING_REGS_BASE: usize = 0x0100;

/// Stride between per-ring register blocks
pub const RING_REGS_STRIDE: usize = 0x40;

// =============================================================================
// PER-RING REGISTERS
// =============================================================================

/// Window offset of the command area
pub const RING_CMD_BASE: usize = 0x00;

/// Window offset of the result area
pub const RING_RSLT_BASE: usize = 0x04;

/// Number of descriptor slots
pub const RING_SIZE: usize = 0x08;

/// Window offset of the operand data area
pub const RING_DATA_BASE: usize = 0x0C;

/// Operand bytes per slot
pub const RING_ELEM_SIZE: usize = 0x10;

/// Ring options, see [`RingOptions`]
pub const RING_OPTIONS: usize = 0x14;

/// Command counter: writing N tells the engine N more commands are queued
pub const RING_CMD_COUNT: usize = 0x18;

/// Result counter: reads the number of posted results, writing N retires N
pub const RING_RSLT_COUNT: usize = 0x1C;

/// Byte offset of per-ring register `reg` for `ring`
#[inline]
pub const fn ring_reg(ring: usize, reg: usize) -> usize {
    RING_REGS_BASE + ring * RING_REGS_STRIDE + reg
}

// =============================================================================
// REGISTER BITS
// =============================================================================

bitflags::bitflags! {
    /// MASTER_CONTROL bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MasterControl: u32 {
        /// Engine enabled
        const ENABLE = 1 << 0;
        /// Hold the engine in reset
        const RESET = 1 << 1;
    }
}

/// Low bit of the ring-count field in MASTER_CONTROL
pub const MASTER_CONTROL_RING_COUNT_LO: u8 = 8;

/// High bit of the ring-count field in MASTER_CONTROL
pub const MASTER_CONTROL_RING_COUNT_HI: u8 = 10;

impl MasterControl {
    /// Register value enabling the engine with `num_rings` rings
    pub const fn enable_value(num_rings: u32) -> u32 {
        insert_field(
            Self::ENABLE.bits(),
            num_rings,
            MASTER_CONTROL_RING_COUNT_LO,
            MASTER_CONTROL_RING_COUNT_HI,
        )
    }

    /// Rings enabled by a MASTER_CONTROL value; zero while the engine is off
    pub const fn enabled_rings(value: u32) -> u32 {
        if value & Self::ENABLE.bits() == 0 {
            return 0;
        }
        extract_field(value, MASTER_CONTROL_RING_COUNT_LO, MASTER_CONTROL_RING_COUNT_HI)
    }
}

bitflags::bitflags! {
    /// RING_OPTIONS bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RingOptions: u32 {
        /// Ring is serviced before normal-priority rings
        const HIGH_PRIORITY = 1 << 0;
        /// Ring is enabled
        const ENABLE = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_reg_layout() {
        assert_eq!(ring_reg(0, RING_CMD_BASE), 0x100);
        assert_eq!(ring_reg(3, RING_RSLT_COUNT), 0x100 + 3 * 0x40 + 0x1C);
        assert!(ring_reg(MAX_RINGS - 1, RING_RSLT_COUNT) + 4 <= REGS_SIZE);
    }

    #[test]
    fn test_master_control_ring_count() {
        let value = MasterControl::enable_value(4);
        assert_eq!(value & 1, 1);
        assert_eq!((value >> 8) & 0x7, 4);
        assert_eq!(MasterControl::enabled_rings(value), 4);
        assert_eq!(MasterControl::enabled_rings(MasterControl::RESET.bits()), 0);
    }
}
