//! # Simulated Engine
//!
//! [`SimPka`] stands in for the engine's register block and owns a window
//! RAM. Ring registers are plain storage except the two counters:
//!
//! - a write of N to `RING_CMD_COUNT` queues N more commands
//! - `RING_RSLT_COUNT` reads the posted results; a write of N retires N
//!
//! Nothing runs on its own. [`SimPka::process`] plays the engine for one
//! ring: it walks queued command slots in ring order and overwrites each
//! with its result.

use alloc::vec;

use rbos_hal::{RamRegion, RegisterFile};
use spin::Mutex;

use crate::descriptor::{HwCommandDescriptor, HwResultDescriptor, CMD_DESC_SIZE};
use crate::regs::{self, MasterControl, MAX_RINGS, REGS_SIZE, WINDOW_RAM_SIZE};

/// Result vector 0 is operand A, unchanged
pub const SIM_OP_ECHO: u32 = 0x01;
/// Result vector 0 is A + B word by word, written over A
pub const SIM_OP_ADD: u32 = 0x02;
/// Completes with result code [`SIM_RESULT_FAILED`]
pub const SIM_OP_FAIL: u32 = 0x03;

/// Result code of [`SIM_OP_FAIL`]
pub const SIM_RESULT_FAILED: u8 = 0x01;
/// Result code of an unknown operation
pub const SIM_RESULT_BAD_OPCODE: u8 = 0xFF;

#[derive(Debug, Default, Clone, Copy)]
struct EngineRing {
    queued: u32,
    posted: u32,
    /// Slot index of the next command to process
    slot: u32,
}

/// Software model of the PKA engine
#[derive(Debug)]
pub struct SimPka {
    regs: RamRegion,
    window: RamRegion,
    engine: Mutex<[EngineRing; MAX_RINGS]>,
}

impl SimPka {
    /// Engine with the default window RAM size
    pub fn new() -> Self {
        Self::with_window_size(WINDOW_RAM_SIZE as usize)
    }

    /// Engine with `window_size` bytes of window RAM
    ///
    /// # Panics
    ///
    /// If `window_size` is zero or not a multiple of 4.
    pub fn with_window_size(window_size: usize) -> Self {
        let regs = match RamRegion::new(REGS_SIZE) {
            Ok(r) => r,
            Err(e) => panic!("sim regs: {}", e),
        };
        let window = match RamRegion::new(window_size) {
            Ok(w) => w,
            Err(e) => panic!("sim window: {}", e),
        };
        Self {
            regs,
            window,
            engine: Mutex::new([EngineRing::default(); MAX_RINGS]),
        }
    }

    /// Window RAM shared with the driver
    pub fn window(&self) -> &RamRegion {
        &self.window
    }

    /// Commands kicked on `ring` and not yet processed
    pub fn pending_commands(&self, ring: usize) -> u32 {
        self.engine.lock()[ring].queued
    }

    /// Process every queued command on `ring`; returns how many.
    ///
    /// Rings the engine has not enabled in MASTER_CONTROL are left alone.
    pub fn process(&self, ring: usize) -> u32 {
        let control = self.regs.read_u32(regs::MASTER_CONTROL);
        if ring as u32 >= MasterControl::enabled_rings(control) {
            return 0;
        }

        let mut engine = self.engine.lock();
        let state = &mut engine[ring];

        let cmd_base = self.regs.read_u32(regs::ring_reg(ring, regs::RING_CMD_BASE));
        let num_elems = self.regs.read_u32(regs::ring_reg(ring, regs::RING_SIZE));
        if num_elems == 0 {
            return 0;
        }

        let done = state.queued;
        for _ in 0..done {
            let offset = (cmd_base + state.slot * CMD_DESC_SIZE) as usize;
            let mut raw = [0u8; CMD_DESC_SIZE as usize];
            self.window.read_bytes(offset, &mut raw);
            let cmd = HwCommandDescriptor::from_bytes(&raw);

            let result = self.execute(&cmd);
            self.window.write_bytes(offset, result.as_bytes());

            log::trace!("pka-sim: ring {} slot {} tag {:#x} done", ring, state.slot, cmd.tag);
            state.slot = (state.slot + 1) % num_elems;
            state.posted += 1;
        }
        state.queued = 0;
        done
    }

    fn execute(&self, cmd: &HwCommandDescriptor) -> HwResultDescriptor {
        let mut result = HwResultDescriptor {
            tag: cmd.tag,
            command: cmd.command,
            ..Default::default()
        };

        match cmd.command {
            SIM_OP_ECHO => {
                result.ptrs[0] = cmd.ptrs[0];
                result.lengths[0] = cmd.lengths[0];
            },
            SIM_OP_ADD => {
                let len = cmd.lengths[0] as usize;
                let mut a = vec![0u32; len];
                let mut b = vec![0u32; len];
                self.window
                    .read_bytes(cmd.ptrs[0] as usize, bytemuck::cast_slice_mut(&mut a));
                if cmd.lengths[1] as usize >= len {
                    self.window
                        .read_bytes(cmd.ptrs[1] as usize, bytemuck::cast_slice_mut(&mut b));
                }
                for (x, y) in a.iter_mut().zip(&b) {
                    *x = x.wrapping_add(*y);
                }
                self.window.write_bytes(cmd.ptrs[0] as usize, bytemuck::cast_slice(&a));
                result.ptrs[0] = cmd.ptrs[0];
                result.lengths[0] = cmd.lengths[0];
            },
            SIM_OP_FAIL => {
                result.status = HwResultDescriptor::pack_status(SIM_RESULT_FAILED, 0);
            },
            _ => {
                result.status = HwResultDescriptor::pack_status(SIM_RESULT_BAD_OPCODE, 0);
            },
        }
        result
    }

    /// Ring and register of a per-ring counter offset
    fn counter(offset: usize) -> Option<(usize, usize)> {
        let end = regs::RING_REGS_BASE + MAX_RINGS * regs::RING_REGS_STRIDE;
        if !(regs::RING_REGS_BASE..end).contains(&offset) {
            return None;
        }
        let rel = offset - regs::RING_REGS_BASE;
        let reg = rel % regs::RING_REGS_STRIDE;
        match reg {
            regs::RING_CMD_COUNT | regs::RING_RSLT_COUNT => {
                Some((rel / regs::RING_REGS_STRIDE, reg))
            },
            _ => None,
        }
    }
}

impl Default for SimPka {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile for SimPka {
    fn size(&self) -> usize {
        self.regs.size()
    }

    fn read_u32(&self, offset: usize) -> u32 {
        match Self::counter(offset) {
            Some((ring, regs::RING_RSLT_COUNT)) => self.engine.lock()[ring].posted,
            Some((ring, _)) => self.engine.lock()[ring].queued,
            None => self.regs.read_u32(offset),
        }
    }

    fn write_u32(&self, offset: usize, value: u32) {
        match Self::counter(offset) {
            Some((ring, regs::RING_RSLT_COUNT)) => {
                let mut engine = self.engine.lock();
                let posted = &mut engine[ring].posted;
                *posted = posted.saturating_sub(value);
            },
            Some((ring, _)) => self.engine.lock()[ring].queued += value,
            None => self.regs.write_u32(offset, value),
        }
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        self.regs.read_bytes(offset, buf);
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        self.regs.write_bytes(offset, data);
    }
}
