//! # PKA Context
//!
//! Owns the engine's register file and window RAM, the ring table built
//! by [`PkaContext::setup_rings`], and the enqueue/dequeue protocol.
//!
//! ## Enqueue
//!
//! ```text
//!   ring full? ──yes──> RingFull
//!       │
//!   place operands in data slot ──too big──> InvalidArgument
//!       │
//!   data_tail += elem_size, copy operands
//!       │
//!   write barrier, slots += 1
//!       │
//!   descriptor -> cmd_tail, write barrier, kick CMD_COUNT
//!       │
//!   cmd_tail += 64
//! ```
//!
//! ## Dequeue
//!
//! ```text
//!   RSLT_COUNT == 0 ──> NoResult
//!       │
//!   read barrier, result <- cmd_head, retire one in RSLT_COUNT
//!       │
//!   cmd_head += 64, slots -= 1, copy result vectors out
//! ```
//!
//! Enqueue and dequeue take `&mut self`; callers sharing a context wrap it
//! in a lock.

use arrayvec::ArrayVec;
use rbos_hal::{fence, RegisterFile};

use crate::descriptor::{
    HwResultDescriptor, PkaCommand, PkaResultDescriptor, MAX_RESULTS, RSLT_DESC_SIZE,
};
use crate::error::{PkaError, PkaResult};
use crate::regs::{self, MasterControl, RingOptions, MAX_RINGS, WINDOW_RAM_SIZE};
use crate::ring::{compute_layout, operand_offsets, PkaRing};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Engine parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkaConfig {
    /// Bytes of window RAM shared by all rings
    pub window_ram_size: u32,
    /// Rings the engine implements
    pub max_rings: u32,
}

impl Default for PkaConfig {
    fn default() -> Self {
        Self {
            window_ram_size: WINDOW_RAM_SIZE,
            max_rings: MAX_RINGS as u32,
        }
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Driver state for one PKA engine
pub struct PkaContext<R: RegisterFile, W: RegisterFile> {
    regs: R,
    window: W,
    config: PkaConfig,
    rings: ArrayVec<PkaRing, MAX_RINGS>,
    configured: bool,
}

impl<R: RegisterFile, W: RegisterFile> PkaContext<R, W> {
    /// Context over the engine's registers and window RAM; rings are not
    /// set up yet.
    ///
    /// A window smaller than `config.window_ram_size` is rejected.
    pub fn new(regs: R, window: W, config: PkaConfig) -> PkaResult<Self> {
        if config.max_rings == 0 || config.max_rings as usize > MAX_RINGS {
            return Err(PkaError::InvalidArgument("max_rings out of range"));
        }
        if window.check_range(0, config.window_ram_size as usize).is_err() {
            return Err(PkaError::InvalidArgument("window RAM smaller than configured"));
        }
        if regs
            .check_range(regs::ring_reg(config.max_rings as usize - 1, regs::RING_RSLT_COUNT), 4)
            .is_err()
        {
            return Err(PkaError::InvalidArgument("register region too small"));
        }

        Ok(Self {
            regs,
            window,
            config,
            rings: ArrayVec::new(),
            configured: false,
        })
    }

    /// Engine parameters
    pub fn config(&self) -> &PkaConfig {
        &self.config
    }

    /// Register file
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Window RAM
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Has `setup_rings` run
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Rings set up
    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    /// Ring `index`
    pub fn ring(&self, index: usize) -> PkaResult<&PkaRing> {
        if !self.configured {
            return Err(PkaError::NotConfigured);
        }
        self.rings
            .get(index)
            .ok_or(PkaError::InvalidArgument("ring index out of range"))
    }

    fn ring_mut(&mut self, index: usize) -> PkaResult<&mut PkaRing> {
        if !self.configured {
            return Err(PkaError::NotConfigured);
        }
        self.rings
            .get_mut(index)
            .ok_or(PkaError::InvalidArgument("ring index out of range"))
    }

    /// Free command slots on ring `index`
    pub fn command_slots_available(&self, index: usize) -> PkaResult<u32> {
        self.ring(index).map(PkaRing::slots_available)
    }

    /// Results the engine has posted on ring `index` and not yet retired
    pub fn pending_results(&self, index: usize) -> PkaResult<u32> {
        self.ring(index)?;
        Ok(self.regs.read_u32(regs::ring_reg(index, regs::RING_RSLT_COUNT)))
    }

    // =========================================================================
    // SETUP
    // =========================================================================

    /// Partition window RAM into `num_rings` rings of `elem_size` operand
    /// bytes per slot and program the engine.
    ///
    /// Runs once per context.
    pub fn setup_rings(&mut self, num_rings: u32, elem_size: u32, high_priority: bool) -> PkaResult<()> {
        if self.configured {
            return Err(PkaError::AlreadyConfigured);
        }
        if num_rings > self.config.max_rings {
            return Err(PkaError::InvalidArgument("ring count out of range"));
        }

        let layouts = compute_layout(self.config.window_ram_size, num_rings, elem_size)?;

        let mut options = RingOptions::ENABLE;
        if high_priority {
            options |= RingOptions::HIGH_PRIORITY;
        }

        // Hold the engine while ring registers change
        self.regs.write_u32(regs::MASTER_CONTROL, MasterControl::RESET.bits());

        for (i, layout) in layouts.iter().enumerate() {
            self.regs.write_u32(regs::ring_reg(i, regs::RING_CMD_BASE), layout.cmd_base);
            self.regs.write_u32(regs::ring_reg(i, regs::RING_RSLT_BASE), layout.cmd_base);
            self.regs.write_u32(regs::ring_reg(i, regs::RING_SIZE), layout.num_elems);
            self.regs.write_u32(regs::ring_reg(i, regs::RING_DATA_BASE), layout.data_base);
            self.regs.write_u32(regs::ring_reg(i, regs::RING_ELEM_SIZE), layout.elem_size);
            self.regs.write_u32(regs::ring_reg(i, regs::RING_OPTIONS), options.bits());

            log::debug!(
                "pka: ring {} cmd {:#x}..{:#x} data {:#x}..{:#x} ({} x {} bytes)",
                i,
                layout.cmd_base,
                layout.cmd_end(),
                layout.data_base,
                layout.data_end(),
                layout.num_elems,
                layout.elem_size
            );

            self.rings.push(PkaRing::new(*layout));
        }

        fence::mmio_write_barrier();
        self.regs.write_u32(regs::MASTER_CONTROL, MasterControl::enable_value(num_rings));
        self.configured = true;

        log::info!(
            "pka: {} ring(s), {} slots each, elem size {}{}",
            num_rings,
            layouts[0].num_elems,
            elem_size,
            if high_priority { ", high priority" } else { "" }
        );
        Ok(())
    }

    // =========================================================================
    // ENQUEUE / DEQUEUE
    // =========================================================================

    /// Submit `cmd` on ring `index`.
    ///
    /// Fails with [`PkaError::RingFull`] when every slot is occupied, and
    /// with [`PkaError::InvalidArgument`] when the operands do not fit one
    /// data slot. Neither failure changes the ring.
    pub fn put_command_on_ring(&mut self, index: usize, cmd: &PkaCommand<'_>) -> PkaResult<()> {
        let ring = self.ring_mut(index)?;
        if ring.is_full() {
            return Err(PkaError::RingFull);
        }

        let slot = ring.data_tail();
        let ptrs = operand_offsets(slot, ring.elem_size(), &cmd.lengths())?;
        ring.advance_data_tail();

        for (&ptr, operand) in ptrs.iter().zip(cmd.operands.iter()) {
            if !operand.is_empty() {
                self.window.write_bytes(ptr as usize, bytemuck::cast_slice(operand));
            }
        }

        // Operands must land before the slot is claimed and announced
        fence::mmio_write_barrier();

        let ring = &mut self.rings[index];
        ring.occupy_slot();
        let cmd_tail = ring.cmd_tail();

        let hw = cmd.to_hw(ptrs);
        self.window.write_bytes(cmd_tail as usize, hw.as_bytes());
        fence::mmio_write_barrier();
        self.regs.write_u32(regs::ring_reg(index, regs::RING_CMD_COUNT), 1);

        self.rings[index].advance_cmd_tail();

        log::trace!(
            "pka: ring {} cmd {:#x} tag {:#x} at {:#x}, {} in use",
            index,
            cmd.command,
            cmd.tag,
            cmd_tail,
            self.rings[index].cmd_slots_in_use()
        );
        Ok(())
    }

    /// Take the oldest result from ring `index`.
    ///
    /// Each non-empty buffer in `outputs` receives that many words of the
    /// matching result vector; a non-zero result code is reported in the
    /// descriptor, not as an error. Fails with [`PkaError::NoResult`] when
    /// the engine has nothing posted.
    pub fn get_result_from_ring(
        &mut self,
        index: usize,
        outputs: &mut [&mut [u32]],
    ) -> PkaResult<PkaResultDescriptor> {
        if outputs.len() > MAX_RESULTS {
            return Err(PkaError::InvalidArgument("too many result vectors"));
        }
        self.ring_mut(index)?;

        let count_reg = regs::ring_reg(index, regs::RING_RSLT_COUNT);
        let posted = self.regs.read_u32(count_reg);
        if posted == 0 {
            return Err(PkaError::NoResult);
        }
        fence::mmio_read_barrier();

        let ring = &mut self.rings[index];
        if ring.cmd_slots_in_use() == 0 {
            log::error!(
                "pka: ring {} reports {} result(s) with no command outstanding",
                index,
                posted
            );
            return Err(PkaError::NoResult);
        }
        let cmd_head = ring.cmd_head();
        let mut raw = [0u8; RSLT_DESC_SIZE as usize];
        self.window.read_bytes(cmd_head as usize, &mut raw);
        let hw = HwResultDescriptor::from_bytes(&raw);

        self.regs.write_u32(count_reg, 1);
        ring.advance_head();
        ring.release_slot();

        let result = PkaResultDescriptor::from(&hw);
        for (i, out) in outputs.iter_mut().enumerate() {
            if out.is_empty() {
                continue;
            }
            let ptr = result.ptrs[i] as usize;
            let bytes = out.len() * 4;
            if self.window.check_range(ptr, bytes).is_err() {
                log::error!(
                    "pka: ring {} result {} at {:#x}+{} outside window RAM",
                    index,
                    i,
                    ptr,
                    bytes
                );
                continue;
            }
            self.window.read_bytes(ptr, bytemuck::cast_slice_mut(out));
        }

        log::trace!(
            "pka: ring {} result tag {:#x} code {} at {:#x}",
            index,
            result.tag,
            result.result_code,
            cmd_head
        );
        Ok(result)
    }

}

impl<R: RegisterFile, W: RegisterFile> core::fmt::Debug for PkaContext<R, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PkaContext")
            .field("config", &self.config)
            .field("configured", &self.configured)
            .field("rings", &self.rings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimPka, SIM_OP_ADD, SIM_OP_ECHO, SIM_OP_FAIL};

    fn context(sim: &SimPka) -> PkaContext<&SimPka, &rbos_hal::RamRegion> {
        PkaContext::new(sim, sim.window(), PkaConfig::default()).unwrap()
    }

    #[test]
    fn test_calls_before_setup() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        let cmd = PkaCommand::new(SIM_OP_ECHO, 1);
        assert_eq!(ctx.put_command_on_ring(0, &cmd), Err(PkaError::NotConfigured));
        assert_eq!(ctx.get_result_from_ring(0, &mut []), Err(PkaError::NotConfigured));
        assert_eq!(ctx.num_rings(), 0);
    }

    #[test]
    fn test_setup_rejects_ring_count() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        assert!(matches!(ctx.setup_rings(0, 256, false), Err(PkaError::InvalidArgument(_))));
        assert!(matches!(ctx.setup_rings(5, 256, false), Err(PkaError::InvalidArgument(_))));
        assert!(!ctx.is_configured());
    }

    #[test]
    fn test_setup_runs_once() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(2, 256, true).unwrap();
        assert_eq!(ctx.setup_rings(2, 256, true), Err(PkaError::AlreadyConfigured));
        assert_eq!(ctx.num_rings(), 2);
    }

    #[test]
    fn test_setup_programs_registers() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(2, 256, true).unwrap();

        let ring1 = *ctx.ring(1).unwrap().layout();
        assert_eq!(sim.read_u32(regs::ring_reg(1, regs::RING_CMD_BASE)), ring1.cmd_base);
        assert_eq!(sim.read_u32(regs::ring_reg(1, regs::RING_SIZE)), ring1.num_elems);
        assert_eq!(sim.read_u32(regs::ring_reg(1, regs::RING_DATA_BASE)), ring1.data_base);
        assert_eq!(
            sim.read_u32(regs::ring_reg(1, regs::RING_OPTIONS)),
            (RingOptions::ENABLE | RingOptions::HIGH_PRIORITY).bits()
        );
        assert_eq!(sim.read_u32(regs::MASTER_CONTROL), MasterControl::enable_value(2));
    }

    #[test]
    fn test_ring_full_then_drain_one() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        // 16 KiB / (64 + 4032) = 4 slots
        ctx.setup_rings(1, 4032, false).unwrap();
        assert_eq!(ctx.ring(0).unwrap().num_elems(), 4);

        for tag in 0..4 {
            ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_ECHO, tag)).unwrap();
        }
        assert_eq!(
            ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_ECHO, 4)),
            Err(PkaError::RingFull)
        );

        sim.process(0);
        let res = ctx.get_result_from_ring(0, &mut []).unwrap();
        assert_eq!(res.tag, 0);
        assert_eq!(ctx.ring(0).unwrap().cmd_slots_in_use(), 3);

        ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_ECHO, 5)).unwrap();
        assert_eq!(ctx.ring(0).unwrap().cmd_slots_in_use(), 4);
    }

    #[test]
    fn test_no_result_until_processed() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 256, false).unwrap();

        assert_eq!(ctx.get_result_from_ring(0, &mut []), Err(PkaError::NoResult));
        ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_ECHO, 1)).unwrap();
        assert_eq!(ctx.get_result_from_ring(0, &mut []), Err(PkaError::NoResult));
        assert_eq!(ctx.pending_results(0), Ok(0));

        sim.process(0);
        assert_eq!(ctx.pending_results(0), Ok(1));
        assert!(ctx.get_result_from_ring(0, &mut []).is_ok());
        assert_eq!(ctx.pending_results(0), Ok(0));
        assert!(PkaError::NoResult.is_transient());
    }

    #[test]
    fn test_results_in_submission_order() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 128, false).unwrap();
        let num_elems = ctx.ring(0).unwrap().num_elems() as u64;

        // Several laps around the ring
        let mut next_tag = 0u64;
        let mut expected = 0u64;
        while expected < num_elems * 3 {
            while ctx.command_slots_available(0).unwrap() > 0 {
                ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_ECHO, next_tag)).unwrap();
                next_tag += 1;
            }
            sim.process(0);
            // Drain half, leaving some outstanding across the wrap
            for _ in 0..(num_elems / 2).max(1) {
                let res = ctx.get_result_from_ring(0, &mut []).unwrap();
                assert_eq!(res.tag, expected);
                expected += 1;
            }
            let ring = ctx.ring(0).unwrap();
            assert!(ring.cmd_slots_in_use() <= ring.num_elems());
        }
    }

    #[test]
    fn test_operands_round_trip_through_engine() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(2, 256, false).unwrap();

        let a = [1u32, 2, 3, 4];
        let b = [10u32, 20, 30, 40];
        let cmd = PkaCommand::new(SIM_OP_ADD, 0xfeed).with_operand(0, &a).with_operand(1, &b);
        ctx.put_command_on_ring(1, &cmd).unwrap();
        sim.process(1);

        let mut sum = [0u32; 4];
        let res = ctx.get_result_from_ring(1, &mut [&mut sum]).unwrap();
        assert!(res.is_success());
        assert_eq!(res.tag, 0xfeed);
        assert_eq!(res.lengths[0], 4);
        assert_eq!(sum, [11, 22, 33, 44]);
    }

    #[test]
    fn test_failed_operation_is_data() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 256, false).unwrap();

        ctx.put_command_on_ring(0, &PkaCommand::new(SIM_OP_FAIL, 3)).unwrap();
        sim.process(0);
        let res = ctx.get_result_from_ring(0, &mut []).unwrap();
        assert_eq!(res.tag, 3);
        assert!(!res.is_success());
        assert_eq!(ctx.ring(0).unwrap().cmd_slots_in_use(), 0);
    }

    #[test]
    fn test_oversized_operands_leave_ring_untouched() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 64, false).unwrap();
        let before = ctx.ring(0).unwrap().clone();

        let big = [0u32; 17];
        let cmd = PkaCommand::new(SIM_OP_ECHO, 1).with_operand(0, &big);
        assert!(matches!(ctx.put_command_on_ring(0, &cmd), Err(PkaError::InvalidArgument(_))));
        assert_eq!(ctx.ring(0).unwrap(), &before);
        assert_eq!(sim.pending_commands(0), 0);
    }

    #[test]
    fn test_stray_result_on_idle_ring() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 256, false).unwrap();

        // Engine posts a result nothing was submitted for
        sim.write_u32(regs::ring_reg(0, regs::RING_CMD_COUNT), 1);
        sim.process(0);
        assert_eq!(ctx.pending_results(0), Ok(1));

        assert_eq!(ctx.get_result_from_ring(0, &mut []), Err(PkaError::NoResult));
        let ring = ctx.ring(0).unwrap();
        assert_eq!(ring.cmd_slots_in_use(), 0);
        assert_eq!(ring.cmd_head(), ring.layout().cmd_base);
    }

    #[test]
    fn test_bad_ring_index_and_outputs() {
        let sim = SimPka::new();
        let mut ctx = context(&sim);
        ctx.setup_rings(1, 64, false).unwrap();

        assert!(matches!(ctx.ring(1), Err(PkaError::InvalidArgument(_))));
        assert!(matches!(
            ctx.put_command_on_ring(3, &PkaCommand::new(SIM_OP_ECHO, 0)),
            Err(PkaError::InvalidArgument(_))
        ));

        let mut bufs: [[u32; 1]; 5] = [[0]; 5];
        let [a, b, c, d, e] = &mut bufs;
        let mut outputs: [&mut [u32]; 5] = [a, b, c, d, e];
        assert!(matches!(
            ctx.get_result_from_ring(0, &mut outputs),
            Err(PkaError::InvalidArgument(_))
        ));
    }
}
