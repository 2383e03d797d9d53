//! # PKA Ring Geometry and Cursors
//!
//! Window RAM is split evenly between the configured rings. Each ring's
//! share is a command area of fixed 64-byte descriptor slots followed by a
//! data area of `elem_size`-byte operand slots, one per descriptor slot:
//!
//! ```text
//! window RAM
//! ┌──────────────────────────┬──────────────────────────┬─────
//! │          ring 0          │          ring 1          │ ...
//! ├────────────┬─────────────┼────────────┬─────────────┤
//! │ cmd slots  │ data slots  │ cmd slots  │ data slots  │
//! │ n * 64     │ n * elem    │ n * 64     │ n * elem    │
//! └────────────┴─────────────┴────────────┴─────────────┘
//!   ^cmd_base   ^data_base
//! ```
//!
//! Results are written by the engine over the command slot they complete,
//! so `cmd_head` is both the oldest outstanding command and the next
//! result to read.

use crate::descriptor::{CMD_DESC_SIZE, MAX_OPERANDS};
use crate::error::{PkaError, PkaResult};
use crate::regs::MAX_RINGS;

/// Geometry of one ring inside window RAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    /// Descriptor slots
    pub num_elems: u32,
    /// Operand bytes per slot
    pub elem_size: u32,
    /// Window offset of the first command slot
    pub cmd_base: u32,
    /// Window offset of the first data slot
    pub data_base: u32,
}

impl RingLayout {
    /// One past the last command slot
    pub const fn cmd_end(&self) -> u32 {
        self.cmd_base + self.num_elems * CMD_DESC_SIZE
    }

    /// One past the last data slot
    pub const fn data_end(&self) -> u32 {
        self.data_base + self.num_elems * self.elem_size
    }
}

/// Partition `window_size` bytes into `num_rings` equal rings.
///
/// Each share is rounded down to 8 bytes; a share holds
/// `share / (64 + elem_size)` slots.
pub fn compute_layout(
    window_size: u32,
    num_rings: u32,
    elem_size: u32,
) -> PkaResult<arrayvec::ArrayVec<RingLayout, MAX_RINGS>> {
    if num_rings == 0 || num_rings as usize > MAX_RINGS {
        return Err(PkaError::InvalidArgument("ring count out of range"));
    }
    if elem_size == 0 || elem_size % 4 != 0 {
        return Err(PkaError::InvalidArgument("element size must be a non-zero multiple of 4"));
    }

    let ring_mem = (window_size / num_rings) & !7;
    let slot_size = match CMD_DESC_SIZE.checked_add(elem_size) {
        Some(size) if size <= ring_mem => size,
        _ => return Err(PkaError::InvalidArgument("element size leaves no room for a slot")),
    };
    let num_elems = ring_mem / slot_size;

    // Last ring must end inside the window
    let end = u64::from(num_rings - 1) * u64::from(ring_mem)
        + u64::from(num_elems) * u64::from(slot_size);
    if end > u64::from(window_size) {
        return Err(PkaError::InvalidArgument("ring layout exceeds window RAM"));
    }

    let layouts = (0..num_rings)
        .map(|i| {
            let cmd_base = i * ring_mem;
            RingLayout {
                num_elems,
                elem_size,
                cmd_base,
                data_base: cmd_base + num_elems * CMD_DESC_SIZE,
            }
        })
        .collect();
    Ok(layouts)
}

/// Place operands of `lengths` words back to back from `slot`.
///
/// Unused operands get the offset where the next one would start. Fails
/// if the operands do not fit in one `elem_size` slot.
pub fn operand_offsets(
    slot: u32,
    elem_size: u32,
    lengths: &[u32; MAX_OPERANDS],
) -> PkaResult<[u32; MAX_OPERANDS]> {
    let mut offsets = [0u32; MAX_OPERANDS];
    let mut used: u64 = 0;
    for (offset, &words) in offsets.iter_mut().zip(lengths) {
        *offset = slot + used as u32;
        used += u64::from(words) * 4;
        if used > u64::from(elem_size) {
            return Err(PkaError::InvalidArgument("data size exceeds ring elem size"));
        }
    }
    Ok(offsets)
}

/// One command/result ring: fixed geometry plus live cursors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkaRing {
    layout: RingLayout,
    cmd_head: u32,
    cmd_tail: u32,
    data_head: u32,
    data_tail: u32,
    cmd_slots_in_use: u32,
}

impl PkaRing {
    /// Empty ring over `layout`
    pub const fn new(layout: RingLayout) -> Self {
        Self {
            layout,
            cmd_head: layout.cmd_base,
            cmd_tail: layout.cmd_base,
            data_head: layout.data_base,
            data_tail: layout.data_base,
            cmd_slots_in_use: 0,
        }
    }

    /// Ring geometry
    pub const fn layout(&self) -> &RingLayout {
        &self.layout
    }

    /// Descriptor slots
    pub const fn num_elems(&self) -> u32 {
        self.layout.num_elems
    }

    /// Operand bytes per slot
    pub const fn elem_size(&self) -> u32 {
        self.layout.elem_size
    }

    /// Oldest outstanding command, and next result to read
    pub const fn cmd_head(&self) -> u32 {
        self.cmd_head
    }

    /// Next command slot to write
    pub const fn cmd_tail(&self) -> u32 {
        self.cmd_tail
    }

    /// Data slot of the oldest outstanding command
    pub const fn data_head(&self) -> u32 {
        self.data_head
    }

    /// Next data slot to write
    pub const fn data_tail(&self) -> u32 {
        self.data_tail
    }

    /// Commands submitted and not yet dequeued
    pub const fn cmd_slots_in_use(&self) -> u32 {
        self.cmd_slots_in_use
    }

    /// Free command slots
    pub const fn slots_available(&self) -> u32 {
        self.layout.num_elems - self.cmd_slots_in_use
    }

    /// Every slot is occupied
    pub const fn is_full(&self) -> bool {
        self.cmd_slots_in_use >= self.layout.num_elems
    }

    /// Consume the data slot at `data_tail`
    pub(crate) fn advance_data_tail(&mut self) {
        self.data_tail = wrap(
            self.data_tail + self.layout.elem_size,
            self.layout.data_base,
            self.layout.data_end(),
        );
    }

    /// Consume the command slot at `cmd_tail`
    pub(crate) fn advance_cmd_tail(&mut self) {
        self.cmd_tail = wrap(
            self.cmd_tail + CMD_DESC_SIZE,
            self.layout.cmd_base,
            self.layout.cmd_end(),
        );
    }

    /// Retire the slot at `cmd_head` and its data slot
    pub(crate) fn advance_head(&mut self) {
        self.cmd_head = wrap(
            self.cmd_head + CMD_DESC_SIZE,
            self.layout.cmd_base,
            self.layout.cmd_end(),
        );
        self.data_head = wrap(
            self.data_head + self.layout.elem_size,
            self.layout.data_base,
            self.layout.data_end(),
        );
    }

    pub(crate) fn occupy_slot(&mut self) {
        debug_assert!(!self.is_full());
        self.cmd_slots_in_use += 1;
    }

    pub(crate) fn release_slot(&mut self) {
        debug_assert!(self.cmd_slots_in_use > 0);
        self.cmd_slots_in_use = self.cmd_slots_in_use.saturating_sub(1);
    }
}

#[inline]
const fn wrap(next: u32, base: u32, end: u32) -> u32 {
    if next >= end {
        base
    } else {
        next
    }
}
