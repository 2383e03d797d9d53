//! Bring-up configuration.
//!
//! The ranges here normally come from the device tree
//! (`fsl,bpid-range`, `fsl,fqid-range`, `fsl,pool-channel-range`,
//! `fsl,cgrid-range`). Defaults match a typical single-partition board.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use rbos_pka::PkaConfig;

use crate::error::{OffloadError, OffloadResult};

/// A contiguous run of IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    /// First ID
    pub base: u32,
    /// Number of IDs
    pub count: u32,
}

impl IdRange {
    /// `[base, base + count)`
    pub const fn new(base: u32, count: u32) -> Self {
        Self { base, count }
    }

    /// One past the last ID
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.count as u64
    }

    /// Do the two ranges share an ID
    pub const fn overlaps(&self, other: &IdRange) -> bool {
        (self.base as u64) < other.end() && (other.base as u64) < self.end()
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}..{:#x})", self.base, self.end())
    }
}

/// PKA ring setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkaRingConfig {
    /// Engine parameters
    pub engine: PkaConfig,
    /// Rings to set up (1..=4)
    pub num_rings: u32,
    /// Operand bytes per ring slot
    pub elem_size: u32,
    /// Service these rings ahead of others
    pub high_priority: bool,
}

impl Default for PkaRingConfig {
    fn default() -> Self {
        Self {
            engine: PkaConfig::default(),
            num_rings: 4,
            elem_size: 512,
            high_priority: false,
        }
    }
}

/// Everything [`crate::Offload::init`] needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Buffer-pool IDs owned by this partition
    pub bpids: Vec<IdRange>,
    /// Frame-queue IDs owned by this partition
    pub fqids: Vec<IdRange>,
    /// Pool channels owned by this partition
    pub pool_channels: Vec<IdRange>,
    /// Congestion-group IDs owned by this partition
    pub cgrids: Vec<IdRange>,
    /// FQIDs claimed up front for fixed-purpose queues
    pub reserved_fqids: Vec<IdRange>,
    /// PKA rings; `None` leaves the engine unconfigured
    pub pka: Option<PkaRingConfig>,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            bpids: vec![IdRange::new(32, 32)],
            fqids: vec![IdRange::new(256, 256)],
            pool_channels: vec![IdRange::new(0x21, 0xf)],
            cgrids: vec![IdRange::new(0, 256)],
            reserved_fqids: Vec::new(),
            pka: Some(PkaRingConfig::default()),
        }
    }
}

impl OffloadConfig {
    /// Config with no ranges and no PKA rings
    pub fn empty() -> Self {
        Self {
            bpids: Vec::new(),
            fqids: Vec::new(),
            pool_channels: Vec::new(),
            cgrids: Vec::new(),
            reserved_fqids: Vec::new(),
            pka: None,
        }
    }

    /// Check ranges before anything is seeded.
    ///
    /// Seeding an empty, wrapping or overlapping range is fatal inside the
    /// allocator, so those are rejected here.
    pub fn validate(&self) -> OffloadResult<()> {
        for ranges in [&self.bpids, &self.fqids, &self.pool_channels, &self.cgrids] {
            check_ranges(ranges)?;
        }
        check_ranges(&self.reserved_fqids)?;

        for reserved in &self.reserved_fqids {
            if !covered_by(&self.fqids, reserved) {
                return Err(OffloadError::InvalidConfig("reserved FQIDs outside FQID ranges"));
            }
        }

        if let Some(pka) = &self.pka {
            if pka.num_rings == 0 || pka.num_rings > pka.engine.max_rings {
                return Err(OffloadError::InvalidConfig("PKA ring count out of range"));
            }
        }
        Ok(())
    }
}

/// Is every ID of `target` in one of `ranges`; adjacent ranges count as one
fn covered_by(ranges: &[IdRange], target: &IdRange) -> bool {
    let mut cursor = target.base as u64;
    while cursor < target.end() {
        match ranges.iter().find(|r| (r.base as u64) <= cursor && cursor < r.end()) {
            Some(r) => cursor = r.end(),
            None => return false,
        }
    }
    true
}

fn check_ranges(ranges: &[IdRange]) -> OffloadResult<()> {
    for (i, range) in ranges.iter().enumerate() {
        if range.count == 0 {
            return Err(OffloadError::InvalidConfig("empty ID range"));
        }
        if range.end() > u64::from(u32::MAX) + 1 {
            return Err(OffloadError::InvalidConfig("ID range wraps the ID space"));
        }
        if ranges[..i].iter().any(|r| r.overlaps(range)) {
            return Err(OffloadError::InvalidConfig("overlapping ID ranges"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(OffloadConfig::default().validate(), Ok(()));
        assert_eq!(OffloadConfig::empty().validate(), Ok(()));
    }

    #[test]
    fn test_id_range_relations() {
        let a = IdRange::new(10, 10);
        assert!(a.overlaps(&IdRange::new(19, 5)));
        assert!(!a.overlaps(&IdRange::new(20, 5)));
        assert!(covered_by(&[a], &IdRange::new(12, 8)));
        assert!(!covered_by(&[a], &IdRange::new(12, 9)));
        assert_eq!(IdRange::new(u32::MAX, 1).end(), 1 << 32);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let mut cfg = OffloadConfig::empty();
        cfg.bpids = vec![IdRange::new(0, 0)];
        assert!(cfg.validate().is_err());

        cfg.bpids = vec![IdRange::new(0, 8), IdRange::new(4, 8)];
        assert_eq!(cfg.validate(), Err(OffloadError::InvalidConfig("overlapping ID ranges")));

        cfg.bpids = vec![IdRange::new(u32::MAX, 2)];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_stray_reservation() {
        let mut cfg = OffloadConfig::default();
        cfg.reserved_fqids = vec![IdRange::new(500, 20)];
        assert!(cfg.validate().is_err());

        cfg.reserved_fqids = vec![IdRange::new(256, 4)];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_reservation_across_adjacent_ranges() {
        let mut cfg = OffloadConfig::empty();
        cfg.fqids = vec![IdRange::new(300, 20), IdRange::new(256, 44)];
        cfg.reserved_fqids = vec![IdRange::new(290, 20)];
        assert_eq!(cfg.validate(), Ok(()));

        // Gap at 320..330
        cfg.fqids.push(IdRange::new(330, 10));
        cfg.reserved_fqids = vec![IdRange::new(310, 25)];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_pka_ring_count() {
        let mut cfg = OffloadConfig::default();
        cfg.pka = Some(PkaRingConfig {
            num_rings: 5,
            ..Default::default()
        });
        assert!(cfg.validate().is_err());
    }
}
