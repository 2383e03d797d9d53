//! # Bman/Qman ID Namespaces
//!
//! The queue manager and buffer manager hand out four kinds of hardware
//! IDs. Each kind gets its own [`IdAllocator`]; [`QbmanIds`] owns all four
//! and is created once at subsystem bring-up.
//!
//! | Namespace     | Owner | Used for                          |
//! |---------------|-------|-----------------------------------|
//! | BPID          | Bman  | buffer pools                      |
//! | FQID          | Qman  | frame queues                      |
//! | pool channel  | Qman  | pool channels                     |
//! | CGRID         | Qman  | congestion groups                 |
//!
//! Releasing IDs goes through an [`IdleProbe`]: an ID that hardware still
//! considers live (an FQ that did not retire, a pool channel with queues
//! still scheduled on it) is never returned to the pool. It is leaked and
//! logged instead.

use alloc::boxed::Box;
use core::fmt;

use crate::allocator::IdAllocator;
use crate::error::ResourceResult;

// =============================================================================
// NAMESPACE
// =============================================================================

/// Hardware ID namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Buffer-pool IDs
    Bpid,
    /// Frame-queue IDs
    Fqid,
    /// Pool-channel IDs
    PoolChannel,
    /// Congestion-group IDs
    Cgrid,
}

impl Namespace {
    /// All namespaces, in bring-up order
    pub const ALL: [Namespace; 4] = [
        Namespace::Bpid,
        Namespace::Fqid,
        Namespace::PoolChannel,
        Namespace::Cgrid,
    ];

    /// Short name used in logs
    pub const fn name(self) -> &'static str {
        match self {
            Namespace::Bpid => "bpid",
            Namespace::Fqid => "fqid",
            Namespace::PoolChannel => "pool",
            Namespace::Cgrid => "cgrid",
        }
    }

    /// Human-readable description
    pub const fn description(self) -> &'static str {
        match self {
            Namespace::Bpid => "Buffer pool ID",
            Namespace::Fqid => "Frame queue ID",
            Namespace::PoolChannel => "Pool channel",
            Namespace::Cgrid => "Congestion group ID",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// IDLE PROBE
// =============================================================================

/// Query whether hardware is done with an ID.
///
/// Implemented by the portal driver, which retires frame queues, drains
/// buffer pools and checks channel and CGR state before answering.
pub trait IdleProbe: Send + Sync {
    /// `true` if `id` in `namespace` can be handed out again
    fn is_idle(&self, namespace: Namespace, id: u32) -> bool;
}

/// Probe that accepts every ID
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysIdle;

impl IdleProbe for AlwaysIdle {
    fn is_idle(&self, _namespace: Namespace, _id: u32) -> bool {
        true
    }
}

impl<F> IdleProbe for F
where
    F: Fn(Namespace, u32) -> bool + Send + Sync,
{
    fn is_idle(&self, namespace: Namespace, id: u32) -> bool {
        self(namespace, id)
    }
}

// =============================================================================
// QBMAN IDS
// =============================================================================

/// The four Bman/Qman ID allocators and the probe that guards releases
pub struct QbmanIds {
    bpids: IdAllocator,
    fqids: IdAllocator,
    pools: IdAllocator,
    cgrids: IdAllocator,
    probe: Box<dyn IdleProbe>,
}

impl fmt::Debug for QbmanIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QbmanIds")
            .field("bpids", &self.bpids)
            .field("fqids", &self.fqids)
            .field("pools", &self.pools)
            .field("cgrids", &self.cgrids)
            .finish_non_exhaustive()
    }
}

impl QbmanIds {
    /// Create empty allocators guarded by `probe`
    pub fn new(probe: Box<dyn IdleProbe>) -> Self {
        Self {
            bpids: IdAllocator::new(Namespace::Bpid.name()),
            fqids: IdAllocator::new(Namespace::Fqid.name()),
            pools: IdAllocator::new(Namespace::PoolChannel.name()),
            cgrids: IdAllocator::new(Namespace::Cgrid.name()),
            probe,
        }
    }

    /// Allocator backing `namespace`
    pub fn allocator(&self, namespace: Namespace) -> &IdAllocator {
        match namespace {
            Namespace::Bpid => &self.bpids,
            Namespace::Fqid => &self.fqids,
            Namespace::PoolChannel => &self.pools,
            Namespace::Cgrid => &self.cgrids,
        }
    }

    /// Hand a range discovered at probe time to `namespace`
    pub fn seed_range(&self, namespace: Namespace, base: u32, count: u32) {
        log::info!(
            "{} range [{}..{}) ({})",
            namespace.description(),
            base,
            base as u64 + count as u64,
            count
        );
        self.allocator(namespace).seed(base, count);
    }

    /// Allocate `count` IDs from `namespace`. Returns `(base, granted)`.
    pub fn alloc_range(
        &self,
        namespace: Namespace,
        count: u32,
        align: u32,
        partial: bool,
    ) -> ResourceResult<(u32, u32)> {
        self.allocator(namespace).alloc(count, align, partial)
    }

    /// Claim a specific range in `namespace`
    pub fn reserve_range(&self, namespace: Namespace, base: u32, count: u32) -> ResourceResult<()> {
        self.allocator(namespace).reserve(base, count)
    }

    /// Release `[base, base + count)` back to `namespace`.
    ///
    /// Every ID is checked with the probe first; IDs still in use are leaked.
    /// Returns the number of leaked IDs.
    pub fn release_range(&self, namespace: Namespace, base: u32, count: u32) -> u32 {
        let probe = &*self.probe;
        let leaked = self.allocator(namespace).free_validated(
            base,
            count,
            Some(|id: u32| probe.is_idle(namespace, id)),
        );

        if leaked != 0 {
            log::error!(
                "{} range [{}..{}) ({}) had {} leaks",
                namespace.description(),
                base,
                base as u64 + count as u64,
                count,
                leaked
            );
        }
        leaked
    }

    // -------------------------------------------------------------------------
    // Bman
    // -------------------------------------------------------------------------

    /// Allocate a range of buffer-pool IDs
    pub fn alloc_bpid_range(&self, count: u32, align: u32, partial: bool) -> ResourceResult<(u32, u32)> {
        self.alloc_range(Namespace::Bpid, count, align, partial)
    }

    /// Allocate a single buffer-pool ID
    pub fn alloc_bpid(&self) -> ResourceResult<u32> {
        self.alloc_bpid_range(1, 0, false).map(|(base, _)| base)
    }

    /// Release buffer-pool IDs
    pub fn release_bpid_range(&self, base: u32, count: u32) -> u32 {
        self.release_range(Namespace::Bpid, base, count)
    }

    /// Reserve specific buffer-pool IDs
    pub fn reserve_bpid_range(&self, base: u32, count: u32) -> ResourceResult<()> {
        self.reserve_range(Namespace::Bpid, base, count)
    }

    /// Seed the buffer-pool ID allocator
    pub fn seed_bpid_range(&self, base: u32, count: u32) {
        self.seed_range(Namespace::Bpid, base, count);
    }

    // -------------------------------------------------------------------------
    // Qman: frame queues
    // -------------------------------------------------------------------------

    /// Allocate a range of frame-queue IDs
    pub fn alloc_fqid_range(&self, count: u32, align: u32, partial: bool) -> ResourceResult<(u32, u32)> {
        self.alloc_range(Namespace::Fqid, count, align, partial)
    }

    /// Allocate a single frame-queue ID
    pub fn alloc_fqid(&self) -> ResourceResult<u32> {
        self.alloc_fqid_range(1, 0, false).map(|(base, _)| base)
    }

    /// Release frame-queue IDs
    pub fn release_fqid_range(&self, base: u32, count: u32) -> u32 {
        self.release_range(Namespace::Fqid, base, count)
    }

    /// Reserve specific frame-queue IDs
    pub fn reserve_fqid_range(&self, base: u32, count: u32) -> ResourceResult<()> {
        self.reserve_range(Namespace::Fqid, base, count)
    }

    /// Seed the frame-queue ID allocator
    pub fn seed_fqid_range(&self, base: u32, count: u32) {
        self.seed_range(Namespace::Fqid, base, count);
    }

    // -------------------------------------------------------------------------
    // Qman: pool channels
    // -------------------------------------------------------------------------

    /// Allocate a range of pool channels
    pub fn alloc_pool_range(&self, count: u32, align: u32, partial: bool) -> ResourceResult<(u32, u32)> {
        self.alloc_range(Namespace::PoolChannel, count, align, partial)
    }

    /// Allocate a single pool channel
    pub fn alloc_pool(&self) -> ResourceResult<u32> {
        self.alloc_pool_range(1, 0, false).map(|(base, _)| base)
    }

    /// Release pool channels
    pub fn release_pool_range(&self, base: u32, count: u32) -> u32 {
        self.release_range(Namespace::PoolChannel, base, count)
    }

    /// Reserve specific pool channels
    pub fn reserve_pool_range(&self, base: u32, count: u32) -> ResourceResult<()> {
        self.reserve_range(Namespace::PoolChannel, base, count)
    }

    /// Seed the pool-channel allocator
    pub fn seed_pool_range(&self, base: u32, count: u32) {
        self.seed_range(Namespace::PoolChannel, base, count);
    }

    // -------------------------------------------------------------------------
    // Qman: congestion groups
    // -------------------------------------------------------------------------

    /// Allocate a range of congestion-group IDs
    pub fn alloc_cgrid_range(&self, count: u32, align: u32, partial: bool) -> ResourceResult<(u32, u32)> {
        self.alloc_range(Namespace::Cgrid, count, align, partial)
    }

    /// Allocate a single congestion-group ID
    pub fn alloc_cgrid(&self) -> ResourceResult<u32> {
        self.alloc_cgrid_range(1, 0, false).map(|(base, _)| base)
    }

    /// Release congestion-group IDs
    pub fn release_cgrid_range(&self, base: u32, count: u32) -> u32 {
        self.release_range(Namespace::Cgrid, base, count)
    }

    /// Reserve specific congestion-group IDs
    pub fn reserve_cgrid_range(&self, base: u32, count: u32) -> ResourceResult<()> {
        self.reserve_range(Namespace::Cgrid, base, count)
    }

    /// Seed the congestion-group ID allocator
    pub fn seed_cgrid_range(&self, base: u32, count: u32) {
        self.seed_range(Namespace::Cgrid, base, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn ids() -> QbmanIds {
        let ids = QbmanIds::new(Box::new(AlwaysIdle));
        ids.seed_bpid_range(0, 64);
        ids.seed_fqid_range(256, 512);
        ids.seed_pool_range(1, 15);
        ids.seed_cgrid_range(0, 256);
        ids
    }

    fn pairs(a: &IdAllocator) -> Vec<(u32, u32)> {
        a.snapshot().iter().map(|n| (n.base, n.num)).collect()
    }

    #[test]
    fn test_namespaces_are_independent() {
        let ids = ids();
        assert_eq!(ids.alloc_bpid(), Ok(0));
        assert_eq!(ids.alloc_cgrid(), Ok(0));
        assert_eq!(ids.alloc_fqid(), Ok(256));
        assert_eq!(ids.alloc_pool(), Ok(1));

        assert_eq!(ids.allocator(Namespace::Bpid).free_count(), 63);
        assert_eq!(ids.allocator(Namespace::Fqid).free_count(), 511);
    }

    #[test]
    fn test_release_round_trip() {
        let ids = ids();
        let (base, n) = ids.alloc_fqid_range(32, 32, false).unwrap();
        assert_eq!(base % 32, 0);
        assert_eq!(ids.release_fqid_range(base, n), 0);
        assert_eq!(pairs(ids.allocator(Namespace::Fqid)), vec![(256, 512)]);
    }

    #[test]
    fn test_release_leaks_busy_ids() {
        let busy_fq = 300u32;
        let ids = QbmanIds::new(Box::new(move |ns: Namespace, id: u32| {
            !(ns == Namespace::Fqid && id == busy_fq)
        }));
        ids.seed_fqid_range(256, 64);

        let (base, n) = ids.alloc_fqid_range(64, 1, false).unwrap();
        assert_eq!(ids.release_fqid_range(base, n), 1);
        assert_eq!(
            pairs(ids.allocator(Namespace::Fqid)),
            vec![(256, 44), (301, 19)]
        );
    }

    #[test]
    fn test_probe_sees_namespace() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let ids = QbmanIds::new(Box::new(|ns: Namespace, _id: u32| {
            assert_eq!(ns, Namespace::Cgrid);
            CALLS.fetch_add(1, Ordering::Relaxed);
            true
        }));
        ids.seed_cgrid_range(0, 8);
        let (base, n) = ids.alloc_cgrid_range(8, 1, false).unwrap();
        ids.release_cgrid_range(base, n);
        assert_eq!(CALLS.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_reserve_then_exhaust() {
        let ids = ids();
        ids.reserve_pool_range(1, 15).unwrap();
        assert_eq!(ids.alloc_pool(), Err(ResourceError::OutOfMemory));
        ids.release_pool_range(4, 2);
        assert_eq!(ids.alloc_pool_range(4, 1, true), Ok((4, 2)));
    }

    #[test]
    fn test_namespace_names() {
        let names: Vec<&str> = Namespace::ALL.iter().map(|ns| ns.name()).collect();
        assert_eq!(names, vec!["bpid", "fqid", "pool", "cgrid"]);
    }
}
