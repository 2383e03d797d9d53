//! # ID Range Allocator
//!
//! Generic allocator for ranges of 32-bit hardware resource IDs. One
//! instance per namespace; every operation runs in a single critical
//! section on the instance's free list.
//!
//! ## Operations
//!
//! | Operation        | Effect on the free list                          |
//! |------------------|--------------------------------------------------|
//! | `alloc`          | first-fit aligned carve, optional partial grant  |
//! | `free` / `seed`  | insert and coalesce with both neighbours         |
//! | `free_validated` | `free` only the runs a predicate accepts         |
//! | `reserve`        | carve an exact, caller-chosen range              |
//! | `pop_any`        | remove the head node whole                       |

use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{ResourceError, ResourceResult};
use crate::interval::{Fit, FreeList, Interval};

/// Allocator over one ID namespace
#[derive(Debug)]
pub struct IdAllocator {
    /// Name used in log messages
    name: &'static str,
    /// Free intervals
    list: Mutex<FreeList>,
}

impl IdAllocator {
    /// Create an allocator with nothing free
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            list: Mutex::new(FreeList::new()),
        }
    }

    /// Create an allocator owning `[base, base + count)`
    pub fn with_range(name: &'static str, base: u32, count: u32) -> Self {
        let allocator = Self::new(name);
        allocator.seed(base, count);
        allocator
    }

    /// Name of the namespace
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Allocate `count` IDs whose base is a multiple of `align`.
    ///
    /// `align == 0` behaves as 1. With `partial` set, a request that no free
    /// interval can hold is granted the largest aligned block available
    /// instead; the second element of the result is the number of IDs
    /// actually granted.
    pub fn alloc(&self, count: u32, align: u32, partial: bool) -> ResourceResult<(u32, u32)> {
        if count == 0 {
            return Err(ResourceError::InvalidArgument);
        }

        let mut list = self.list.lock();
        log::trace!("{}: alloc_range({}, {}, {})", self.name, count, align, partial);
        dump(self.name, &list);

        let result = match list.find_fit(count, align, partial) {
            Some(fit) => {
                list.carve(fit);
                Ok((fit.base, fit.num))
            },
            None => Err(ResourceError::OutOfMemory),
        };

        match result {
            Ok((base, num)) => log::trace!("{}: returning {} at {}", self.name, num, base),
            Err(_) => log::trace!("{}: no fit", self.name),
        }
        dump(self.name, &list);
        result
    }

    /// Return `[base, base + count)` to the pool.
    ///
    /// # Panics
    ///
    /// If `count` is zero or the range overlaps anything already free.
    pub fn free(&self, base: u32, count: u32) {
        let mut list = self.list.lock();
        log::trace!("{}: release_range({}, {})", self.name, base, count);
        list.insert(base, count);
        dump(self.name, &list);
    }

    /// Hand an initial range to the allocator
    pub fn seed(&self, base: u32, count: u32) {
        log::debug!("{}: seeding [{}..{})", self.name, base, base as u64 + count as u64);
        self.free(base, count);
    }

    /// Return `[base, base + count)` to the pool, skipping IDs `is_valid`
    /// rejects.
    ///
    /// The range is split into maximal runs of accepted IDs and each run is
    /// freed. Rejected IDs stay allocated forever; their number is returned
    /// so the caller can report the leak.
    pub fn free_validated<F>(&self, base: u32, count: u32, is_valid: Option<F>) -> u32
    where
        F: Fn(u32) -> bool,
    {
        let end = base as u64 + count as u64;
        let mut run_start = base as u64;
        let mut valid_mode = false;
        let mut invalid = 0u32;

        for id in base as u64..end {
            let valid = is_valid.as_ref().map_or(true, |f| f(id as u32));
            if !valid_mode {
                // looking for a valid ID to end an invalid run
                if valid {
                    if id > run_start {
                        log::error!("{}: IDs [{}..{}) are not idle", self.name, run_start, id);
                    }
                    valid_mode = true;
                    run_start = id;
                } else {
                    invalid += 1;
                }
            } else if !valid {
                self.free(run_start as u32, (id - run_start) as u32);
                valid_mode = false;
                run_start = id;
                invalid += 1;
            }
        }

        if valid_mode {
            self.free(run_start as u32, (end - run_start) as u32);
        } else if end > run_start {
            log::error!("{}: IDs [{}..{}) are not idle", self.name, run_start, end);
        }

        invalid
    }

    /// Claim exactly `[base, base + count)`.
    ///
    /// Fails with `OutOfMemory` unless a single free interval holds the
    /// whole range.
    pub fn reserve(&self, base: u32, count: u32) -> ResourceResult<()> {
        if count == 0 || base as u64 + count as u64 > 1u64 << 32 {
            return Err(ResourceError::InvalidArgument);
        }

        let mut list = self.list.lock();
        log::trace!("{}: reserve_range({}, {})", self.name, base, count);

        let node = list.find_containing(base, count).ok_or(ResourceError::OutOfMemory)?;
        list.carve(Fit {
            node,
            base,
            num: count,
        });
        dump(self.name, &list);
        Ok(())
    }

    /// Remove a whole free interval (the lowest one) without splitting it
    pub fn pop_any(&self) -> ResourceResult<(u32, u32)> {
        let mut list = self.list.lock();
        let node = list.pop_first().ok_or(ResourceError::Empty)?;
        log::trace!("{}: popped {}", self.name, node);
        Ok((node.base, node.num))
    }

    /// Number of free IDs
    pub fn free_count(&self) -> u64 {
        self.list.lock().free_count()
    }

    /// Number of free intervals
    pub fn node_count(&self) -> usize {
        self.list.lock().len()
    }

    /// Nothing left to allocate
    pub fn is_empty(&self) -> bool {
        self.list.lock().is_empty()
    }

    /// Copy of the free list, in ascending base order
    pub fn snapshot(&self) -> Vec<Interval> {
        self.list.lock().to_vec()
    }
}

fn dump(name: &str, list: &FreeList) {
    if log::log_enabled!(log::Level::Trace) {
        for node in list.iter() {
            log::trace!("{}:   free {}", name, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn pairs(a: &IdAllocator) -> Vec<(u32, u32)> {
        a.snapshot().iter().map(|n| (n.base, n.num)).collect()
    }

    #[test]
    fn test_seeded_scenario() {
        let a = IdAllocator::new("test");
        a.free(100, 50);

        assert_eq!(a.alloc(10, 4, false), Ok((100, 10)));
        assert_eq!(pairs(&a), vec![(110, 40)]);

        assert_eq!(a.alloc(45, 1, true), Ok((110, 40)));
        assert!(a.is_empty());

        a.free(100, 10);
        a.free(110, 40);
        assert_eq!(pairs(&a), vec![(100, 50)]);
    }

    #[test]
    fn test_alloc_is_first_fit() {
        let a = IdAllocator::new("test");
        a.free(0, 4);
        a.free(10, 100);
        a.free(200, 8);
        // [0,4) is too small, [10,110) is the first node that fits, even
        // though [200,208) would be a tighter fit
        assert_eq!(a.alloc(8, 1, false), Ok((10, 8)));
    }

    #[test]
    fn test_alloc_alignment() {
        let a = IdAllocator::with_range("test", 3, 100);
        for align in [1u32, 2, 4, 8, 16, 32] {
            let (base, num) = a.alloc(3, align, false).unwrap();
            assert_eq!(base % align, 0);
            assert_eq!(num, 3);
        }
    }

    #[test]
    fn test_alloc_zero_align_is_one() {
        let a = IdAllocator::with_range("test", 7, 10);
        assert_eq!(a.alloc(2, 0, false), Ok((7, 2)));
    }

    #[test]
    fn test_alloc_without_partial_fails() {
        let a = IdAllocator::with_range("test", 0, 8);
        assert_eq!(a.alloc(9, 1, false), Err(ResourceError::OutOfMemory));
        assert_eq!(pairs(&a), vec![(0, 8)]);
    }

    #[test]
    fn test_alloc_partial_grants_largest_aligned_block() {
        let a = IdAllocator::new("test");
        a.free(1, 9); // aligned to 4: [4,10) -> 6
        a.free(20, 5); // aligned to 4: [20,25) -> 5
        let (base, num) = a.alloc(32, 4, true).unwrap();
        assert_eq!((base, num), (4, 6));
        assert!(num < 32);
        assert_eq!(pairs(&a), vec![(1, 3), (20, 5)]);
    }

    #[test]
    fn test_alloc_zero_count_rejected() {
        let a = IdAllocator::with_range("test", 0, 8);
        assert_eq!(a.alloc(0, 1, false), Err(ResourceError::InvalidArgument));
    }

    #[test]
    fn test_alloc_then_free_restores_structure() {
        let a = IdAllocator::new("test");
        a.free(0, 10);
        a.free(20, 10);
        a.free(40, 10);
        let before = a.snapshot();

        let (base, n) = a.alloc(5, 1, false).unwrap();
        a.free(base, n);
        assert_eq!(a.snapshot(), before);
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn test_double_free_is_fatal() {
        let a = IdAllocator::with_range("test", 0, 16);
        let (base, n) = a.alloc(4, 1, false).unwrap();
        a.free(base, n);
        a.free(base, n);
    }

    #[test]
    fn test_free_validated_splits_runs() {
        let a = IdAllocator::new("test");
        // 13 and 16 are busy
        let invalid = a.free_validated(10, 10, Some(|id: u32| id != 13 && id != 16));
        assert_eq!(invalid, 2);
        assert_eq!(pairs(&a), vec![(10, 3), (14, 2), (17, 3)]);
    }

    #[test]
    fn test_free_validated_leading_invalid() {
        let a = IdAllocator::new("test");
        let invalid = a.free_validated(0, 6, Some(|id: u32| id >= 2));
        assert_eq!(invalid, 2);
        assert_eq!(pairs(&a), vec![(2, 4)]);
    }

    #[test]
    fn test_free_validated_without_predicate() {
        let a = IdAllocator::new("test");
        let invalid = a.free_validated(5, 5, None::<fn(u32) -> bool>);
        assert_eq!(invalid, 0);
        assert_eq!(pairs(&a), vec![(5, 5)]);
    }

    #[test]
    fn test_free_validated_all_invalid() {
        let a = IdAllocator::new("test");
        assert_eq!(a.free_validated(0, 4, Some(|_: u32| false)), 4);
        assert!(a.is_empty());
    }

    #[test]
    fn test_reserve() {
        let a = IdAllocator::with_range("test", 0, 100);
        assert_eq!(a.reserve(10, 5), Ok(()));
        assert_eq!(pairs(&a), vec![(0, 10), (15, 85)]);

        // straddles the reserved hole
        assert_eq!(a.reserve(8, 4), Err(ResourceError::OutOfMemory));
        assert_eq!(a.reserve(0, 10), Ok(()));
        assert_eq!(pairs(&a), vec![(15, 85)]);
    }

    #[test]
    fn test_reserve_rejects_degenerate_ranges() {
        let a = IdAllocator::with_range("test", 0, 100);
        assert_eq!(a.reserve(10, 0), Err(ResourceError::InvalidArgument));
        assert_eq!(a.reserve(u32::MAX, 2), Err(ResourceError::InvalidArgument));
        assert_eq!(pairs(&a), vec![(0, 100)]);
    }

    #[test]
    fn test_pop_any_takes_whole_node() {
        let a = IdAllocator::new("test");
        a.free(30, 5);
        a.free(10, 5);
        assert_eq!(a.pop_any(), Ok((10, 5)));
        assert_eq!(a.pop_any(), Ok((30, 5)));
        assert_eq!(a.pop_any(), Err(ResourceError::Empty));
    }

    /// Deterministic generator so the mixed workload is reproducible
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) as u32
        }
    }

    #[test]
    fn test_mixed_workload_conserves_ids() {
        const BASE: u32 = 1000;
        const COUNT: u32 = 512;

        let a = IdAllocator::with_range("test", BASE, COUNT);
        let mut held: Vec<(u32, u32)> = Vec::new();
        let mut rng = Lcg(0x5eed);

        for _ in 0..2000 {
            if held.is_empty() || rng.next() % 3 != 0 {
                let count = rng.next() % 24 + 1;
                let align = 1 << (rng.next() % 4);
                let partial = rng.next() % 2 == 0;
                if let Ok((base, num)) = a.alloc(count, align, partial) {
                    assert_eq!(base % align, 0);
                    assert!(num <= count);
                    held.push((base, num));
                }
            } else {
                let idx = rng.next() as usize % held.len();
                let (base, num) = held.swap_remove(idx);
                a.free(base, num);
            }

            // free + held covers the seeded range exactly once
            let mut ids: Vec<u32> = Vec::new();
            for node in a.snapshot() {
                ids.extend(node.base..node.base + node.num);
            }
            for &(b, n) in &held {
                ids.extend(b..b + n);
            }
            ids.sort_unstable();
            assert_eq!(ids.len(), COUNT as usize);
            assert!(ids.iter().copied().eq(BASE..BASE + COUNT));

            assert!(a.list.lock().is_coalesced());
        }
    }

    #[test]
    fn test_concurrent_alloc_free_conserves_ids() {
        const BASE: u32 = 4096;
        const COUNT: u32 = 1024;
        const THREADS: u64 = 4;

        let a = IdAllocator::with_range("test", BASE, COUNT);

        let held: Vec<(u32, u32)> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|t| {
                    let a = &a;
                    s.spawn(move || {
                        let mut rng = Lcg(0xC0FFEE + t);
                        let mut mine: Vec<(u32, u32)> = Vec::new();
                        for _ in 0..1000 {
                            if mine.is_empty() || rng.next() % 3 != 0 {
                                let count = rng.next() % 16 + 1;
                                let align = 1 << (rng.next() % 3);
                                if let Ok(grant) = a.alloc(count, align, true) {
                                    mine.push(grant);
                                }
                            } else {
                                let idx = rng.next() as usize % mine.len();
                                let (base, num) = mine.swap_remove(idx);
                                a.free(base, num);
                            }
                        }
                        mine
                    })
                })
                .collect();
            workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
        });

        // No ID handed to two threads, none lost
        let mut ids: Vec<u32> = Vec::new();
        for node in a.snapshot() {
            ids.extend(node.base..node.base + node.num);
        }
        for &(b, n) in &held {
            ids.extend(b..b + n);
        }
        ids.sort_unstable();
        assert!(ids.iter().copied().eq(BASE..BASE + COUNT));
        assert!(a.list.lock().is_coalesced());

        for (base, num) in held {
            a.free(base, num);
        }
        assert_eq!(a.free_count(), COUNT as u64);
        assert_eq!(pairs(&a), vec![(BASE, COUNT)]);
    }
}
