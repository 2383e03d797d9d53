//! # Free Interval List
//!
//! The data structure under every ID allocator: a set of disjoint, maximally
//! coalesced free intervals `[base, base + num)` over the 32-bit ID space,
//! kept ordered by `base`.
//!
//! ```text
//!   ID space   0 ........................................ u32::MAX
//!   free       [100,110)      [140,150)      [900,1000)
//!                 ▲               ▲              ▲
//!               node            node           node     (never adjacent)
//! ```
//!
//! Nothing here locks; [`crate::allocator::IdAllocator`] wraps a list in a
//! mutex and calls these primitives from a single critical section.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

// =============================================================================
// INTERVAL
// =============================================================================

/// One free interval `[base, base + num)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// First free ID
    pub base: u32,
    /// Number of free IDs, never zero
    pub num: u32,
}

impl Interval {
    /// Create an interval
    pub const fn new(base: u32, num: u32) -> Self {
        Self { base, num }
    }

    /// One past the last ID. Computed in 64 bits so `[x, 2^32)` is representable.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.num as u64
    }

    /// Whether `[base, base + num)` lies entirely inside this interval
    #[inline]
    pub fn contains_range(&self, base: u32, num: u32) -> bool {
        base >= self.base && base as u64 + num as u64 <= self.end()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}) ({})", self.base, self.end(), self.num)
    }
}

// =============================================================================
// FIT
// =============================================================================

/// Where an allocation request landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    /// Node the block is carved from
    pub node: Interval,
    /// Aligned base of the block
    pub base: u32,
    /// Number of IDs granted
    pub num: u32,
}

// =============================================================================
// FREE LIST
// =============================================================================

/// Ordered set of free intervals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeList {
    /// base -> num
    nodes: BTreeMap<u32, u32>,
}

impl FreeList {
    /// Create an empty list
    pub const fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No free IDs at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of free IDs
    pub fn free_count(&self) -> u64 {
        self.nodes.values().map(|&num| num as u64).sum()
    }

    /// Iterate nodes in ascending base order
    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.nodes.iter().map(|(&base, &num)| Interval::new(base, num))
    }

    /// Copy the nodes out, in order
    pub fn to_vec(&self) -> Vec<Interval> {
        self.iter().collect()
    }

    /// Return `[base, base + num)` to the list, merging with both neighbours.
    ///
    /// # Panics
    ///
    /// If `num` is zero, if the range runs past the ID space, or if it
    /// overlaps a free node. Each of these means the caller lost track of
    /// what it owns (typically a double free).
    pub fn insert(&mut self, base: u32, num: u32) {
        assert!(num != 0, "free of an empty range at {}", base);
        let end = base as u64 + num as u64;
        assert!(
            end <= 1u64 << 32,
            "free of [{}..{}) runs past the ID space",
            base,
            end
        );

        let mut node = Interval::new(base, num);

        let prev = self.nodes.range(..=base).next_back().map(|(&b, &n)| Interval::new(b, n));
        let next = self.nodes.range(base..).next().map(|(&b, &n)| Interval::new(b, n));

        if let Some(next) = next {
            assert!(
                (next.base as u64) >= end,
                "free of {} overlaps free node {}",
                node,
                next
            );
        }
        if let Some(prev) = prev {
            assert!(
                prev.end() <= base as u64,
                "free of {} overlaps free node {}",
                node,
                prev
            );
        }

        // Merge to the left
        if let Some(prev) = prev {
            if prev.end() == base as u64 {
                self.nodes.remove(&prev.base);
                node.base = prev.base;
                node.num += prev.num;
            }
        }

        // Merge to the right
        if let Some(next) = next {
            if next.base as u64 == end {
                self.nodes.remove(&next.base);
                node.num += next.num;
            }
        }

        self.nodes.insert(node.base, node.num);
    }

    /// First-fit search for `count` IDs aligned to `align`.
    ///
    /// Returns the first node that holds the whole aligned block. When no
    /// node does and `partial` is set, returns the node offering the most
    /// aligned IDs (the earliest on ties), truncated to what it holds.
    pub fn find_fit(&self, count: u32, align: u32, partial: bool) -> Option<Fit> {
        let align = align.max(1) as u64;
        let mut best: Option<Fit> = None;

        for node in self.iter() {
            let base = (node.base as u64).div_ceil(align) * align;
            if base >= node.end() {
                // alignment is impossible, regardless of count
                continue;
            }

            let avail = node.end() - base;
            if avail >= count as u64 {
                return Some(Fit {
                    node,
                    base: base as u32,
                    num: count,
                });
            }

            if best.map_or(true, |b| avail > b.num as u64) {
                best = Some(Fit {
                    node,
                    base: base as u32,
                    num: avail as u32,
                });
            }
        }

        if partial {
            best
        } else {
            None
        }
    }

    /// Find the free node that wholly contains `[base, base + num)`
    pub fn find_containing(&self, base: u32, num: u32) -> Option<Interval> {
        self.nodes
            .range(..=base)
            .next_back()
            .map(|(&b, &n)| Interval::new(b, n))
            .filter(|node| node.contains_range(base, num))
    }

    /// Remove `fit.node` and put back whatever is left on either side of
    /// the carved block.
    pub fn carve(&mut self, fit: Fit) {
        let node = fit.node;
        let removed = self.nodes.remove(&node.base);
        debug_assert_eq!(removed, Some(node.num));

        // Left margin
        if fit.base > node.base {
            self.nodes.insert(node.base, fit.base - node.base);
        }

        // Right margin
        let block_end = fit.base as u64 + fit.num as u64;
        if block_end < node.end() {
            self.nodes.insert(block_end as u32, (node.end() - block_end) as u32);
        }
    }

    /// Remove and return the head node, whole
    pub fn pop_first(&mut self) -> Option<Interval> {
        self.nodes.pop_first().map(|(base, num)| Interval::new(base, num))
    }

    /// Check the list is sorted, non-overlapping and fully coalesced
    pub fn is_coalesced(&self) -> bool {
        let mut prev_end: Option<u64> = None;
        for node in self.iter() {
            if node.num == 0 {
                return false;
            }
            if let Some(end) = prev_end {
                if end >= node.base as u64 {
                    return false;
                }
            }
            prev_end = Some(node.end());
        }
        true
    }
}
