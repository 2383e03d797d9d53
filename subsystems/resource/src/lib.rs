//! # RBOS Resource-ID Allocation
//!
//! Allocation of hardware resource IDs (buffer pools, frame queues, pool
//! channels, congestion groups) out of the ranges the device tree assigns
//! to this partition.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         QbmanIds                                │
//! │   ┌─────────┐   ┌─────────┐   ┌─────────┐   ┌─────────┐        │
//! │   │  BPID   │   │  FQID   │   │  POOL   │   │  CGRID  │        │
//! │   └────┬────┘   └────┬────┘   └────┬────┘   └────┬────┘        │
//! │        └─────────────┴──────┬──────┴─────────────┘             │
//! │                             ▼                                   │
//! │                  IdAllocator (spin::Mutex)                      │
//! │                             │                                   │
//! │                             ▼                                   │
//! │              FreeList: ordered, coalesced intervals             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! 1. Free intervals never overlap and are never adjacent.
//! 2. Allocated plus free IDs always equal the seeded ranges.
//! 3. Freeing a range that overlaps free IDs is a fatal bug, not an error.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod allocator;
pub mod error;
pub mod interval;
pub mod qbman;

pub use allocator::IdAllocator;
pub use error::{ResourceError, ResourceResult};
pub use interval::{FreeList, Interval};
pub use qbman::{AlwaysIdle, IdleProbe, Namespace, QbmanIds};
