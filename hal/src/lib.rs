//! # RBOS Hardware Abstraction Layer
//!
//! The small slice of hardware access the offload core needs: a capability
//! to read and write 32-bit registers and byte ranges at fixed offsets
//! inside a mapped region.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         rbos-hal                            │
//! │  ┌──────────────────┐  ┌──────────────┐  ┌──────────────┐  │
//! │  │  RegisterFile    │  │  MmioRegion  │  │  RamRegion   │  │
//! │  │  (capability)    │◀─│  (volatile)  │  │  (host/sim)  │  │
//! │  └──────────────────┘  └──────────────┘  └──────────────┘  │
//! │                         fence::*                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers never do pointer arithmetic on device memory themselves; they
//! hold a [`RegisterFile`] and address it by byte offset.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod fence;
pub mod mmio;
pub mod ram;
pub mod regfile;

pub use error::{HalError, HalResult};
pub use mmio::MmioRegion;
pub use ram::RamRegion;
pub use regfile::RegisterFile;
