//! # RBOS PKA Driver
//!
//! Command/result rings of the public-key accelerator.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          PkaContext                               │
//! │                                                                   │
//! │  caller ── PkaCommand ──▶ put_command_on_ring ──▶ CMD_COUNT kick  │
//! │                                  │                      │         │
//! │                                  ▼                      ▼         │
//! │                  ┌────────────────────────────┐  ┌────────────┐   │
//! │                  │ window RAM: ring 0..3      │◀─│   engine   │   │
//! │                  │  cmd slots │ data slots    │  └────────────┘   │
//! │                  └────────────────────────────┘         │         │
//! │                                  │                      ▼         │
//! │  caller ◀─ PkaResultDescriptor ─ get_result_from_ring ◀ RSLT_COUNT│
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let mut pka = PkaContext::new(regs, window, PkaConfig::default())?;
//! pka.setup_rings(2, 512, false)?;
//!
//! pka.put_command_on_ring(0, &PkaCommand::new(op, tag).with_operand(0, &modulus))?;
//! loop {
//!     match pka.get_result_from_ring(0, &mut [&mut out]) {
//!         Ok(res) => break res,
//!         Err(e) if e.is_transient() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod context;
pub mod descriptor;
pub mod error;
pub mod regs;
pub mod ring;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use context::{PkaConfig, PkaContext};
pub use descriptor::{PkaCommand, PkaResultDescriptor, MAX_OPERANDS, MAX_RESULTS};
pub use error::{PkaError, PkaResult};
pub use ring::{PkaRing, RingLayout};
