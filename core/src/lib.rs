//! # RBOS Offload Core
//!
//! Brings up the queue-manager ID namespaces and the PKA engine from one
//! [`OffloadConfig`], and hands out the resulting state.
//!
//! ## Bring-up Order
//!
//! 1. Validate every configured range
//! 2. Seed BPID, FQID, pool-channel and CGRID allocators
//! 3. Reserve fixed-purpose FQIDs
//! 4. Set up PKA rings, if configured
//!
//! Nothing is seeded when validation fails. A PKA failure after seeding
//! drops the half-built state.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod config;
pub mod error;

use alloc::boxed::Box;

use rbos_hal::RegisterFile;
use rbos_pka::PkaContext;
use rbos_resource::{IdleProbe, Namespace, QbmanIds};

pub use config::{IdRange, OffloadConfig, PkaRingConfig};
pub use error::{OffloadError, OffloadResult};

/// Live offload state
#[derive(Debug)]
pub struct Offload<R: RegisterFile, W: RegisterFile> {
    ids: QbmanIds,
    pka: PkaContext<R, W>,
}

impl<R: RegisterFile, W: RegisterFile> Offload<R, W> {
    /// Bring up ID namespaces and the PKA engine.
    ///
    /// `probe` guards every later ID release; `regs` and `window` are the
    /// engine's register block and window RAM.
    pub fn init(
        config: &OffloadConfig,
        probe: Box<dyn IdleProbe>,
        regs: R,
        window: W,
    ) -> OffloadResult<Self> {
        config.validate()?;

        let ids = QbmanIds::new(probe);
        let namespaces = [
            (Namespace::Bpid, &config.bpids),
            (Namespace::Fqid, &config.fqids),
            (Namespace::PoolChannel, &config.pool_channels),
            (Namespace::Cgrid, &config.cgrids),
        ];
        for (namespace, ranges) in namespaces {
            if ranges.is_empty() {
                log::warn!("no {} configured", namespace.description());
            }
            for range in ranges {
                ids.seed_range(namespace, range.base, range.count);
            }
        }

        for range in &config.reserved_fqids {
            ids.reserve_fqid_range(range.base, range.count)?;
            log::debug!("reserved FQIDs {}", range);
        }

        let engine = config.pka.map(|p| p.engine).unwrap_or_default();
        let mut pka = PkaContext::new(regs, window, engine)?;
        match &config.pka {
            Some(rings) => pka.setup_rings(rings.num_rings, rings.elem_size, rings.high_priority)?,
            None => log::info!("pka: no rings configured"),
        }

        log::info!("offload core up");
        Ok(Self { ids, pka })
    }

    /// Resource-ID namespaces
    pub fn ids(&self) -> &QbmanIds {
        &self.ids
    }

    /// PKA engine
    pub fn pka(&self) -> &PkaContext<R, W> {
        &self.pka
    }

    /// PKA engine, for submitting and collecting work
    pub fn pka_mut(&mut self) -> &mut PkaContext<R, W> {
        &mut self.pka
    }
}
