//! Short-range nonbonded forces for molecular simulation.
//!
//! This crate evaluates Lennard-Jones and electrostatic pair interactions
//! between blocks of eight atoms and their neighbors, eight lanes at a time,
//! on top of [`sim_simd`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐   ┌────────────────────┐   ┌────────────────────┐
//! │  NonbondedConfig   │──▶│    BlockKernel     │◀──│  Ewald/Dispersion  │
//! │ cutoff, switch,    │   │ immutable, shared  │   │  tables (built or  │
//! │ electrostatics     │   │ between threads    │   │  supplied)         │
//! └────────────────────┘   └─────────┬──────────┘   └────────────────────┘
//!                                    │ calculate_block(block)
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ KernelInputs: posq records, AtomParameters, neighbor list, box      │
//! │ per block: classify image → transpose → per neighbor:               │
//! │   displacement → mask → LJ (+switch, +dispersion) → Coulomb → force │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`NonbondedConfig`] - cutoff, switching, electrostatics, dispersion
//! - [`BlockKernel`] - the configured kernel with its tables
//! - [`KernelInputs`] - validated per-step arrays
//! - [`NeighborList`] / [`BlockNeighbors`] - block neighbor data
//! - [`PeriodicBox`] - rectangular or reduced triclinic box
//! - [`compute_forces`] - evaluate every block
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Vector3;
//! use sim_nonbonded::{
//!     AtomParameters, BlockKernel, KernelInputs, NeighborList, NonbondedConfig,
//!     compute_forces, pack_posq, unpack_forces,
//! };
//!
//! let kernel = BlockKernel::new(NonbondedConfig::new()).unwrap();
//!
//! let positions = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.35, 0.0, 0.0)];
//! let posq = pack_posq(&positions, &[1.0, -1.0]).unwrap();
//! let params = vec![AtomParameters::new(0.3, 0.5); 2];
//! let neighbors = NeighborList::all_pairs(2, &[]).unwrap();
//! let inputs = KernelInputs::new(&kernel, &posq, &params, None, &neighbors, None).unwrap();
//!
//! let mut forces = vec![0.0; posq.len()];
//! let energy = compute_forces(&kernel, &inputs, &mut forces, true).unwrap();
//!
//! let forces = unpack_forces(&forces);
//! assert!(energy.unwrap() < 0.0);
//! assert!(forces[0].x > 0.0 && forces[1].x < 0.0);
//! ```
//!
//! # Units
//!
//! Distances in nm, energies in kJ/mol, charges in elementary charges. The
//! Coulomb constant is [`ONE_4PI_EPS0`].
//!
//! # Features
//!
//! - `parallel` - [`compute_forces_parallel`] over rayon
//! - `serde` - serialization of configuration and parameters

#![doc(html_root_url = "https://docs.rs/sim-nonbonded/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,       // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,           // mul_add style changes aren't always clearer
    clippy::doc_markdown,               // Not all technical terms need backticks
    clippy::similar_names,              // r, r2, inv_r
)]

/// Atoms per block; one atom per lane.
pub const BLOCK_SIZE: usize = sim_simd::LANES;

pub mod config;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod neighbors;
pub mod params;
pub mod periodic;
pub mod physics;
pub mod table;

pub use config::{DispersionPme, Electrostatics, NonbondedConfig, ReactionField};
#[cfg(feature = "parallel")]
pub use driver::compute_forces_parallel;
pub use driver::compute_forces;
pub use error::{NonbondedError, Result};
pub use kernel::{BlockKernel, KernelInputs};
pub use neighbors::{ALL_EXCLUDED, BlockNeighbors, NeighborBlock, NeighborList, validate_neighbors};
pub use params::{
    AtomParameters, ONE_4PI_EPS0, RECORD_WIDTH, dispersion_coefficients, pack_posq, unpack_forces,
};
pub use periodic::{BlockImage, PeriodicBox, PeriodicMode, classify_block};
pub use table::{DispersionTables, EwaldTables, InteractionTable, NUM_TABLE_POINTS};
