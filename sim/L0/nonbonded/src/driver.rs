//! Whole-system force evaluation over every block.
//!
//! [`compute_forces`] walks the blocks in order on the calling thread. With
//! the `parallel` feature, [`compute_forces_parallel`] splits the blocks over
//! rayon workers. Each worker owns a force shard; shards are summed at the
//! end, so no two workers ever write the same memory.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::error::{NonbondedError, Result};
use crate::kernel::{BlockKernel, KernelInputs};
use crate::neighbors::BlockNeighbors;
use crate::params::RECORD_WIDTH;

fn check_forces<N: BlockNeighbors + ?Sized>(
    inputs: &KernelInputs<'_, N>,
    forces: &[f32],
) -> Result<()> {
    let expected = RECORD_WIDTH * inputs.num_atoms();
    if forces.len() != expected {
        return Err(NonbondedError::length_mismatch(
            "force array",
            expected,
            forces.len(),
        ));
    }
    Ok(())
}

/// Evaluate every block and add the forces into `forces`.
///
/// `forces` holds four values per atom; the fourth is left untouched.
/// Returns the total energy when `include_energy` is set.
///
/// # Errors
///
/// Returns [`NonbondedError::LengthMismatch`] if `forces` does not hold four
/// values per atom.
pub fn compute_forces<N: BlockNeighbors + ?Sized>(
    kernel: &BlockKernel,
    inputs: &KernelInputs<'_, N>,
    forces: &mut [f32],
    include_energy: bool,
) -> Result<Option<f64>> {
    check_forces(inputs, forces)?;

    let num_blocks = inputs.neighbors().num_blocks();
    debug!(
        num_blocks,
        num_atoms = inputs.num_atoms(),
        include_energy,
        "computing nonbonded forces"
    );

    let mut energy = 0.0f64;
    for block in 0..num_blocks {
        let block_energy = include_energy.then_some(&mut energy);
        kernel.calculate_block(inputs, block, forces, block_energy);
    }

    debug!(energy = include_energy.then_some(energy), "nonbonded forces done");
    Ok(include_energy.then_some(energy))
}

/// Parallel version of [`compute_forces`].
///
/// Blocks are distributed over the rayon thread pool. Results match
/// [`compute_forces`] up to floating-point summation order.
///
/// # Errors
///
/// Returns [`NonbondedError::LengthMismatch`] if `forces` does not hold four
/// values per atom.
#[cfg(feature = "parallel")]
pub fn compute_forces_parallel<N: BlockNeighbors + Sync + ?Sized>(
    kernel: &BlockKernel,
    inputs: &KernelInputs<'_, N>,
    forces: &mut [f32],
    include_energy: bool,
) -> Result<Option<f64>> {
    check_forces(inputs, forces)?;

    let num_blocks = inputs.neighbors().num_blocks();
    let len = forces.len();
    debug!(
        num_blocks,
        num_atoms = inputs.num_atoms(),
        include_energy,
        threads = rayon::current_num_threads(),
        "computing nonbonded forces in parallel"
    );

    let (shard, energy) = (0..num_blocks)
        .into_par_iter()
        .fold(
            || (vec![0.0f32; len], 0.0f64),
            |(mut shard, mut energy), block| {
                let block_energy = include_energy.then_some(&mut energy);
                kernel.calculate_block(inputs, block, &mut shard, block_energy);
                (shard, energy)
            },
        )
        .reduce(
            || (vec![0.0f32; len], 0.0f64),
            |(mut a, energy_a), (b, energy_b)| {
                for (x, y) in a.iter_mut().zip(&b) {
                    *x += y;
                }
                (a, energy_a + energy_b)
            },
        );

    for (f, s) in forces.iter_mut().zip(&shard) {
        *f += s;
    }

    debug!(energy = include_energy.then_some(energy), "nonbonded forces done");
    Ok(include_energy.then_some(energy))
}
