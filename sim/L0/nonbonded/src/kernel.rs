//! The block interaction kernel.
//!
//! [`BlockKernel::calculate_block`] evaluates every interaction between the
//! eight atoms of one block and that block's neighbors:
//!
//! 1. Classify the block's periodic image strategy and find its center.
//! 2. Load the block's `(x, y, z, q)` records, wrap them if the strategy
//!    wraps atoms, and transpose them into lanes.
//! 3. For each neighbor: displacement and `r²`, the include mask
//!    (`!exclusions & r² < rc²`), then Lennard-Jones and Coulomb terms on
//!    the included lanes. The neighbor receives one reduced force; the block
//!    lanes accumulate eight independent sums.
//! 4. Transpose the block sums back and add them into the force array.
//!
//! The electrostatics treatment and the image strategy are both type
//! parameters of the inner loop. They are chosen once per block.

use std::borrow::Cow;

use nalgebra::Vector3;
use sim_simd::{F32x4, F32x8, LANES, Vec3x8};
use tracing::{debug, trace};

use crate::config::{Electrostatics, NonbondedConfig, ReactionField};
use crate::error::{NonbondedError, Result};
use crate::neighbors::{BlockNeighbors, validate_neighbors};
use crate::params::{AtomParameters, ONE_4PI_EPS0, RECORD_WIDTH};
use crate::periodic::{
    BlockImage, ImageFrame, MinimumImage, OpenImage, PerAtomImage, PerInteractionImage,
    PeriodicBox, PeriodicMode, TriclinicImage, classify_block,
};
use crate::physics::{
    BlockParameters, CoulombTerm, DirectCoulomb, EwaldCoulomb, PairTerms, Switch,
    dispersion_correction, lennard_jones,
};
use crate::table::{DispersionTables, EwaldTables};

#[derive(Debug, Clone)]
enum Coulomb {
    Direct,
    ReactionField(ReactionField),
    Ewald { alpha: f32, tables: EwaldTables },
}

/// A configured nonbonded kernel with its interaction tables.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct BlockKernel {
    config: NonbondedConfig,
    cutoff: f32,
    cutoff_squared: f32,
    switch: Option<Switch>,
    coulomb: Coulomb,
    dispersion: Option<DispersionTables>,
}

impl BlockKernel {
    /// Validate `config` and build the tables it needs.
    pub fn new(config: NonbondedConfig) -> Result<Self> {
        config.validate()?;

        let ewald = match (config.electrostatics, config.cutoff) {
            (Electrostatics::Ewald { alpha }, Some(cutoff)) => {
                Some(EwaldTables::new(alpha, cutoff)?)
            }
            _ => None,
        };
        let dispersion = match (config.dispersion, config.cutoff) {
            (Some(pme), Some(cutoff)) => Some(DispersionTables::new(pme.alpha, cutoff)?),
            _ => None,
        };

        Self::with_tables(config, ewald, dispersion)
    }

    /// Validate `config` against tables built elsewhere.
    ///
    /// Ewald tables must be present exactly when Ewald electrostatics is
    /// configured, dispersion tables exactly when the dispersion correction
    /// is, and each must cover the range the kernel will look up.
    pub fn with_tables(
        config: NonbondedConfig,
        ewald: Option<EwaldTables>,
        dispersion: Option<DispersionTables>,
    ) -> Result<Self> {
        config.validate()?;

        let coulomb = match (config.electrostatics, ewald) {
            (Electrostatics::Ewald { alpha }, Some(tables)) => {
                let cutoff = config.cutoff.ok_or(NonbondedError::CutoffRequired {
                    feature: "Ewald electrostatics",
                })?;
                tables.ensure_covers(alpha, cutoff)?;
                Coulomb::Ewald { alpha, tables }
            }
            (Electrostatics::Ewald { .. }, None) => {
                return Err(NonbondedError::invalid_config(
                    "Ewald electrostatics needs Ewald tables",
                ));
            }
            (_, Some(_)) => {
                return Err(NonbondedError::invalid_config(
                    "Ewald tables given without Ewald electrostatics",
                ));
            }
            (Electrostatics::ReactionField(rf), None) => Coulomb::ReactionField(rf),
            (Electrostatics::Coulomb, None) => Coulomb::Direct,
        };

        match (&config.dispersion, &dispersion, config.cutoff) {
            (Some(pme), Some(tables), Some(cutoff)) => tables.ensure_covers(pme.alpha, cutoff)?,
            (None, None, _) => {}
            (Some(_), None, _) => {
                return Err(NonbondedError::invalid_config(
                    "dispersion correction needs dispersion tables",
                ));
            }
            _ => {
                return Err(NonbondedError::invalid_config(
                    "dispersion tables given without the dispersion correction",
                ));
            }
        }

        let switch = config
            .switching_distance
            .zip(config.cutoff)
            .map(|(distance, cutoff)| Switch::new(distance, cutoff));

        debug!(
            cutoff = ?config.cutoff,
            switching = ?config.switching_distance,
            electrostatics = ?config.electrostatics,
            dispersion = ?config.dispersion,
            periodic = config.periodic,
            "built nonbonded kernel"
        );

        Ok(Self {
            cutoff: config.cutoff.unwrap_or(f32::INFINITY),
            cutoff_squared: config.cutoff_squared(),
            config,
            switch,
            coulomb,
            dispersion,
        })
    }

    /// The configuration this kernel evaluates.
    #[must_use]
    pub fn config(&self) -> &NonbondedConfig {
        &self.config
    }

    /// Ewald tables, when Ewald electrostatics is configured.
    #[must_use]
    pub fn ewald_tables(&self) -> Option<&EwaldTables> {
        match &self.coulomb {
            Coulomb::Ewald { tables, .. } => Some(tables),
            _ => None,
        }
    }

    /// Dispersion tables, when the dispersion correction is configured.
    #[must_use]
    pub fn dispersion_tables(&self) -> Option<&DispersionTables> {
        self.dispersion.as_ref()
    }

    /// Evaluate one block against its neighbor list.
    ///
    /// Adds forces into `forces` (four values per atom, fourth untouched)
    /// and, when `energy` is given, adds the block's energy to it.
    ///
    /// # Panics
    ///
    /// Panics if `block` is not a block of the inputs' neighbor list or if
    /// `forces` holds fewer than four values per atom.
    pub fn calculate_block<N: BlockNeighbors + ?Sized>(
        &self,
        inputs: &KernelInputs<'_, N>,
        block: usize,
        forces: &mut [f32],
        energy: Option<&mut f64>,
    ) {
        let atoms = inputs.neighbors.block_atoms(block);
        let rows = atoms.map(|atom| inputs.row(atom));
        let (image, frame) = match inputs.periodic_box {
            Some(pbox) => {
                let image = classify_block(&rows, pbox, self.cutoff);
                (image, pbox.frame(image.center))
            }
            None => (BlockImage::open(), ImageFrame::open()),
        };

        let data = BlockData {
            block,
            atoms,
            rows,
            frame,
        };
        let out = Accumulators { forces, energy };

        match &self.coulomb {
            Coulomb::Direct => self.dispatch_image(&DirectCoulomb, image.mode, &data, inputs, out),
            Coulomb::ReactionField(rf) => self.dispatch_image(rf, image.mode, &data, inputs, out),
            Coulomb::Ewald { alpha, tables } => {
                let ewald = EwaldCoulomb::new(*alpha, tables);
                self.dispatch_image(&ewald, image.mode, &data, inputs, out);
            }
        }
    }

    fn dispatch_image<C: CoulombTerm, N: BlockNeighbors + ?Sized>(
        &self,
        coulomb: &C,
        mode: PeriodicMode,
        data: &BlockData<'_>,
        inputs: &KernelInputs<'_, N>,
        out: Accumulators<'_>,
    ) {
        match mode {
            PeriodicMode::NoPeriodic => self.run_block::<OpenImage, C, N>(coulomb, data, inputs, out),
            PeriodicMode::PerAtom => self.run_block::<PerAtomImage, C, N>(coulomb, data, inputs, out),
            PeriodicMode::PerInteraction => {
                self.run_block::<PerInteractionImage, C, N>(coulomb, data, inputs, out);
            }
            PeriodicMode::Triclinic => {
                self.run_block::<TriclinicImage, C, N>(coulomb, data, inputs, out);
            }
        }
    }

    #[allow(clippy::float_cmp)]
    fn run_block<M: MinimumImage, C: CoulombTerm, N: BlockNeighbors + ?Sized>(
        &self,
        coulomb: &C,
        data: &BlockData<'_>,
        inputs: &KernelInputs<'_, N>,
        out: Accumulators<'_>,
    ) {
        let Accumulators { forces, energy } = out;
        let frame = &data.frame;
        let neighbors = inputs.neighbors.neighbors(data.block);
        let exclusions = inputs.neighbors.exclusions(data.block);
        trace!(
            block = data.block,
            mode = ?M::MODE,
            neighbors = neighbors.len(),
            "evaluating block"
        );

        let rows = data.rows.map(|row| M::wrap_atom(frame, row));
        let (positions, charges) = Vec3x8::from_rows(&rows);
        let charges = charges * ONE_4PI_EPS0;
        let params = BlockParameters::gather(inputs.params, data.atoms);
        let block_c6 = inputs
            .dispersion_coefficients
            .map(|c6| F32x8::from_array(data.atoms.map(|atom| c6[atom])));

        let cutoff_squared = F32x8::splat(self.cutoff_squared);
        let want_energy = energy.is_some();
        let mut total_energy = 0.0f64;
        let mut block_force = Vec3x8::zeros();

        for (&atom, &excluded) in neighbors.iter().zip(exclusions) {
            let atom_row = M::wrap_atom(frame, inputs.row(atom));
            let (delta, r2) = M::displacement(frame, &positions, atom_row);

            let include = !excluded & r2.simd_lt(cutoff_squared).move_mask();
            if include == 0 {
                continue;
            }

            let inv_r = r2.rsqrt();
            let r = r2 * inv_r;

            let atom_params = inputs.params[atom];
            let mut terms = if atom_params.two_sqrt_epsilon == 0.0 {
                PairTerms::zeros()
            } else {
                let lj = lennard_jones(&params, atom_params, inv_r);
                let mut terms = lj.terms;
                if let Some(switch) = &self.switch {
                    terms = switch.apply(r, terms);
                }
                if let (Some(tables), Some(block_c6), Some(c6)) =
                    (&self.dispersion, block_c6, inputs.dispersion_coefficients)
                {
                    terms = dispersion_correction(tables, block_c6 * c6[atom], &lj, inv_r, r, terms);
                }
                terms
            };

            let charge_prod = charges * atom_row.lane(3);
            terms.de_dr += coulomb.de_dr(charge_prod, inv_r, r, r2);

            if want_energy {
                let pair_energy = terms.energy + coulomb.energy(charge_prod, inv_r, r, r2);
                let pair_energy = F32x8::blend_bits(F32x8::zeros(), pair_energy, include);
                total_energy += f64::from(pair_energy.reduce_add());
            }

            let de_dr = F32x8::blend_bits(F32x8::zeros(), terms.de_dr * (inv_r * inv_r), include);
            let force = delta.scale_each(de_dr);
            block_force += force;

            let offset = RECORD_WIDTH * atom;
            let updated =
                F32x4::load(&forces[offset..]) - F32x4::from_vector(&force.reduce_sum(), 0.0);
            updated.store(&mut forces[offset..]);
        }

        let block_rows = block_force.to_rows(F32x8::zeros());
        for (row, &atom) in block_rows.iter().zip(data.atoms) {
            let offset = RECORD_WIDTH * atom;
            (F32x4::load(&forces[offset..]) + *row).store(&mut forces[offset..]);
        }

        if let Some(energy) = energy {
            *energy += total_energy;
        }
    }
}

struct BlockData<'a> {
    block: usize,
    atoms: &'a [usize; LANES],
    rows: [F32x4; LANES],
    frame: ImageFrame,
}

struct Accumulators<'a> {
    forces: &'a mut [f32],
    energy: Option<&'a mut f64>,
}

/// Validated per-step inputs for a [`BlockKernel`].
///
/// Holds the packed `(x, y, z, q)` positions, the per-atom parameters, the
/// dispersion coefficients (only when the kernel uses them), the neighbor
/// list and the periodic box. Periodic positions are borrowed when they all
/// lie in the primary cell and wrapped into an owned copy otherwise.
#[derive(Debug)]
pub struct KernelInputs<'a, N: ?Sized> {
    posq: Cow<'a, [f32]>,
    params: &'a [AtomParameters],
    dispersion_coefficients: Option<&'a [f32]>,
    neighbors: &'a N,
    periodic_box: Option<&'a PeriodicBox>,
    num_atoms: usize,
}

impl<N: ?Sized> Clone for KernelInputs<'_, N> {
    fn clone(&self) -> Self {
        Self {
            posq: self.posq.clone(),
            ..*self
        }
    }
}

impl<'a, N: BlockNeighbors + ?Sized> KernelInputs<'a, N> {
    /// Check the inputs against `kernel` once, before any block runs.
    ///
    /// Dispersion coefficients are required when the kernel applies the
    /// dispersion correction and dropped otherwise. A periodic box is
    /// required exactly when the kernel is periodic.
    pub fn new(
        kernel: &BlockKernel,
        posq: &'a [f32],
        params: &'a [AtomParameters],
        dispersion_coefficients: Option<&'a [f32]>,
        neighbors: &'a N,
        periodic_box: Option<&'a PeriodicBox>,
    ) -> Result<Self> {
        if posq.len() % RECORD_WIDTH != 0 {
            return Err(NonbondedError::length_mismatch(
                "position/charge array",
                posq.len().next_multiple_of(RECORD_WIDTH),
                posq.len(),
            ));
        }
        let num_atoms = posq.len() / RECORD_WIDTH;
        if params.len() != num_atoms {
            return Err(NonbondedError::length_mismatch(
                "parameter array",
                num_atoms,
                params.len(),
            ));
        }

        let dispersion_coefficients = if kernel.dispersion.is_some() {
            let c6 = dispersion_coefficients.ok_or(NonbondedError::MissingDispersionCoefficients)?;
            if c6.len() != num_atoms {
                return Err(NonbondedError::length_mismatch(
                    "dispersion coefficients",
                    num_atoms,
                    c6.len(),
                ));
            }
            Some(c6)
        } else {
            None
        };

        match (kernel.config.periodic, periodic_box) {
            (true, Some(pbox)) => pbox.ensure_fits_cutoff(kernel.cutoff)?,
            (true, None) => {
                return Err(NonbondedError::invalid_config(
                    "periodic kernel needs a periodic box",
                ));
            }
            (false, Some(_)) => {
                return Err(NonbondedError::invalid_config(
                    "periodic box given to a non-periodic kernel",
                ));
            }
            (false, None) => {}
        }

        validate_neighbors(neighbors, num_atoms)?;

        let in_cell = |pbox: &PeriodicBox| {
            posq.chunks_exact(RECORD_WIDTH)
                .all(|r| pbox.contains(&Vector3::new(r[0], r[1], r[2])))
        };
        let posq = match periodic_box {
            Some(pbox) if !in_cell(pbox) => {
                debug!(num_atoms, "wrapping positions into the primary cell");
                Cow::Owned(pbox.wrap_records(posq))
            }
            _ => Cow::Borrowed(posq),
        };

        Ok(Self {
            posq,
            params,
            dispersion_coefficients,
            neighbors,
            periodic_box,
            num_atoms,
        })
    }

    /// Number of atoms.
    #[must_use]
    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// The neighbor list.
    #[must_use]
    pub fn neighbors(&self) -> &'a N {
        self.neighbors
    }

    /// The periodic box, if any.
    #[must_use]
    pub fn periodic_box(&self) -> Option<&'a PeriodicBox> {
        self.periodic_box
    }

    /// Whether positions had to be wrapped into the primary cell.
    #[must_use]
    pub fn wrapped_positions(&self) -> bool {
        matches!(self.posq, Cow::Owned(_))
    }

    /// Whether dispersion coefficients were kept.
    #[must_use]
    pub fn has_dispersion_coefficients(&self) -> bool {
        self.dispersion_coefficients.is_some()
    }

    #[inline]
    fn row(&self, atom: usize) -> F32x4 {
        F32x4::load(&self.posq[RECORD_WIDTH * atom..])
    }
}
