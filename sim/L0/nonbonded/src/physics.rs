//! Pair interactions evaluated on eight lanes.
//!
//! Every function here returns the energy `E` and `−r·dE/dr` per lane (the
//! form the kernel scales by `1/r²` to get the force along the
//! displacement). Nothing is masked here; the kernel drops excluded and
//! out-of-range lanes afterwards.

use sim_simd::{F32x8, LANES};

use crate::config::ReactionField;
use crate::params::AtomParameters;
use crate::table::{DispersionTables, EwaldTables};

/// Energy and `−r·dE/dr` on every lane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairTerms {
    /// Pair energy.
    pub energy: F32x8,
    /// `−r · dE/dr`.
    pub de_dr: F32x8,
}

impl PairTerms {
    /// All lanes zero.
    #[must_use]
    pub const fn zeros() -> Self {
        Self {
            energy: F32x8::zeros(),
            de_dr: F32x8::zeros(),
        }
    }
}

/// Lennard-Jones parameters of the eight block atoms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockParameters {
    /// `σ/2` per lane.
    pub half_sigma: F32x8,
    /// `2√ε` per lane.
    pub two_sqrt_epsilon: F32x8,
}

impl BlockParameters {
    /// Gather the parameters of the block atoms into lanes.
    #[must_use]
    pub fn gather(params: &[AtomParameters], atoms: &[usize; LANES]) -> Self {
        let lanes = atoms.map(|a| params[a]);
        Self {
            half_sigma: F32x8::from_array(lanes.map(|p| p.half_sigma)),
            two_sqrt_epsilon: F32x8::from_array(lanes.map(|p| p.two_sqrt_epsilon)),
        }
    }
}

/// Lennard-Jones result with the combined pair parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJonesPair {
    /// Energy and derivative.
    pub terms: PairTerms,
    /// Combined `σ_ij`.
    pub sigma: F32x8,
    /// Combined `4ε_ij`.
    pub four_epsilon: F32x8,
}

/// `4ε[(σ/r)¹² − (σ/r)⁶]` between each block lane and one neighbor.
#[must_use]
#[inline]
pub fn lennard_jones(block: &BlockParameters, atom: AtomParameters, inv_r: F32x8) -> LennardJonesPair {
    let sigma = block.half_sigma + atom.half_sigma;
    let mut sig2 = inv_r * sigma;
    sig2 *= sig2;
    let sig6 = sig2 * sig2 * sig2;
    let four_epsilon = block.two_sqrt_epsilon * atom.two_sqrt_epsilon;
    let eps_sig6 = four_epsilon * sig6;
    LennardJonesPair {
        terms: PairTerms {
            energy: eps_sig6 * (sig6 - 1.0),
            de_dr: eps_sig6 * (12.0 * sig6 - 6.0),
        },
        sigma,
        four_epsilon,
    }
}

/// Quintic switch taking the Lennard-Jones energy smoothly to zero at the cutoff.
///
/// With `t = (r − r_s)/(r_c − r_s)` clamped below at zero,
/// `S(t) = 1 − 10t³ + 15t⁴ − 6t⁵`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Switch {
    distance: f32,
    inverse_interval: f32,
}

impl Switch {
    /// Switch over `[switching_distance, cutoff]`.
    #[must_use]
    pub fn new(switching_distance: f32, cutoff: f32) -> Self {
        Self {
            distance: switching_distance,
            inverse_interval: 1.0 / (cutoff - switching_distance),
        }
    }

    /// `S(r)` and `dS/dr`.
    #[must_use]
    #[inline]
    pub fn value_and_derivative(&self, r: F32x8) -> (F32x8, F32x8) {
        let beyond = r.simd_gt(F32x8::splat(self.distance));
        let t = beyond & ((r - self.distance) * self.inverse_interval);
        let value = 1.0 + t * t * t * (-10.0 + t * (15.0 - t * 6.0));
        let derivative = t * t * (-30.0 + t * (60.0 - t * 30.0)) * self.inverse_interval;
        (value, derivative)
    }

    /// Switch a pair energy, including the `E·dS/dr` cross term.
    #[must_use]
    #[inline]
    pub fn apply(&self, r: F32x8, terms: PairTerms) -> PairTerms {
        let (value, derivative) = self.value_and_derivative(r);
        PairTerms {
            energy: terms.energy * value,
            de_dr: value * terms.de_dr - terms.energy * derivative * r,
        }
    }
}

/// Add the long-range dispersion correction to a Lennard-Jones pair.
///
/// `c6ij` is the product of the two atoms' dispersion coefficients. The
/// constant shift cancels both the plain Lennard-Jones energy and the
/// correction term at the cutoff.
#[must_use]
#[inline]
pub fn dispersion_correction(
    tables: &DispersionTables,
    c6ij: F32x8,
    lj: &LennardJonesPair,
    inv_r: F32x8,
    r: F32x8,
    terms: PairTerms,
) -> PairTerms {
    let inv_r2 = inv_r * inv_r;
    let inv_r6 = inv_r2 * inv_r2 * inv_r2;
    let sig2 = lj.sigma * lj.sigma;
    let sig6 = sig2 * sig2 * sig2;
    let inv_rc6 = tables.inverse_rcut6();

    let correction = c6ij * inv_r6 * tables.expterm.interpolate(r);
    let shift = lj.four_epsilon * (1.0 - sig6 * inv_rc6) * sig6 * inv_rc6
        - c6ij * tables.inverse_rcut6_expterm();

    PairTerms {
        energy: terms.energy + correction + shift,
        de_dr: terms.de_dr + 6.0 * c6ij * inv_r6 * tables.dexpterm.interpolate(r),
    }
}

/// Electrostatic pair term, resolved at compile time.
///
/// `charge_prod` already includes the Coulomb constant.
pub trait CoulombTerm {
    /// `−r·dE/dr` on every lane.
    fn de_dr(&self, charge_prod: F32x8, inv_r: F32x8, r: F32x8, r2: F32x8) -> F32x8;

    /// Energy on every lane.
    fn energy(&self, charge_prod: F32x8, inv_r: F32x8, r: F32x8, r2: F32x8) -> F32x8;
}

/// Bare `q_i q_j / r`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCoulomb;

impl CoulombTerm for DirectCoulomb {
    #[inline]
    fn de_dr(&self, charge_prod: F32x8, inv_r: F32x8, _r: F32x8, _r2: F32x8) -> F32x8 {
        charge_prod * inv_r
    }

    #[inline]
    fn energy(&self, charge_prod: F32x8, inv_r: F32x8, _r: F32x8, _r2: F32x8) -> F32x8 {
        charge_prod * inv_r
    }
}

impl CoulombTerm for ReactionField {
    #[inline]
    fn de_dr(&self, charge_prod: F32x8, inv_r: F32x8, _r: F32x8, r2: F32x8) -> F32x8 {
        charge_prod * (inv_r - 2.0 * self.krf * r2)
    }

    #[inline]
    fn energy(&self, charge_prod: F32x8, inv_r: F32x8, _r: F32x8, r2: F32x8) -> F32x8 {
        charge_prod * (inv_r + self.krf * r2 - self.crf)
    }
}

/// Ewald real-space term `q_i q_j erfc(αr) / r`.
#[derive(Debug, Clone, Copy)]
pub struct EwaldCoulomb<'a> {
    alpha: f32,
    tables: &'a EwaldTables,
}

impl<'a> EwaldCoulomb<'a> {
    /// Term with splitting parameter `alpha` backed by `tables`.
    #[must_use]
    pub fn new(alpha: f32, tables: &'a EwaldTables) -> Self {
        Self { alpha, tables }
    }
}

impl CoulombTerm for EwaldCoulomb<'_> {
    #[inline]
    fn de_dr(&self, charge_prod: F32x8, inv_r: F32x8, r: F32x8, _r2: F32x8) -> F32x8 {
        charge_prod * inv_r * self.tables.scale.interpolate(r)
    }

    #[inline]
    fn energy(&self, charge_prod: F32x8, inv_r: F32x8, r: F32x8, _r2: F32x8) -> F32x8 {
        charge_prod * inv_r * self.tables.erfc.interpolate(r * self.alpha)
    }
}
