//! Per-atom parameters and packed atom records.
//!
//! Parameters are stored pre-combined so the inner loop applies the
//! Lorentz-Berthelot rules with one add and one multiply per lane.

use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{NonbondedError, Result};

/// Coulomb constant `1/(4πε₀)` in kJ·mol⁻¹·nm·e⁻².
pub const ONE_4PI_EPS0: f32 = 138.935_456;

/// Values per atom in packed position/charge and force arrays.
pub const RECORD_WIDTH: usize = 4;

/// Lennard-Jones parameters of one atom in combination-ready form.
///
/// With `half_sigma = σ/2` and `two_sqrt_epsilon = 2√ε`, the pair values are
/// `σ_ij = half_sigma_i + half_sigma_j` (arithmetic mean) and
/// `4ε_ij = two_sqrt_epsilon_i · two_sqrt_epsilon_j` (geometric mean, with
/// the Lennard-Jones factor 4 folded in).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomParameters {
    /// `σ/2` in nm.
    pub half_sigma: f32,
    /// `2√ε` with ε in kJ/mol.
    pub two_sqrt_epsilon: f32,
}

impl AtomParameters {
    /// Encode `sigma` (nm) and `epsilon` (kJ/mol).
    #[must_use]
    pub fn new(sigma: f32, epsilon: f32) -> Self {
        Self {
            half_sigma: 0.5 * sigma,
            two_sqrt_epsilon: 2.0 * epsilon.sqrt(),
        }
    }

    /// Parameters of an atom with no Lennard-Jones interaction.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            half_sigma: 0.0,
            two_sqrt_epsilon: 0.0,
        }
    }

    /// Decoded σ.
    #[must_use]
    pub fn sigma(&self) -> f32 {
        2.0 * self.half_sigma
    }

    /// Decoded ε.
    #[must_use]
    pub fn epsilon(&self) -> f32 {
        let sqrt_eps = 0.5 * self.two_sqrt_epsilon;
        sqrt_eps * sqrt_eps
    }

    /// Dispersion coefficient for the long-range correction.
    ///
    /// `8·(σ/2)³·2√ε`; the product for a pair is `4·√(ε_iε_j)·σ_i³σ_j³`.
    #[must_use]
    pub fn dispersion_coefficient(&self) -> f32 {
        8.0 * self.half_sigma.powi(3) * self.two_sqrt_epsilon
    }
}

/// Dispersion coefficients for every atom, in atom order.
#[must_use]
pub fn dispersion_coefficients(params: &[AtomParameters]) -> Vec<f32> {
    params
        .iter()
        .map(AtomParameters::dispersion_coefficient)
        .collect()
}

/// Pack positions and charges into the flat `(x, y, z, q)` layout.
pub fn pack_posq(positions: &[Vector3<f32>], charges: &[f32]) -> Result<Vec<f32>> {
    if charges.len() != positions.len() {
        return Err(NonbondedError::length_mismatch(
            "charges",
            positions.len(),
            charges.len(),
        ));
    }
    Ok(positions
        .iter()
        .zip(charges)
        .flat_map(|(p, &q)| [p.x, p.y, p.z, q])
        .collect())
}

/// Read the force vectors out of a flat force array.
#[must_use]
pub fn unpack_forces(forces: &[f32]) -> Vec<Vector3<f32>> {
    forces
        .chunks_exact(RECORD_WIDTH)
        .map(|f| Vector3::new(f[0], f[1], f[2]))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_encoding_round_trip() {
        let p = AtomParameters::new(0.3, 0.5);
        assert_relative_eq!(p.sigma(), 0.3);
        assert_relative_eq!(p.epsilon(), 0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_combination_rules() {
        let a = AtomParameters::new(0.3, 0.5);
        let b = AtomParameters::new(0.4, 2.0);
        // σ_ij = (σ_i + σ_j)/2, 4ε_ij = 4√(ε_iε_j)
        assert_relative_eq!(a.half_sigma + b.half_sigma, 0.35);
        assert_relative_eq!(a.two_sqrt_epsilon * b.two_sqrt_epsilon, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dispersion_coefficient_product() {
        let a = AtomParameters::new(0.3, 0.5);
        let b = AtomParameters::new(0.4, 2.0);
        let expected = 4.0 * (0.5f32 * 2.0).sqrt() * 0.3f32.powi(3) * 0.4f32.powi(3);
        assert_relative_eq!(
            a.dispersion_coefficient() * b.dispersion_coefficient(),
            expected,
            max_relative = 1e-5
        );
        assert_eq!(AtomParameters::none().dispersion_coefficient(), 0.0);
        assert_eq!(dispersion_coefficients(&[a, b]).len(), 2);
    }

    #[test]
    fn test_pack_and_unpack() {
        let positions = [Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let posq = pack_posq(&positions, &[0.5, -0.5]).unwrap();
        assert_eq!(posq, vec![1.0, 2.0, 3.0, 0.5, 4.0, 5.0, 6.0, -0.5]);

        let forces = unpack_forces(&posq);
        assert_eq!(forces[1], Vector3::new(4.0, 5.0, 6.0));

        let err = pack_posq(&positions, &[1.0]).unwrap_err();
        assert!(matches!(err, NonbondedError::LengthMismatch { .. }));
    }
}
