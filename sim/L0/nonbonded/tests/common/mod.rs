//! Shared fixtures and a scalar double-precision reference.
//!
//! The reference evaluates every pair directly in `f64`, with no blocks, no
//! lanes and no tables, so kernel results can be checked against it.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_nonbonded::{
    AtomParameters, BlockKernel, Electrostatics, KernelInputs, NeighborList, NonbondedConfig,
    ONE_4PI_EPS0, PeriodicBox, compute_forces, dispersion_coefficients, pack_posq, unpack_forces,
};
use statrs::function::erf::erfc;

// ============================================================================
// Test systems
// ============================================================================

/// Atoms with charges, Lennard-Jones parameters and excluded pairs.
#[derive(Debug, Clone)]
pub struct TestSystem {
    pub positions: Vec<Vector3<f32>>,
    pub charges: Vec<f32>,
    pub params: Vec<AtomParameters>,
    pub excluded: Vec<(usize, usize)>,
}

impl TestSystem {
    /// Two atoms, +1 and −1, σ = 0.3 nm, ε = 0.5 kJ/mol, along x.
    pub fn pair(first: Vector3<f32>, second: Vector3<f32>) -> Self {
        Self {
            positions: vec![first, second],
            charges: vec![1.0, -1.0],
            params: vec![AtomParameters::new(0.3, 0.5); 2],
            excluded: Vec::new(),
        }
    }

    /// Jittered cubic lattice of `cells³` atoms starting at the origin.
    ///
    /// Atoms are ordered by 2×2×2 sub-cube so consecutive blocks stay
    /// compact. Charges alternate ±0.4, every seventh atom has ε = 0 and
    /// every fifth consecutive pair is excluded.
    pub fn lattice(cells: usize, spacing: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let jitter = 0.15 * spacing;

        let mut sites = Vec::with_capacity(cells * cells * cells);
        for ix in 0..cells {
            for iy in 0..cells {
                for iz in 0..cells {
                    sites.push(((ix / 2, iy / 2, iz / 2), [ix, iy, iz]));
                }
            }
        }
        sites.sort_by_key(|&(key, index)| (key, index));

        let mut system = Self {
            positions: Vec::with_capacity(sites.len()),
            charges: Vec::with_capacity(sites.len()),
            params: Vec::with_capacity(sites.len()),
            excluded: Vec::new(),
        };
        for (n, (_, index)) in sites.into_iter().enumerate() {
            let position = Vector3::from_fn(|k, _| {
                (index[k] as f32 + 0.5) * spacing + rng.gen_range(-jitter..jitter)
            });
            let sigma = rng.gen_range(0.25..0.33);
            let epsilon = if n % 7 == 3 { 0.0 } else { rng.gen_range(0.2..0.9) };
            system.positions.push(position);
            system.charges.push(if n % 2 == 0 { 0.4 } else { -0.4 });
            system.params.push(AtomParameters::new(sigma, epsilon));
            if n % 5 == 0 && n > 0 {
                system.excluded.push((n - 1, n));
            }
        }
        system
    }

    pub fn num_atoms(&self) -> usize {
        self.positions.len()
    }

    pub fn posq(&self) -> Vec<f32> {
        pack_posq(&self.positions, &self.charges).unwrap()
    }

    pub fn neighbors(&self) -> NeighborList {
        NeighborList::all_pairs(self.num_atoms(), &self.excluded).unwrap()
    }

    /// Same system with every position moved by `shift` and wrapped.
    pub fn translated(&self, shift: Vector3<f32>, periodic_box: &PeriodicBox) -> Self {
        let mut moved = self.clone();
        for p in &mut moved.positions {
            *p = periodic_box.wrap_into_cell(*p + shift);
        }
        moved
    }
}

// ============================================================================
// Kernel evaluation
// ============================================================================

/// Forces and energy from one kernel pass.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub forces: Vec<Vector3<f32>>,
    pub energy: f64,
}

/// Route kernel logs to the test harness. `RUST_LOG=sim_nonbonded=trace`
/// shows per-block classification.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Run the kernel over every block of `system`.
pub fn evaluate(
    kernel: &BlockKernel,
    system: &TestSystem,
    periodic_box: Option<&PeriodicBox>,
) -> Evaluation {
    init_tracing();
    let posq = system.posq();
    let neighbors = system.neighbors();
    let c6 = dispersion_coefficients(&system.params);
    let inputs =
        KernelInputs::new(kernel, &posq, &system.params, Some(&c6), &neighbors, periodic_box)
            .unwrap();
    let mut forces = vec![0.0; posq.len()];
    let energy = compute_forces(kernel, &inputs, &mut forces, true)
        .unwrap()
        .expect("energy was requested");
    Evaluation {
        forces: unpack_forces(&forces),
        energy,
    }
}

// ============================================================================
// Scalar reference
// ============================================================================

/// Reference forces and energy, plus the sum of absolute pair energies.
#[derive(Debug, Clone)]
pub struct Reference {
    pub forces: Vec<Vector3<f64>>,
    pub energy: f64,
    pub energy_scale: f64,
}

fn expterm(alpha: f64, r: f64) -> f64 {
    let x = (alpha * r).powi(2);
    1.0 - (-x).exp() * (1.0 + x + 0.5 * x * x)
}

fn dexpterm(alpha: f64, r: f64) -> f64 {
    let x = (alpha * r).powi(2);
    1.0 - (-x).exp() * (1.0 + x + 0.5 * x * x + x * x * x / 6.0)
}

fn minimum_image(periodic_box: &PeriodicBox, delta: Vector3<f64>) -> Vector3<f64> {
    let [a, b, c] = periodic_box.vectors().map(|v| v.cast::<f64>());
    let mut d = delta;
    d -= c * (d.z / c.z + 0.5).floor();
    d -= b * (d.y / b.y + 0.5).floor();
    d -= a * (d.x / a.x + 0.5).floor();
    d
}

/// Energy and `−r·dE/dr` of one pair.
fn pair_terms(config: &NonbondedConfig, system: &TestSystem, i: usize, j: usize, r: f64) -> (f64, f64) {
    let (pi, pj) = (system.params[i], system.params[j]);
    let sigma = f64::from(pi.half_sigma) + f64::from(pj.half_sigma);
    let four_epsilon = f64::from(pi.two_sqrt_epsilon) * f64::from(pj.two_sqrt_epsilon);
    let s6 = (sigma / r).powi(6);
    let mut energy = four_epsilon * (s6 * s6 - s6);
    let mut de_dr = four_epsilon * (12.0 * s6 * s6 - 6.0 * s6);

    if let (Some(sd), Some(rc)) = (config.switching_distance, config.cutoff) {
        let (sd, rc) = (f64::from(sd), f64::from(rc));
        let t = ((r - sd) / (rc - sd)).max(0.0);
        let s = 1.0 + t.powi(3) * (-10.0 + t * (15.0 - 6.0 * t));
        let ds = t * t * (-30.0 + t * (60.0 - 30.0 * t)) / (rc - sd);
        de_dr = s * de_dr - energy * ds * r;
        energy *= s;
    }

    if let (Some(pme), Some(rc)) = (config.dispersion, config.cutoff) {
        let (alpha, rc) = (f64::from(pme.alpha), f64::from(rc));
        let c6ij = f64::from(pi.dispersion_coefficient()) * f64::from(pj.dispersion_coefficient());
        let inv_rc6 = rc.powi(-6);
        let sig6 = sigma.powi(6);
        energy += c6ij * r.powi(-6) * expterm(alpha, r)
            + four_epsilon * (1.0 - sig6 * inv_rc6) * sig6 * inv_rc6
            - c6ij * inv_rc6 * expterm(alpha, rc);
        de_dr += 6.0 * c6ij * r.powi(-6) * dexpterm(alpha, r);
    }

    let cp = f64::from(ONE_4PI_EPS0) * f64::from(system.charges[i]) * f64::from(system.charges[j]);
    match config.electrostatics {
        Electrostatics::Coulomb => {
            energy += cp / r;
            de_dr += cp / r;
        }
        Electrostatics::ReactionField(rf) => {
            let (krf, crf) = (f64::from(rf.krf), f64::from(rf.crf));
            energy += cp * (1.0 / r + krf * r * r - crf);
            de_dr += cp * (1.0 / r - 2.0 * krf * r * r);
        }
        Electrostatics::Ewald { alpha } => {
            let ar = f64::from(alpha) * r;
            energy += cp * erfc(ar) / r;
            de_dr += cp / r * (erfc(ar) + 2.0 / std::f64::consts::PI.sqrt() * ar * (-ar * ar).exp());
        }
    }

    (energy, de_dr)
}

/// Evaluate every unexcluded pair directly.
pub fn reference(
    config: &NonbondedConfig,
    system: &TestSystem,
    periodic_box: Option<&PeriodicBox>,
) -> Reference {
    let excluded: HashSet<(usize, usize)> = system
        .excluded
        .iter()
        .map(|&(a, b)| (a.min(b), a.max(b)))
        .collect();
    let cutoff_squared = config.cutoff.map_or(f64::INFINITY, |rc| f64::from(rc).powi(2));

    let n = system.num_atoms();
    let mut result = Reference {
        forces: vec![Vector3::zeros(); n],
        energy: 0.0,
        energy_scale: 0.0,
    };
    for i in 0..n {
        for j in i + 1..n {
            if excluded.contains(&(i, j)) {
                continue;
            }
            let mut d = (system.positions[i] - system.positions[j]).cast::<f64>();
            if let Some(pbox) = periodic_box {
                d = minimum_image(pbox, d);
            }
            let r2 = d.norm_squared();
            if r2 >= cutoff_squared {
                continue;
            }
            let (energy, de_dr) = pair_terms(config, system, i, j, r2.sqrt());
            let f = d * (de_dr / r2);
            result.forces[i] += f;
            result.forces[j] -= f;
            result.energy += energy;
            result.energy_scale += energy.abs();
        }
    }
    result
}

// ============================================================================
// Assertions
// ============================================================================

/// Largest force magnitude, at least one.
pub fn force_scale(forces: &[Vector3<f64>]) -> f64 {
    forces.iter().map(|f| f.norm()).fold(1.0, f64::max)
}

/// Every force within `tolerance × largest force` of the reference.
pub fn assert_forces_close(actual: &[Vector3<f32>], expected: &[Vector3<f64>], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    let scale = force_scale(expected);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let error = (a.cast::<f64>() - e).norm();
        assert!(
            error <= tolerance * scale,
            "atom {i}: kernel {a:?} vs reference {e:?} (error {error}, scale {scale})"
        );
    }
}

/// Kernel energy within `tolerance × Σ|pair energy|` of the reference.
pub fn assert_energy_close(actual: f64, expected: &Reference, tolerance: f64) {
    let error = (actual - expected.energy).abs();
    assert!(
        error <= tolerance * expected.energy_scale.max(1.0),
        "kernel energy {actual} vs reference {} (error {error})",
        expected.energy
    );
}
