//! Tabulated functions evaluated by linear interpolation.
//!
//! The transcendental correction terms (Ewald `erfc` and force scale,
//! dispersion exponential terms) are sampled once on a uniform grid and
//! interpolated eight lanes at a time with [`gather_pair`].

use sim_simd::{F32x8, gather_pair};
use statrs::function::erf::erfc;

use crate::error::{NonbondedError, Result};

/// Intervals in every table built by this module.
pub const NUM_TABLE_POINTS: usize = 2048;

/// Samples appended past the last interval so that `index + 1` stays readable.
pub const TABLE_GUARD_POINTS: usize = 4;

const MIN_SAMPLES: usize = 2;

/// Uniformly spaced samples of a function of one variable.
///
/// Sample `i` holds `f(i · spacing)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionTable {
    samples: Vec<f32>,
    spacing: f32,
    inverse_spacing: f32,
    max_index: f32,
}

impl InteractionTable {
    /// Wrap existing samples taken at multiples of `spacing`.
    pub fn from_samples(samples: Vec<f32>, spacing: f32) -> Result<Self> {
        if samples.len() < MIN_SAMPLES {
            return Err(NonbondedError::TableTooShort {
                len: samples.len(),
                min: MIN_SAMPLES,
            });
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(NonbondedError::InvalidTableSpacing(f64::from(spacing)));
        }
        let max_index = (samples.len() - 2) as f32;
        Ok(Self {
            samples,
            spacing,
            inverse_spacing: 1.0 / spacing,
            max_index,
        })
    }

    /// Sample `f` at `points + TABLE_GUARD_POINTS` grid points.
    ///
    /// The function is evaluated in `f64` and rounded to `f32` per sample.
    #[allow(clippy::cast_possible_truncation)]
    pub fn tabulate(points: usize, spacing: f64, f: impl Fn(f64) -> f64) -> Result<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(NonbondedError::InvalidTableSpacing(spacing));
        }
        let samples = (0..points + TABLE_GUARD_POINTS)
            .map(|i| f(i as f64 * spacing) as f32)
            .collect();
        Self::from_samples(samples, spacing as f32)
    }

    /// Raw samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; tables hold at least two samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Grid spacing.
    #[must_use]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Reciprocal of the grid spacing.
    #[must_use]
    pub fn inverse_spacing(&self) -> f32 {
        self.inverse_spacing
    }

    /// Largest argument interpolated between two real samples.
    #[must_use]
    pub fn max_argument(&self) -> f32 {
        self.max_index * self.spacing
    }

    /// Check that every argument up to `required` interpolates without clamping.
    pub fn ensure_covers(&self, required: f32) -> Result<()> {
        let covered = self.max_argument();
        if covered >= required {
            Ok(())
        } else {
            Err(NonbondedError::TableRangeTooSmall { covered, required })
        }
    }

    /// Piecewise-linear approximation at eight arguments.
    ///
    /// Indices are clamped to `[0, len − 2]`, so arguments beyond
    /// [`max_argument`](Self::max_argument) extrapolate the last interval and
    /// `NaN` arguments read the last interval instead of faulting. Kernels
    /// mask such lanes out afterwards.
    #[must_use]
    #[inline]
    pub fn interpolate(&self, x: F32x8) -> F32x8 {
        let scaled = x * self.inverse_spacing;
        let index = scaled
            .floor()
            .min(F32x8::splat(self.max_index))
            .max(F32x8::zeros())
            .to_i32();
        let (s0, s1) = gather_pair(&self.samples, index);
        let frac = scaled - index.to_f32();
        (1.0 - frac) * s0 + frac * s1
    }
}

/// Tables for Ewald real-space electrostatics.
#[derive(Debug, Clone, PartialEq)]
pub struct EwaldTables {
    /// `erfc(x)` for `x ∈ [0, α·rc]`, looked up at `α·r`.
    pub erfc: InteractionTable,
    /// `erfc(αr) + 2αr/√π · exp(−α²r²)` for `r ∈ [0, rc]`.
    pub scale: InteractionTable,
    alpha: f32,
    cutoff: f32,
}

impl EwaldTables {
    /// Build both tables for a splitting parameter and cutoff.
    pub fn new(alpha: f32, cutoff: f32) -> Result<Self> {
        let a = f64::from(alpha);
        let rc = f64::from(cutoff);
        let points = NUM_TABLE_POINTS as f64;

        let erfc_table = InteractionTable::tabulate(NUM_TABLE_POINTS, a * rc / points, erfc)?;
        let two_over_sqrt_pi = 2.0 / std::f64::consts::PI.sqrt();
        let scale = InteractionTable::tabulate(NUM_TABLE_POINTS, rc / points, |r| {
            let ar = a * r;
            erfc(ar) + two_over_sqrt_pi * ar * (-ar * ar).exp()
        })?;

        Ok(Self {
            erfc: erfc_table,
            scale,
            alpha,
            cutoff,
        })
    }

    /// Splitting parameter the tables were built for.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Cutoff the tables were built for.
    #[must_use]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Check the tables against a kernel's splitting parameter and cutoff.
    ///
    /// The force scale is sampled in `r` with `α` baked in, so `alpha` must
    /// match; the cutoff only has to be covered.
    pub fn ensure_covers(&self, alpha: f32, cutoff: f32) -> Result<()> {
        ensure_matches("Ewald", "alpha", self.alpha, alpha)?;
        self.erfc.ensure_covers(alpha * cutoff)?;
        self.scale.ensure_covers(cutoff)
    }
}

/// Tables and constants for the long-range dispersion correction.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionTables {
    /// `1 − e^{−x}(1 + x + x²/2)` with `x = (αr)²`, for `r ∈ [0, rc]`.
    pub expterm: InteractionTable,
    /// `1 − e^{−x}(1 + x + x²/2 + x³/6)` with `x = (αr)²`, for `r ∈ [0, rc]`.
    pub dexpterm: InteractionTable,
    inverse_rcut6: f32,
    inverse_rcut6_expterm: f32,
    alpha: f32,
    cutoff: f32,
}

impl DispersionTables {
    /// Build both tables and the potential-shift constants.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(alpha: f32, cutoff: f32) -> Result<Self> {
        let a = f64::from(alpha);
        let rc = f64::from(cutoff);
        let spacing = rc / NUM_TABLE_POINTS as f64;

        let expterm = InteractionTable::tabulate(NUM_TABLE_POINTS, spacing, |r| exp_term(a, r))?;
        let dexpterm =
            InteractionTable::tabulate(NUM_TABLE_POINTS, spacing, |r| dexp_term(a, r))?;

        let inverse_rcut6 = rc.powi(-6);
        Ok(Self {
            expterm,
            dexpterm,
            inverse_rcut6: inverse_rcut6 as f32,
            inverse_rcut6_expterm: (inverse_rcut6 * exp_term(a, rc)) as f32,
            alpha,
            cutoff,
        })
    }

    /// `rc⁻⁶`.
    #[must_use]
    pub fn inverse_rcut6(&self) -> f32 {
        self.inverse_rcut6
    }

    /// `rc⁻⁶ · expterm(rc)`.
    #[must_use]
    pub fn inverse_rcut6_expterm(&self) -> f32 {
        self.inverse_rcut6_expterm
    }

    /// Splitting parameter the tables were built for.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Cutoff the tables were built for.
    #[must_use]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Check the tables against a kernel's splitting parameter and cutoff.
    ///
    /// The shift constants depend on both, so they must match exactly rather
    /// than merely be covered.
    pub fn ensure_covers(&self, alpha: f32, cutoff: f32) -> Result<()> {
        ensure_matches("dispersion", "alpha", self.alpha, alpha)?;
        ensure_matches("dispersion", "cutoff", self.cutoff, cutoff)?;
        self.expterm.ensure_covers(cutoff)?;
        self.dexpterm.ensure_covers(cutoff)
    }
}

fn ensure_matches(tables: &str, name: &str, built: f32, requested: f32) -> Result<()> {
    if (built - requested).abs() > f32::EPSILON * requested.abs() {
        return Err(NonbondedError::invalid_config(format!(
            "{tables} tables built for {name} {built}, kernel uses {requested}"
        )));
    }
    Ok(())
}

fn exp_term(alpha: f64, r: f64) -> f64 {
    let x = (alpha * r).powi(2);
    1.0 - (-x).exp() * (1.0 + x + 0.5 * x * x)
}

fn dexp_term(alpha: f64, r: f64) -> f64 {
    let x = (alpha * r).powi(2);
    1.0 - (-x).exp() * (1.0 + x + 0.5 * x * x + x * x * x / 6.0)
}
