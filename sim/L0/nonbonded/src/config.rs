//! Configuration types for the nonbonded kernel.
//!
//! A [`NonbondedConfig`] fixes which physics the kernel evaluates: cutoff,
//! switching, the electrostatics treatment, the long-range dispersion
//! correction and whether periodic boundaries apply.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{NonbondedError, Result};

/// Electrostatics treatment in the direct-space kernel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Electrostatics {
    /// Bare `q_i q_j / r`. Truncated at the cutoff when one is set.
    #[default]
    Coulomb,
    /// Reaction-field correction for a dielectric continuum beyond the cutoff.
    ReactionField(ReactionField),
    /// Real-space part of an Ewald sum with screening parameter `alpha` (nm⁻¹).
    Ewald {
        /// Ewald splitting parameter.
        alpha: f32,
    },
}

/// Reaction-field constants.
///
/// Energy is `q_i q_j (1/r + krf·r² − crf)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReactionField {
    /// Coefficient of the `r²` term.
    pub krf: f32,
    /// Constant shift making the energy vanish at the cutoff.
    pub crf: f32,
}

impl ReactionField {
    /// Derive the constants from the cutoff and the solvent dielectric.
    ///
    /// `krf = (ε − 1) / ((2ε + 1) rc³)` and `crf = 3ε / ((2ε + 1) rc)`.
    #[must_use]
    pub fn from_dielectric(cutoff: f32, solvent_dielectric: f32) -> Self {
        let eps = solvent_dielectric;
        Self {
            krf: (eps - 1.0) / ((2.0 * eps + 1.0) * cutoff.powi(3)),
            crf: 3.0 * eps / ((2.0 * eps + 1.0) * cutoff),
        }
    }
}

/// Long-range Lennard-Jones (dispersion PME) correction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DispersionPme {
    /// Dispersion splitting parameter (nm⁻¹).
    pub alpha: f32,
}

/// Main configuration for the nonbonded kernel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonbondedConfig {
    /// Cutoff distance (nm). `None` evaluates every listed pair.
    pub cutoff: Option<f32>,
    /// Start of the Lennard-Jones switching region (nm).
    pub switching_distance: Option<f32>,
    /// Electrostatics treatment.
    pub electrostatics: Electrostatics,
    /// Long-range dispersion correction.
    pub dispersion: Option<DispersionPme>,
    /// Apply periodic boundary conditions.
    pub periodic: bool,
}

impl NonbondedConfig {
    /// Create a configuration with no cutoff and plain Coulomb electrostatics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cutoff distance.
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Enable the Lennard-Jones switching function starting at `distance`.
    #[must_use]
    pub fn with_switching_distance(mut self, distance: f32) -> Self {
        self.switching_distance = Some(distance);
        self
    }

    /// Use reaction-field electrostatics.
    #[must_use]
    pub fn with_reaction_field(mut self, reaction_field: ReactionField) -> Self {
        self.electrostatics = Electrostatics::ReactionField(reaction_field);
        self
    }

    /// Use Ewald real-space electrostatics.
    #[must_use]
    pub fn with_ewald(mut self, alpha: f32) -> Self {
        self.electrostatics = Electrostatics::Ewald { alpha };
        self
    }

    /// Enable the long-range dispersion correction.
    #[must_use]
    pub fn with_dispersion_pme(mut self, alpha: f32) -> Self {
        self.dispersion = Some(DispersionPme { alpha });
        self
    }

    /// Enable periodic boundary conditions.
    #[must_use]
    pub fn periodic(mut self) -> Self {
        self.periodic = true;
        self
    }

    /// Squared cutoff, or infinity without a cutoff.
    #[must_use]
    pub fn cutoff_squared(&self) -> f32 {
        self.cutoff.map_or(f32::INFINITY, |c| c * c)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(cutoff) = self.cutoff {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err(NonbondedError::InvalidCutoff(cutoff));
            }
        }

        if let Some(switching) = self.switching_distance {
            let cutoff = self.require_cutoff("switching function")?;
            if !(switching > 0.0 && switching < cutoff) {
                return Err(NonbondedError::InvalidSwitchingDistance { switching, cutoff });
            }
        }

        match self.electrostatics {
            Electrostatics::Coulomb => {}
            Electrostatics::ReactionField(rf) => {
                self.require_cutoff("reaction field")?;
                if !rf.krf.is_finite() || !rf.crf.is_finite() {
                    return Err(NonbondedError::invalid_config(
                        "reaction-field constants must be finite",
                    ));
                }
            }
            Electrostatics::Ewald { alpha } => {
                self.require_cutoff("Ewald electrostatics")?;
                check_alpha("Ewald", alpha)?;
            }
        }

        if let Some(dispersion) = self.dispersion {
            self.require_cutoff("dispersion correction")?;
            check_alpha("dispersion", dispersion.alpha)?;
        }

        if self.periodic {
            self.require_cutoff("periodic boundary conditions")?;
        }

        Ok(())
    }

    fn require_cutoff(&self, feature: &'static str) -> Result<f32> {
        self.cutoff.ok_or(NonbondedError::CutoffRequired { feature })
    }
}

fn check_alpha(what: &str, alpha: f32) -> Result<()> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(NonbondedError::invalid_config(format!(
            "{what} alpha must be positive and finite, got {alpha}"
        )))
    }
}
