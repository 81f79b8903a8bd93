//! Error types for nonbonded force setup.
//!
//! Every check happens while building configurations, tables, neighbor lists
//! and kernel inputs. Once a [`KernelInputs`](crate::KernelInputs) exists the
//! per-block computation has no error path.

use thiserror::Error;

/// Errors raised while validating nonbonded inputs.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum NonbondedError {
    /// Cutoff distance is not positive and finite.
    #[error("invalid cutoff: {0} (must be positive and finite)")]
    InvalidCutoff(f32),

    /// Switching distance outside the open interval `(0, cutoff)`.
    #[error("switching distance {switching} must lie in (0, {cutoff})")]
    InvalidSwitchingDistance {
        /// Requested switching distance.
        switching: f32,
        /// Configured cutoff.
        cutoff: f32,
    },

    /// A feature that only makes sense with a finite cutoff was enabled without one.
    #[error("{feature} requires a cutoff")]
    CutoffRequired {
        /// The feature that needs the cutoff.
        feature: &'static str,
    },

    /// Interaction table has too few samples to interpolate.
    #[error("table has {len} samples, at least {min} required")]
    TableTooShort {
        /// Number of samples supplied.
        len: usize,
        /// Minimum number of samples.
        min: usize,
    },

    /// Interaction table spacing is not positive and finite.
    #[error("invalid table spacing: {0}")]
    InvalidTableSpacing(f64),

    /// Interaction table does not reach the largest argument the kernel can present.
    #[error("table covers arguments up to {covered}, kernel may present {required}")]
    TableRangeTooSmall {
        /// Largest argument the table interpolates without clamping.
        covered: f32,
        /// Largest argument the kernel will look up.
        required: f32,
    },

    /// Periodic box edge shorter than twice the cutoff.
    #[error("periodic box edge {edge} is smaller than twice the cutoff {cutoff}")]
    BoxTooSmall {
        /// Offending box edge length.
        edge: f32,
        /// Configured cutoff.
        cutoff: f32,
    },

    /// Box vectors are not in reduced form.
    #[error("invalid periodic box: {reason}")]
    InvalidBox {
        /// Description of what's wrong.
        reason: String,
    },

    /// Two arrays that must describe the same atoms disagree in length.
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Which array.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Neighbor list shape or indices are inconsistent.
    #[error("malformed neighbor list: {reason}")]
    InvalidNeighborList {
        /// Description of what's wrong.
        reason: String,
    },

    /// The dispersion correction is enabled but no coefficients were given.
    #[error("dispersion correction enabled but no dispersion coefficients given")]
    MissingDispersionCoefficients,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl NonbondedError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid box error.
    #[must_use]
    pub fn invalid_box(reason: impl Into<String>) -> Self {
        Self::InvalidBox {
            reason: reason.into(),
        }
    }

    /// Create a malformed neighbor list error.
    #[must_use]
    pub fn invalid_neighbors(reason: impl Into<String>) -> Self {
        Self::InvalidNeighborList {
            reason: reason.into(),
        }
    }

    /// Create a length mismatch error.
    #[must_use]
    pub fn length_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::InvalidCutoff(_)
                | Self::InvalidSwitchingDistance { .. }
                | Self::CutoffRequired { .. }
        )
    }
}

/// Result type for nonbonded setup.
pub type Result<T> = std::result::Result<T, NonbondedError>;
