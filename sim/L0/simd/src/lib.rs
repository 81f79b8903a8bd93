//! Eight-lane vector arithmetic for data-parallel physics kernels.
//!
//! This crate provides the wide-vector layer underneath the nonbonded force
//! kernels: fixed 8-lane float and integer vectors plus the cross-lane
//! operations that move data between per-atom storage and per-component
//! arithmetic.
//!
//! # Architecture
//!
//! - [`F32x8`] - 8 `f32` lanes: arithmetic, compare-to-mask, blend, rounding,
//!   fast reciprocal square root, horizontal dot product
//! - [`I32x8`] - 8 `i32` lanes: table indices and mask bit patterns
//! - [`F32x4`] - one `(x, y, z, w)` record in per-atom layout
//! - [`Vec3x8`] - 8 `Vector3<f32>` values in structure-of-arrays layout
//! - [`transpose_to_lanes`] / [`transpose_to_rows`] - layout conversion
//! - [`gather_pair`] - paired table reads for interpolation
//! - [`reduce_to_vec3`] - fold 8 contributions onto one vector
//!
//! # Masks
//!
//! Comparisons produce mask vectors (all bits set or clear per lane), and
//! [`F32x8::move_mask`] packs them into a `u8` with bit `i` for lane `i`.
//! Both forms drive selection:
//!
//! ```
//! use sim_simd::F32x8;
//!
//! let energy = F32x8::splat(2.0);
//! let r2 = F32x8::new(0.1, 0.2, 9.0, 0.3, 9.0, 0.4, 0.5, 9.0);
//! let inside = r2.simd_lt(F32x8::splat(1.0));
//!
//! let by_vector = F32x8::blend(F32x8::zeros(), energy, inside);
//! let by_bits = F32x8::blend_bits(F32x8::zeros(), energy, inside.move_mask());
//! assert_eq!(by_vector.to_array(), by_bits.to_array());
//! assert_eq!(by_vector.reduce_add(), 10.0);
//! ```
//!
//! # Performance Notes
//!
//! - Types are plain aligned arrays; every operation is a fixed-length loop
//!   written for auto-vectorization, so the same code serves AVX, NEON and
//!   scalar targets
//! - Only eight lanes are supported; kernels built on this crate assume it

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]
// SIMD code intentionally uses indexed loops for auto-vectorization patterns
#![allow(clippy::needless_range_loop)]
// Suboptimal mul_add is intentional for auto-vectorization patterns
#![allow(clippy::suboptimal_flops)]
// Some functions use non-const methods internally
#![allow(clippy::missing_const_for_fn)]

mod cross_lane;
mod f32x4;
mod f32x8;
mod i32x8;
mod vec3x8;

pub use cross_lane::*;
pub use f32x4::*;
pub use f32x8::*;
pub use i32x8::*;
pub use vec3x8::*;
