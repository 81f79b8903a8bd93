//! 8-wide `Vector3` batch type.
//!
//! [`Vec3x8`] stores 8 `Vector3<f32>` values in a structure-of-arrays (`SoA`)
//! layout, one [`F32x8`] per component.

use nalgebra::Vector3;

use crate::{F32x4, F32x8, LANES, reduce_to_vec3, transpose_to_lanes, transpose_to_rows};

/// A batch of 8 `Vector3<f32>` values stored in `SoA` (Structure of Arrays) layout.
///
/// # Memory Layout
///
/// ```text
/// xs: [x0, x1, x2, x3, x4, x5, x6, x7]  <- 8 x components (256 bits / 32 bytes)
/// ys: [y0, y1, y2, y3, y4, y5, y6, y7]  <- 8 y components (256 bits / 32 bytes)
/// zs: [z0, z1, z2, z3, z4, z5, z6, z7]  <- 8 z components (256 bits / 32 bytes)
/// ```
///
/// # Example
///
/// ```
/// use sim_simd::Vec3x8;
/// use nalgebra::Vector3;
///
/// let batch = Vec3x8::splat(Vector3::new(1.0, 2.0, 3.0));
///
/// // All 8 vectors are the same
/// let norms_sq = batch.norm_squared();
/// for norm_sq in norms_sq.to_array() {
///     assert_eq!(norm_sq, 14.0);  // 1² + 2² + 3²
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3x8 {
    /// X components of all 8 vectors.
    pub xs: F32x8,
    /// Y components of all 8 vectors.
    pub ys: F32x8,
    /// Z components of all 8 vectors.
    pub zs: F32x8,
}

impl Vec3x8 {
    /// Create a batch of 8 zero vectors.
    #[must_use]
    #[inline]
    pub const fn zeros() -> Self {
        Self {
            xs: F32x8::zeros(),
            ys: F32x8::zeros(),
            zs: F32x8::zeros(),
        }
    }

    /// Create from component vectors.
    #[must_use]
    #[inline]
    pub const fn new(xs: F32x8, ys: F32x8, zs: F32x8) -> Self {
        Self { xs, ys, zs }
    }

    /// Create from 8 individual vectors.
    #[must_use]
    #[inline]
    pub fn from_vectors(vectors: [Vector3<f32>; LANES]) -> Self {
        Self {
            xs: F32x8::from_array(vectors.map(|v| v.x)),
            ys: F32x8::from_array(vectors.map(|v| v.y)),
            zs: F32x8::from_array(vectors.map(|v| v.z)),
        }
    }

    /// Create by broadcasting a single vector to all 8 lanes.
    #[must_use]
    #[inline]
    pub fn splat(v: Vector3<f32>) -> Self {
        Self {
            xs: F32x8::splat(v.x),
            ys: F32x8::splat(v.y),
            zs: F32x8::splat(v.z),
        }
    }

    /// Transpose eight `(x, y, z, w)` records into a batch plus the `w` lanes.
    #[must_use]
    #[inline]
    pub fn from_rows(rows: &[F32x4; LANES]) -> (Self, F32x8) {
        let [xs, ys, zs, ws] = transpose_to_lanes(rows);
        (Self { xs, ys, zs }, ws)
    }

    /// Transpose back into eight `(x, y, z, w)` records, taking `w` from `ws`.
    #[must_use]
    #[inline]
    pub fn to_rows(&self, ws: F32x8) -> [F32x4; LANES] {
        transpose_to_rows(&[self.xs, self.ys, self.zs, ws])
    }

    /// Extract the vector at a given index.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Vector3<f32> {
        debug_assert!(index < LANES);
        Vector3::new(
            self.xs.lane(index),
            self.ys.lane(index),
            self.zs.lane(index),
        )
    }

    /// Convert to an array of 8 vectors.
    #[must_use]
    #[inline]
    pub fn to_vectors(&self) -> [Vector3<f32>; LANES] {
        std::array::from_fn(|i| self.get(i))
    }

    /// Compute dot product of each vector with a single direction vector.
    #[must_use]
    #[inline]
    pub fn dot(&self, direction: &Vector3<f32>) -> F32x8 {
        self.xs * direction.x + self.ys * direction.y + self.zs * direction.z
    }

    /// Compute pairwise dot products between this batch and another.
    #[must_use]
    #[inline]
    pub fn dot_pairwise(&self, other: &Self) -> F32x8 {
        self.xs * other.xs + self.ys * other.ys + self.zs * other.zs
    }

    /// Compute squared norm of each vector.
    #[must_use]
    #[inline]
    pub fn norm_squared(&self) -> F32x8 {
        self.dot_pairwise(self)
    }

    /// Multiply each vector by its corresponding lane of `scalars`.
    #[must_use]
    #[inline]
    pub fn scale_each(&self, scalars: F32x8) -> Self {
        Self {
            xs: self.xs * scalars,
            ys: self.ys * scalars,
            zs: self.zs * scalars,
        }
    }

    /// Subtract one vector from every lane.
    #[must_use]
    #[inline]
    pub fn sub_vector(&self, v: &Vector3<f32>) -> Self {
        Self {
            xs: self.xs - v.x,
            ys: self.ys - v.y,
            zs: self.zs - v.z,
        }
    }

    /// Sum of all 8 vectors.
    #[must_use]
    #[inline]
    pub fn reduce_sum(&self) -> Vector3<f32> {
        reduce_to_vec3(self.xs, self.ys, self.zs)
    }
}

impl std::ops::Add for Vec3x8 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.xs + rhs.xs, self.ys + rhs.ys, self.zs + rhs.zs)
    }
}

impl std::ops::AddAssign for Vec3x8 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3x8 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.xs - rhs.xs, self.ys - rhs.ys, self.zs - rhs.zs)
    }
}

impl std::ops::Neg for Vec3x8 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.xs, -self.ys, -self.zs)
    }
}

impl std::ops::Mul<f32> for Vec3x8 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.xs * rhs, self.ys * rhs, self.zs * rhs)
    }
}
