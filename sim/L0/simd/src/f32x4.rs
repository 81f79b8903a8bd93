//! Four-lane `f32` vector for per-atom `(x, y, z, w)` records.

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use nalgebra::Vector3;

/// Four `f32` lanes holding one `(x, y, z, w)` record.
///
/// This is the array-of-structures side of the layer: positions with a charge
/// in `w`, or a force with an unused `w`. Eight of them transpose into four
/// [`F32x8`](crate::F32x8) component vectors with
/// [`transpose_to_lanes`](crate::transpose_to_lanes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C, align(16))]
pub struct F32x4 {
    lanes: [f32; 4],
}

impl F32x4 {
    /// All lanes zero.
    #[must_use]
    #[inline]
    pub const fn zeros() -> Self {
        Self { lanes: [0.0; 4] }
    }

    /// Broadcast a scalar to all lanes.
    #[must_use]
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { lanes: [v; 4] }
    }

    /// Build from explicit lane values.
    #[must_use]
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self {
            lanes: [x, y, z, w],
        }
    }

    /// Build from a 3-vector and a fourth component.
    #[must_use]
    #[inline]
    pub fn from_vector(v: &Vector3<f32>, w: f32) -> Self {
        Self::new(v.x, v.y, v.z, w)
    }

    /// Load the first four elements of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` has fewer than 4 elements.
    #[must_use]
    #[inline]
    pub fn load(src: &[f32]) -> Self {
        let mut lanes = [0.0; 4];
        lanes.copy_from_slice(&src[..4]);
        Self { lanes }
    }

    /// Store all lanes into the first four elements of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` has fewer than 4 elements.
    #[inline]
    pub fn store(self, dst: &mut [f32]) {
        dst[..4].copy_from_slice(&self.lanes);
    }

    /// Lane values as an array.
    #[must_use]
    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        self.lanes
    }

    /// Value of one lane.
    #[must_use]
    #[inline]
    pub fn lane(self, index: usize) -> f32 {
        debug_assert!(index < 4);
        self.lanes[index]
    }

    /// The `(x, y, z)` part.
    #[must_use]
    #[inline]
    pub fn xyz(self) -> Vector3<f32> {
        Vector3::new(self.lanes[0], self.lanes[1], self.lanes[2])
    }

    /// Round toward negative infinity.
    #[must_use]
    #[inline]
    pub fn floor(self) -> Self {
        let mut lanes = self.lanes;
        for lane in &mut lanes {
            *lane = lane.floor();
        }
        Self { lanes }
    }

    /// Lane-wise minimum.
    #[must_use]
    #[inline]
    pub fn min(self, other: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..4 {
            lanes[i] = lanes[i].min(other.lanes[i]);
        }
        Self { lanes }
    }

    /// Lane-wise maximum.
    #[must_use]
    #[inline]
    pub fn max(self, other: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..4 {
            lanes[i] = lanes[i].max(other.lanes[i]);
        }
        Self { lanes }
    }
}

impl Add for F32x4 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..4 {
            lanes[i] += rhs.lanes[i];
        }
        Self { lanes }
    }
}

impl Sub for F32x4 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..4 {
            lanes[i] -= rhs.lanes[i];
        }
        Self { lanes }
    }
}

impl Mul for F32x4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..4 {
            lanes[i] *= rhs.lanes[i];
        }
        Self { lanes }
    }
}

impl Add<f32> for F32x4 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: f32) -> Self {
        self + Self::splat(rhs)
    }
}

impl Mul<f32> for F32x4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        self * Self::splat(rhs)
    }
}

impl AddAssign for F32x4 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for F32x4 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
