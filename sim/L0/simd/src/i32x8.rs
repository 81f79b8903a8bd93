//! Eight-lane `i32` vector.

use std::ops::{BitAnd, BitOr};

use crate::{F32x8, LANES};

/// Eight `i32` lanes.
///
/// Used for table indices and for the bit patterns of mask vectors.
/// Converts to [`F32x8`] with [`I32x8::to_f32`]; the reverse conversion
/// ([`F32x8::to_i32`]) truncates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(32))]
pub struct I32x8 {
    lanes: [i32; LANES],
}

impl I32x8 {
    /// All lanes zero.
    #[must_use]
    #[inline]
    pub const fn zeros() -> Self {
        Self { lanes: [0; LANES] }
    }

    /// Broadcast a scalar to all lanes.
    #[must_use]
    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { lanes: [v; LANES] }
    }

    /// Build from eight explicit lane values, lane 0 first.
    #[must_use]
    #[inline]
    #[allow(clippy::too_many_arguments, clippy::many_single_char_names)]
    pub const fn new(a: i32, b: i32, c: i32, d: i32, e: i32, f: i32, g: i32, h: i32) -> Self {
        Self {
            lanes: [a, b, c, d, e, f, g, h],
        }
    }

    /// Build from an array, lane 0 first.
    #[must_use]
    #[inline]
    pub const fn from_array(lanes: [i32; LANES]) -> Self {
        Self { lanes }
    }

    /// Load the first eight elements of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` has fewer than 8 elements.
    #[must_use]
    #[inline]
    pub fn load(src: &[i32]) -> Self {
        let mut lanes = [0; LANES];
        lanes.copy_from_slice(&src[..LANES]);
        Self { lanes }
    }

    /// Store all lanes into the first eight elements of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` has fewer than 8 elements.
    #[inline]
    pub fn store(self, dst: &mut [i32]) {
        dst[..LANES].copy_from_slice(&self.lanes);
    }

    /// Lane values as an array.
    #[must_use]
    #[inline]
    pub const fn to_array(self) -> [i32; LANES] {
        self.lanes
    }

    /// Value of one lane.
    #[must_use]
    #[inline]
    pub fn lane(self, index: usize) -> i32 {
        debug_assert!(index < LANES);
        self.lanes[index]
    }

    /// Lane-wise minimum.
    #[must_use]
    #[inline]
    pub fn min(self, other: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..LANES {
            lanes[i] = lanes[i].min(other.lanes[i]);
        }
        Self { lanes }
    }

    /// Lane-wise maximum.
    #[must_use]
    #[inline]
    pub fn max(self, other: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..LANES {
            lanes[i] = lanes[i].max(other.lanes[i]);
        }
        Self { lanes }
    }

    /// True if any lane has a nonzero bit pattern.
    #[must_use]
    #[inline]
    pub fn any(self) -> bool {
        self.lanes.iter().any(|&v| v != 0)
    }

    /// Conversion to float lanes, exact for magnitudes up to 2²⁴.
    #[must_use]
    #[inline]
    pub fn to_f32(self) -> F32x8 {
        let mut lanes = [0.0f32; LANES];
        for i in 0..LANES {
            lanes[i] = self.lanes[i] as f32;
        }
        F32x8::from_array(lanes)
    }

    /// Reinterpret the lane bits as floats.
    #[must_use]
    #[inline]
    #[allow(clippy::cast_sign_loss)]
    pub fn bitcast_f32(self) -> F32x8 {
        let mut lanes = [0.0f32; LANES];
        for i in 0..LANES {
            lanes[i] = f32::from_bits(self.lanes[i] as u32);
        }
        F32x8::from_array(lanes)
    }
}

impl BitAnd for I32x8 {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..LANES {
            lanes[i] &= rhs.lanes[i];
        }
        Self { lanes }
    }
}

impl BitOr for I32x8 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        let mut lanes = self.lanes;
        for i in 0..LANES {
            lanes[i] |= rhs.lanes[i];
        }
        Self { lanes }
    }
}

impl From<[i32; LANES]> for I32x8 {
    fn from(lanes: [i32; LANES]) -> Self {
        Self::from_array(lanes)
    }
}
