//! Eight-lane `f32` vector.
//!
//! [`F32x8`] is the float half of the wide-vector layer. Every operation is
//! lane-wise unless its documentation says otherwise. Loops are written one
//! lane array at a time so the compiler can map them onto 256-bit registers.

use std::ops::{
    Add, AddAssign, BitAnd, BitOr, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};

use crate::{F32x4, I32x8};

/// Number of lanes in every wide type of this crate.
pub const LANES: usize = 8;

/// Bits kept from the correctly rounded reciprocal square root when forming
/// the estimate used by [`F32x8::rsqrt`]. Leaves 11 explicit mantissa bits,
/// the precision of a hardware reciprocal-square-root approximation.
const RSQRT_ESTIMATE_MASK: u32 = !0x0FFF;

/// Eight `f32` lanes.
///
/// Comparisons return a *mask vector*: a lane is all-bits-set when the
/// comparison holds and all-bits-clear otherwise. Mask vectors combine with
/// `&` and `|`, select with [`F32x8::blend`], and pack into a `u8` with
/// [`F32x8::move_mask`] (bit `i` = lane `i`).
///
/// # Example
///
/// ```
/// use sim_simd::F32x8;
///
/// let r2 = F32x8::new(0.5, 1.5, 0.2, 4.0, 0.9, 1.0, 0.1, 2.0);
/// let inside = r2.simd_lt(F32x8::splat(1.0)).move_mask();
/// assert_eq!(inside, 0b0101_0101);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C, align(32))]
pub struct F32x8 {
    lanes: [f32; LANES],
}

impl Default for F32x8 {
    fn default() -> Self {
        Self::zeros()
    }
}

#[inline]
fn mask_lane(set: bool) -> f32 {
    f32::from_bits(if set { u32::MAX } else { 0 })
}

/// Emulated hardware estimate: `1/√x` truncated to 11 mantissa bits.
///
/// Computed from the full-precision value rather than read from a lookup
/// instruction, so every target produces the same bits.
#[inline]
pub(crate) fn rsqrt_estimate(x: f32) -> f32 {
    f32::from_bits((1.0 / x.sqrt()).to_bits() & RSQRT_ESTIMATE_MASK)
}

impl F32x8 {
    /// All lanes zero.
    #[must_use]
    #[inline]
    pub const fn zeros() -> Self {
        Self { lanes: [0.0; LANES] }
    }

    /// Broadcast a scalar to all lanes.
    #[must_use]
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { lanes: [v; LANES] }
    }

    /// Build from eight explicit lane values, lane 0 first.
    #[must_use]
    #[inline]
    #[allow(clippy::too_many_arguments, clippy::many_single_char_names)]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32, g: f32, h: f32) -> Self {
        Self {
            lanes: [a, b, c, d, e, f, g, h],
        }
    }

    /// Build from an array, lane 0 first.
    #[must_use]
    #[inline]
    pub const fn from_array(lanes: [f32; LANES]) -> Self {
        Self { lanes }
    }

    /// Load the first eight elements of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` has fewer than 8 elements.
    #[must_use]
    #[inline]
    pub fn load(src: &[f32]) -> Self {
        let mut lanes = [0.0; LANES];
        lanes.copy_from_slice(&src[..LANES]);
        Self { lanes }
    }

    /// Store all lanes into the first eight elements of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` has fewer than 8 elements.
    #[inline]
    pub fn store(self, dst: &mut [f32]) {
        dst[..LANES].copy_from_slice(&self.lanes);
    }

    /// Lane values as an array.
    #[must_use]
    #[inline]
    pub const fn to_array(self) -> [f32; LANES] {
        self.lanes
    }

    /// Value of one lane.
    #[must_use]
    #[inline]
    pub fn lane(self, index: usize) -> f32 {
        debug_assert!(index < LANES);
        self.lanes[index]
    }

    /// Lanes 0..4.
    #[must_use]
    #[inline]
    pub fn lower(self) -> F32x4 {
        F32x4::new(self.lanes[0], self.lanes[1], self.lanes[2], self.lanes[3])
    }

    /// Lanes 4..8.
    #[must_use]
    #[inline]
    pub fn upper(self) -> F32x4 {
        F32x4::new(self.lanes[4], self.lanes[5], self.lanes[6], self.lanes[7])
    }

    /// Concatenate two 4-lane halves.
    #[must_use]
    #[inline]
    pub fn from_halves(lower: F32x4, upper: F32x4) -> Self {
        let [a, b, c, d] = lower.to_array();
        let [e, f, g, h] = upper.to_array();
        Self::new(a, b, c, d, e, f, g, h)
    }

    #[inline]
    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        let mut lanes = self.lanes;
        for i in 0..LANES {
            lanes[i] = f(lanes[i]);
        }
        Self { lanes }
    }

    #[inline]
    fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut lanes = [0.0; LANES];
        for i in 0..LANES {
            lanes[i] = f(self.lanes[i], other.lanes[i]);
        }
        Self { lanes }
    }

    #[inline]
    fn compare(self, other: Self, f: impl Fn(f32, f32) -> bool) -> Self {
        let mut lanes = [0.0; LANES];
        for i in 0..LANES {
            lanes[i] = mask_lane(f(self.lanes[i], other.lanes[i]));
        }
        Self { lanes }
    }

    #[inline]
    fn bitwise(self, other: Self, f: impl Fn(u32, u32) -> u32) -> Self {
        let mut lanes = [0.0; LANES];
        for i in 0..LANES {
            lanes[i] = f32::from_bits(f(self.lanes[i].to_bits(), other.lanes[i].to_bits()));
        }
        Self { lanes }
    }

    // -------------------------------------------------------------------------
    // Comparisons
    // -------------------------------------------------------------------------

    /// Lane-wise `==` as a mask vector.
    #[must_use]
    #[inline]
    #[allow(clippy::float_cmp)]
    pub fn simd_eq(self, other: Self) -> Self {
        self.compare(other, |a, b| a == b)
    }

    /// Lane-wise `!=` as a mask vector. Ordered: a `NaN` lane compares false.
    #[must_use]
    #[inline]
    pub fn simd_ne(self, other: Self) -> Self {
        self.compare(other, |a, b| a < b || a > b)
    }

    /// Lane-wise `>` as a mask vector.
    #[must_use]
    #[inline]
    pub fn simd_gt(self, other: Self) -> Self {
        self.compare(other, |a, b| a > b)
    }

    /// Lane-wise `<` as a mask vector.
    #[must_use]
    #[inline]
    pub fn simd_lt(self, other: Self) -> Self {
        self.compare(other, |a, b| a < b)
    }

    /// Lane-wise `>=` as a mask vector.
    #[must_use]
    #[inline]
    pub fn simd_ge(self, other: Self) -> Self {
        self.compare(other, |a, b| a >= b)
    }

    /// Lane-wise `<=` as a mask vector.
    #[must_use]
    #[inline]
    pub fn simd_le(self, other: Self) -> Self {
        self.compare(other, |a, b| a <= b)
    }

    /// Pack the sign bit of every lane into a `u8`, bit `i` = lane `i`.
    ///
    /// Applied to a mask vector this yields the 8-bit form of the mask.
    #[must_use]
    #[inline]
    pub fn move_mask(self) -> u8 {
        let mut bits = 0u8;
        for i in 0..LANES {
            if self.lanes[i].is_sign_negative() {
                bits |= 1 << i;
            }
        }
        bits
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Per-lane select: `b` where `mask` is set, `a` elsewhere.
    ///
    /// Only the top bit of each mask lane is consulted.
    #[must_use]
    #[inline]
    pub fn blend(a: Self, b: Self, mask: Self) -> Self {
        let mut lanes = a.lanes;
        for i in 0..LANES {
            if mask.lanes[i].is_sign_negative() {
                lanes[i] = b.lanes[i];
            }
        }
        Self { lanes }
    }

    /// Per-lane select driven by a packed 8-bit mask: `b` where bit `i` is
    /// set, `a` elsewhere.
    ///
    /// Each bit is isolated into its own lane and turned into a full lane
    /// mask by comparing the lane (reinterpreted as a float) against zero, so
    /// the result is identical to [`F32x8::blend`] with the equivalent mask
    /// vector.
    #[must_use]
    #[inline]
    pub fn blend_bits(a: Self, b: Self, mask: u8) -> Self {
        let bits = I32x8::splat(i32::from(mask)) & I32x8::new(1, 2, 4, 8, 16, 32, 64, 128);
        let element_mask = bits.bitcast_f32().simd_ne(Self::zeros());
        Self::blend(a, b, element_mask)
    }

    // -------------------------------------------------------------------------
    // Rounding and elementwise math
    // -------------------------------------------------------------------------

    /// Round toward negative infinity.
    #[must_use]
    #[inline]
    pub fn floor(self) -> Self {
        self.map(f32::floor)
    }

    /// Round toward positive infinity.
    #[must_use]
    #[inline]
    pub fn ceil(self) -> Self {
        self.map(f32::ceil)
    }

    /// Round to nearest, ties to even.
    #[must_use]
    #[inline]
    pub fn round(self) -> Self {
        self.map(f32::round_ties_even)
    }

    /// Lane-wise minimum.
    #[must_use]
    #[inline]
    pub fn min(self, other: Self) -> Self {
        self.zip_with(other, f32::min)
    }

    /// Lane-wise maximum.
    #[must_use]
    #[inline]
    pub fn max(self, other: Self) -> Self {
        self.zip_with(other, f32::max)
    }

    /// Absolute value (clears the sign bit).
    #[must_use]
    #[inline]
    pub fn abs(self) -> Self {
        self.map(f32::abs)
    }

    /// Square root.
    #[must_use]
    #[inline]
    pub fn sqrt(self) -> Self {
        self.map(f32::sqrt)
    }

    /// Fast reciprocal square root.
    ///
    /// Follows the estimate-then-refine scheme of hardware `rsqrt`: an
    /// 11-bit estimate (relative error below 2⁻¹¹) refined by one
    /// Newton-Raphson step, `y *= 1.5 − 0.5·x·y²`. The estimate is emulated
    /// by truncating the correctly rounded `1/√x`, which costs a square root
    /// and a division per lane but gives identical results on every target.
    /// The refined result has a relative error on the order of 1e-6.
    ///
    /// Zero, negative and non-finite lanes produce non-finite results; mask
    /// them out before using the result.
    #[must_use]
    #[inline]
    pub fn rsqrt(self) -> Self {
        let y = self.map(rsqrt_estimate);
        let half_x = self * 0.5;
        y * (1.5 - half_x * y * y)
    }

    /// Horizontal sum of the lane-wise product, returned as a scalar.
    #[must_use]
    #[inline]
    pub fn dot8(self, other: Self) -> f32 {
        let p = self * other;
        let l = p.lanes;
        ((l[0] + l[1]) + (l[2] + l[3])) + ((l[4] + l[5]) + (l[6] + l[7]))
    }

    /// Horizontal sum of all lanes.
    #[must_use]
    #[inline]
    pub fn reduce_add(self) -> f32 {
        self.dot8(Self::splat(1.0))
    }

    /// Truncating conversion to integer lanes.
    ///
    /// Out-of-range lanes saturate and `NaN` becomes zero.
    #[must_use]
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_i32(self) -> I32x8 {
        let mut lanes = [0i32; LANES];
        for i in 0..LANES {
            lanes[i] = self.lanes[i] as i32;
        }
        I32x8::from_array(lanes)
    }

    /// Reinterpret the lane bits as integers.
    #[must_use]
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    pub fn bitcast_i32(self) -> I32x8 {
        let mut lanes = [0i32; LANES];
        for i in 0..LANES {
            lanes[i] = self.lanes[i].to_bits() as i32;
        }
        I32x8::from_array(lanes)
    }
}

// =============================================================================
// Operators
// =============================================================================

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait for F32x8 {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<f32> for F32x8 {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: f32) -> Self {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<F32x8> for f32 {
            type Output = F32x8;

            #[inline]
            fn $method(self, rhs: F32x8) -> F32x8 {
                rhs.map(|b| self $op b)
            }
        }

        impl $assign_trait for F32x8 {
            #[inline]
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }

        impl $assign_trait<f32> for F32x8 {
            #[inline]
            fn $assign_method(&mut self, rhs: f32) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, +);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, -);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, *);
impl_binary_op!(Div, div, DivAssign, div_assign, /);

impl Neg for F32x8 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl BitAnd for F32x8 {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        self.bitwise(rhs, |a, b| a & b)
    }
}

impl BitOr for F32x8 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.bitwise(rhs, |a, b| a | b)
    }
}

impl From<[f32; LANES]> for F32x8 {
    fn from(lanes: [f32; LANES]) -> Self {
        Self::from_array(lanes)
    }
}

impl From<F32x8> for [f32; LANES] {
    fn from(v: F32x8) -> Self {
        v.to_array()
    }
}
