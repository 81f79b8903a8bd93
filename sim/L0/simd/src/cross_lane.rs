//! Operations that move data across lanes.
//!
//! Storage is per atom (`x, y, z, w` records) while physics runs per component
//! across eight atoms. The transposes convert between the two layouts; the
//! gather and reduction handle the two places where lanes meet a single
//! scalar location (a table row, a single partner atom).

use nalgebra::Vector3;

use crate::{F32x4, F32x8, I32x8, LANES};

/// Transpose eight `(x, y, z, w)` records into four component vectors.
///
/// Lane `i` of output `c` is component `c` of record `i`.
///
/// ```
/// use sim_simd::{F32x4, transpose_to_lanes};
///
/// let rows: [F32x4; 8] =
///     std::array::from_fn(|i| F32x4::new(i as f32, 10.0 + i as f32, 20.0, -1.0));
/// let [x, y, z, w] = transpose_to_lanes(&rows);
/// assert_eq!(x.lane(3), 3.0);
/// assert_eq!(y.lane(5), 15.0);
/// assert_eq!(z.lane(0), 20.0);
/// assert_eq!(w.lane(7), -1.0);
/// ```
#[must_use]
#[inline]
pub fn transpose_to_lanes(rows: &[F32x4; LANES]) -> [F32x8; 4] {
    let mut cols = [[0.0f32; LANES]; 4];
    for (i, row) in rows.iter().enumerate() {
        let [x, y, z, w] = row.to_array();
        cols[0][i] = x;
        cols[1][i] = y;
        cols[2][i] = z;
        cols[3][i] = w;
    }
    cols.map(F32x8::from_array)
}

/// Transpose four component vectors back into eight `(x, y, z, w)` records.
///
/// Inverse of [`transpose_to_lanes`].
#[must_use]
#[inline]
pub fn transpose_to_rows(cols: &[F32x8; 4]) -> [F32x4; LANES] {
    let [x, y, z, w] = cols.map(F32x8::to_array);
    std::array::from_fn(|i| F32x4::new(x[i], y[i], z[i], w[i]))
}

/// Read `table[index[i]]` and `table[index[i] + 1]` for every lane.
///
/// Returns `(values, next_values)`. This pairing is what table interpolation
/// needs; a portable build performs the eight dual loads in one pass.
///
/// # Panics
///
/// Panics if any lane index is negative or if `index + 1` falls outside the
/// table. Callers clamp indices before gathering.
#[must_use]
#[inline]
#[allow(clippy::cast_sign_loss)]
pub fn gather_pair(table: &[f32], index: I32x8) -> (F32x8, F32x8) {
    let mut first = [0.0f32; LANES];
    let mut second = [0.0f32; LANES];
    for (lane, &i) in index.to_array().iter().enumerate() {
        let pair = &table[i as usize..i as usize + 2];
        first[lane] = pair[0];
        second[lane] = pair[1];
    }
    (F32x8::from_array(first), F32x8::from_array(second))
}

/// Sum each of three component vectors across its eight lanes.
///
/// Given the x, y and z components of eight independent contributions,
/// returns the single vector `(Σx, Σy, Σz)`. Used to fold eight pair forces
/// onto the one atom they all act on.
///
/// ```
/// use sim_simd::{F32x8, reduce_to_vec3};
///
/// let x = F32x8::splat(1.0);
/// let y = F32x8::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0);
/// let z = F32x8::splat(-0.5);
/// let sum = reduce_to_vec3(x, y, z);
/// assert_eq!(sum.x, 8.0);
/// assert_eq!(sum.y, 28.0);
/// assert_eq!(sum.z, -4.0);
/// ```
#[must_use]
#[inline]
pub fn reduce_to_vec3(x: F32x8, y: F32x8, z: F32x8) -> Vector3<f32> {
    // Fold the upper half onto the lower half first, then finish in 4 lanes.
    let folded = [x, y, z].map(|v| (v.lower() + v.upper()).to_array());
    let sum = |l: [f32; 4]| (l[0] + l[2]) + (l[1] + l[3]);
    Vector3::new(sum(folded[0]), sum(folded[1]), sum(folded[2]))
}
