//! Periodic boxes and minimum-image displacements.
//!
//! Each block picks one of four displacement strategies before its neighbor
//! loop starts. The strategy is a type implementing [`MinimumImage`], so the
//! kernel is compiled once per strategy and the inner loop never branches
//! on it.
//!
//! # Primary cell
//!
//! Blocks whose atoms sit at least a cutoff away from every face of the
//! brick `[0, a) × [0, b) × [0, c)` skip minimum-image work entirely, which
//! is only exact when every neighbor lies in that brick too.
//! `KernelInputs::new` wraps positions with [`PeriodicBox::wrap_records`]
//! whenever any of them falls outside it.

use nalgebra::Vector3;
use sim_simd::{F32x4, F32x8, LANES, Vec3x8};

use crate::error::{NonbondedError, Result};
use crate::params::RECORD_WIDTH;

/// Periodic simulation cell.
///
/// Box vectors are stored in reduced form: `a` along x, `b` in the xy
/// plane, `|b.x| ≤ a.x/2`, `|c.x| ≤ a.x/2`, `|c.y| ≤ b.y/2`. A box with
/// zero off-diagonal components is rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicBox {
    vectors: [Vector3<f32>; 3],
    size: F32x4,
    inverse_size: F32x4,
    triclinic: bool,
}

impl PeriodicBox {
    /// Rectangular box with the given edge lengths.
    pub fn rectangular(a: f32, b: f32, c: f32) -> Result<Self> {
        Self::triclinic(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(0.0, b, 0.0),
            Vector3::new(0.0, 0.0, c),
        )
    }

    /// Cubic box.
    pub fn cubic(edge: f32) -> Result<Self> {
        Self::rectangular(edge, edge, edge)
    }

    /// General box from three reduced-form vectors.
    #[allow(clippy::float_cmp)]
    pub fn triclinic(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Result<Self> {
        let diagonal = [a.x, b.y, c.z];
        if diagonal.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(NonbondedError::invalid_box(format!(
                "diagonal {diagonal:?} must be positive and finite"
            )));
        }
        if a.y != 0.0 || a.z != 0.0 || b.z != 0.0 {
            return Err(NonbondedError::invalid_box(
                "first vector must lie on x and second in the xy plane",
            ));
        }
        if !b.x.is_finite() || !c.x.is_finite() || !c.y.is_finite() {
            return Err(NonbondedError::invalid_box("box vectors must be finite"));
        }
        if b.x.abs() > 0.5 * a.x || c.x.abs() > 0.5 * a.x || c.y.abs() > 0.5 * b.y {
            return Err(NonbondedError::invalid_box(
                "box vectors are not in reduced form",
            ));
        }

        let triclinic = b.x != 0.0 || c.x != 0.0 || c.y != 0.0;
        Ok(Self {
            vectors: [a, b, c],
            size: F32x4::new(a.x, b.y, c.z, 0.0),
            inverse_size: F32x4::new(1.0 / a.x, 1.0 / b.y, 1.0 / c.z, 0.0),
            triclinic,
        })
    }

    /// The three box vectors.
    #[must_use]
    pub fn vectors(&self) -> &[Vector3<f32>; 3] {
        &self.vectors
    }

    /// Edge lengths along x, y and z (the box diagonal).
    #[must_use]
    pub fn size(&self) -> Vector3<f32> {
        self.size.xyz()
    }

    /// Whether any off-diagonal component is nonzero.
    #[must_use]
    pub fn is_triclinic(&self) -> bool {
        self.triclinic
    }

    /// Check that every edge is at least twice the cutoff.
    pub fn ensure_fits_cutoff(&self, cutoff: f32) -> Result<()> {
        for edge in self.size.xyz().iter().copied() {
            if edge < 2.0 * cutoff {
                return Err(NonbondedError::BoxTooSmall { edge, cutoff });
            }
        }
        Ok(())
    }

    /// Translate a position into the primary cell.
    #[must_use]
    pub fn wrap_into_cell(&self, position: Vector3<f32>) -> Vector3<f32> {
        let [a, b, c] = self.vectors;
        let inv = self.inverse_size.xyz();
        let mut p = position;
        p -= c * (p.z * inv.z).floor();
        p -= b * (p.y * inv.y).floor();
        p -= a * (p.x * inv.x).floor();
        p
    }

    /// Whether `position` lies in the closed primary cell
    /// `[0, a.x] × [0, b.y] × [0, c.z]`.
    #[must_use]
    pub fn contains(&self, position: &Vector3<f32>) -> bool {
        let size = self.size.xyz();
        (0..3).all(|k| position[k] >= 0.0 && position[k] <= size[k])
    }

    /// Copy of packed `(x, y, z, q)` records with every position outside the
    /// primary cell wrapped into it. Charges are copied unchanged.
    #[must_use]
    pub fn wrap_records(&self, posq: &[f32]) -> Vec<f32> {
        let mut wrapped = posq.to_vec();
        for record in wrapped.chunks_exact_mut(RECORD_WIDTH) {
            let p = Vector3::new(record[0], record[1], record[2]);
            if !self.contains(&p) {
                let w = self.wrap_into_cell(p);
                record[..3].copy_from_slice(w.as_slice());
            }
        }
        wrapped
    }

    /// Nearest periodic image of a displacement.
    #[must_use]
    pub fn minimum_image(&self, delta: Vector3<f32>) -> Vector3<f32> {
        let [a, b, c] = self.vectors;
        let inv = self.inverse_size.xyz();
        let mut d = delta;
        d -= c * (d.z * inv.z + 0.5).floor();
        d -= b * (d.y * inv.y + 0.5).floor();
        d -= a * (d.x * inv.x + 0.5).floor();
        d
    }

    /// Box data for a block centred at `center`.
    #[must_use]
    pub fn frame(&self, center: Vector3<f32>) -> ImageFrame {
        ImageFrame {
            size: self.size,
            inverse_size: self.inverse_size,
            vectors: self.vectors,
            center: F32x4::from_vector(&center, 0.0),
        }
    }
}

/// Displacement strategy for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodicMode {
    /// Raw differences. The block and its cutoff sphere lie inside the cell.
    NoPeriodic,
    /// Wrap every atom next to the block center, then take raw differences.
    PerAtom,
    /// Rectangular minimum image on every pair.
    PerInteraction,
    /// Sequential reduction along the three box vectors on every pair.
    Triclinic,
}

/// Outcome of classifying a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockImage {
    /// Chosen strategy.
    pub mode: PeriodicMode,
    /// Center of the block's bounding box.
    pub center: Vector3<f32>,
}

impl BlockImage {
    /// Classification used without periodic boundaries.
    #[must_use]
    pub fn open() -> Self {
        Self {
            mode: PeriodicMode::NoPeriodic,
            center: Vector3::zeros(),
        }
    }
}

/// Choose the cheapest displacement strategy that is exact for this block.
///
/// `rows` are the `(x, y, z, q)` records of the block's atoms.
#[must_use]
pub fn classify_block(rows: &[F32x4; LANES], periodic_box: &PeriodicBox, cutoff: f32) -> BlockImage {
    let mut min = rows[0];
    let mut max = rows[0];
    for row in &rows[1..] {
        min = min.min(*row);
        max = max.max(*row);
    }
    let (min, max) = (min.xyz(), max.xyz());
    let center = (min + max) * 0.5;
    let size = periodic_box.size();

    let near_face = (0..3).any(|k| min[k] < cutoff || max[k] > size[k] - cutoff);
    let mode = if !near_face {
        PeriodicMode::NoPeriodic
    } else if periodic_box.is_triclinic() {
        PeriodicMode::Triclinic
    } else if (0..3).all(|k| 0.5 * (size[k] - (max[k] - min[k])) >= cutoff) {
        PeriodicMode::PerAtom
    } else {
        PeriodicMode::PerInteraction
    };

    BlockImage { mode, center }
}

/// Box geometry in the forms displacement code consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFrame {
    size: F32x4,
    inverse_size: F32x4,
    vectors: [Vector3<f32>; 3],
    center: F32x4,
}

impl ImageFrame {
    /// Frame for a non-periodic system. Only [`OpenImage`] may use it.
    #[must_use]
    pub fn open() -> Self {
        Self {
            size: F32x4::zeros(),
            inverse_size: F32x4::zeros(),
            vectors: [Vector3::zeros(); 3],
            center: F32x4::zeros(),
        }
    }
}

/// Minimum-image strategy, resolved at compile time.
pub trait MinimumImage {
    /// The strategy this type implements.
    const MODE: PeriodicMode;

    /// Adjust one `(x, y, z, q)` record before displacements are taken.
    ///
    /// The charge lane passes through unchanged.
    #[inline]
    fn wrap_atom(_frame: &ImageFrame, row: F32x4) -> F32x4 {
        row
    }

    /// Displacement `block − atom` on every lane and its squared length.
    fn displacement(frame: &ImageFrame, block: &Vec3x8, atom: F32x4) -> (Vec3x8, F32x8);
}

#[inline]
fn raw_displacement(block: &Vec3x8, atom: F32x4) -> Vec3x8 {
    block.sub_vector(&atom.xyz())
}

/// Raw differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenImage;

impl MinimumImage for OpenImage {
    const MODE: PeriodicMode = PeriodicMode::NoPeriodic;

    #[inline]
    fn displacement(_frame: &ImageFrame, block: &Vec3x8, atom: F32x4) -> (Vec3x8, F32x8) {
        let d = raw_displacement(block, atom);
        (d, d.norm_squared())
    }
}

/// Atoms wrapped to the image nearest the block center.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerAtomImage;

impl MinimumImage for PerAtomImage {
    const MODE: PeriodicMode = PeriodicMode::PerAtom;

    #[inline]
    fn wrap_atom(frame: &ImageFrame, row: F32x4) -> F32x4 {
        row - ((row - frame.center) * frame.inverse_size + 0.5).floor() * frame.size
    }

    #[inline]
    fn displacement(_frame: &ImageFrame, block: &Vec3x8, atom: F32x4) -> (Vec3x8, F32x8) {
        let d = raw_displacement(block, atom);
        (d, d.norm_squared())
    }
}

/// Per-pair rectangular minimum image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerInteractionImage;

impl MinimumImage for PerInteractionImage {
    const MODE: PeriodicMode = PeriodicMode::PerInteraction;

    #[inline]
    fn displacement(frame: &ImageFrame, block: &Vec3x8, atom: F32x4) -> (Vec3x8, F32x8) {
        let d = raw_displacement(block, atom);
        let size = frame.size.to_array();
        let inv = frame.inverse_size.to_array();
        let d = Vec3x8::new(
            d.xs - (d.xs * inv[0]).round() * size[0],
            d.ys - (d.ys * inv[1]).round() * size[1],
            d.zs - (d.zs * inv[2]).round() * size[2],
        );
        (d, d.norm_squared())
    }
}

/// Per-pair reduction along the third, second, then first box vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriclinicImage;

impl MinimumImage for TriclinicImage {
    const MODE: PeriodicMode = PeriodicMode::Triclinic;

    #[inline]
    fn displacement(frame: &ImageFrame, block: &Vec3x8, atom: F32x4) -> (Vec3x8, F32x8) {
        let Vec3x8 {
            mut xs,
            mut ys,
            mut zs,
        } = raw_displacement(block, atom);
        let [a, b, c] = frame.vectors;
        let inv = frame.inverse_size.to_array();

        let scale = (zs * inv[2] + 0.5).floor();
        xs -= scale * c.x;
        ys -= scale * c.y;
        zs -= scale * c.z;

        let scale = (ys * inv[1] + 0.5).floor();
        xs -= scale * b.x;
        ys -= scale * b.y;

        let scale = (xs * inv[0] + 0.5).floor();
        xs -= scale * a.x;

        let d = Vec3x8::new(xs, ys, zs);
        (d, d.norm_squared())
    }
}

/// Displacements from every block lane to `atom` under `mode`.
///
/// Applies the strategy's atom wrapping to both sides first, exactly as the
/// kernel does. Intended for diagnostics and for comparing strategies.
#[must_use]
pub fn pair_displacements(
    mode: PeriodicMode,
    frame: &ImageFrame,
    block_rows: &[F32x4; LANES],
    atom: F32x4,
) -> (Vec3x8, F32x8) {
    fn run<M: MinimumImage>(
        frame: &ImageFrame,
        block_rows: &[F32x4; LANES],
        atom: F32x4,
    ) -> (Vec3x8, F32x8) {
        let rows = block_rows.map(|row| M::wrap_atom(frame, row));
        let (block, _) = Vec3x8::from_rows(&rows);
        M::displacement(frame, &block, M::wrap_atom(frame, atom))
    }

    match mode {
        PeriodicMode::NoPeriodic => run::<OpenImage>(frame, block_rows, atom),
        PeriodicMode::PerAtom => run::<PerAtomImage>(frame, block_rows, atom),
        PeriodicMode::PerInteraction => run::<PerInteractionImage>(frame, block_rows, atom),
        PeriodicMode::Triclinic => run::<TriclinicImage>(frame, block_rows, atom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    fn rows_around(center: Vector3<f32>, spread: f32) -> [F32x4; LANES] {
        std::array::from_fn(|i| {
            let t = i as f32 / 7.0 - 0.5;
            F32x4::new(
                center.x + spread * t,
                center.y - spread * t,
                center.z + 0.5 * spread * t,
                1.0,
            )
        })
    }

    #[test]
    fn test_box_validation() {
        assert!(PeriodicBox::cubic(2.0).is_ok());
        assert!(PeriodicBox::rectangular(2.0, 0.0, 1.0).is_err());
        assert!(PeriodicBox::rectangular(2.0, f32::NAN, 1.0).is_err());

        let skewed = PeriodicBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
            Vector3::new(-1.0, 0.5, 3.0),
        )
        .unwrap();
        assert!(skewed.is_triclinic());
        assert!(!PeriodicBox::cubic(3.0).unwrap().is_triclinic());

        let err = PeriodicBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(2.0, 3.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        )
        .unwrap_err();
        assert!(err.to_string().contains("reduced"));

        let err = PeriodicBox::triclinic(
            Vector3::new(3.0, 0.1, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        )
        .unwrap_err();
        assert!(matches!(err, NonbondedError::InvalidBox { .. }));
    }

    #[test]
    fn test_box_fits_cutoff() {
        let pbox = PeriodicBox::rectangular(2.0, 3.0, 2.5).unwrap();
        assert!(pbox.ensure_fits_cutoff(1.0).is_ok());
        let err = pbox.ensure_fits_cutoff(1.1).unwrap_err();
        assert_eq!(
            err,
            NonbondedError::BoxTooSmall {
                edge: 2.0,
                cutoff: 1.1
            }
        );
    }

    #[test]
    fn test_wrap_into_cell() {
        let pbox = PeriodicBox::cubic(2.0).unwrap();
        let p = pbox.wrap_into_cell(Vector3::new(2.85, -0.5, 4.25));
        assert_relative_eq!(p, Vector3::new(0.85, 1.5, 0.25), epsilon = 1e-6);

        let tri = PeriodicBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
            Vector3::new(-1.0, 0.5, 3.0),
        )
        .unwrap();
        let q = tri.wrap_into_cell(Vector3::new(0.5, 0.5, 3.5));
        // One c vector removed; y and x already inside
        assert_relative_eq!(q, Vector3::new(1.5, 0.0, 0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_wrap_records_moves_only_outside_atoms() {
        let pbox = PeriodicBox::cubic(6.0).unwrap();
        let inside = Vector3::new(3.3, 0.0, 6.0);
        assert!(pbox.contains(&inside));
        assert!(!pbox.contains(&Vector3::new(9.3, 3.3, 3.3)));
        assert!(!pbox.contains(&Vector3::new(3.3, -0.1, 3.3)));

        let posq: [f32; 8] = [3.3, 0.0, 6.0, 0.4, 9.3, 3.3, -2.7, -0.4];
        let wrapped = pbox.wrap_records(&posq);
        assert_eq!(&wrapped[..4], &posq[..4]);
        assert_relative_eq!(wrapped[4], 3.3, epsilon = 1e-5);
        assert_eq!(wrapped[5], 3.3);
        assert_relative_eq!(wrapped[6], 3.3, epsilon = 1e-5);
        assert_eq!(wrapped[7], -0.4);
    }

    #[test]
    fn test_classification_tiers() {
        let pbox = PeriodicBox::cubic(4.0).unwrap();

        let interior = classify_block(&rows_around(Vector3::new(2.0, 2.0, 2.0), 0.5), &pbox, 1.0);
        assert_eq!(interior.mode, PeriodicMode::NoPeriodic);
        assert_relative_eq!(interior.center, Vector3::new(2.0, 2.0, 2.0), epsilon = 1e-6);

        let near_face = classify_block(&rows_around(Vector3::new(0.6, 2.0, 2.0), 0.5), &pbox, 1.0);
        assert_eq!(near_face.mode, PeriodicMode::PerAtom);

        // Block spans most of the box: margins are too thin for per-atom wrapping
        let wide = classify_block(&rows_around(Vector3::new(2.0, 2.0, 2.0), 3.0), &pbox, 1.0);
        assert_eq!(wide.mode, PeriodicMode::PerInteraction);

        let tri = PeriodicBox::triclinic(
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(1.0, 4.0, 0.0),
            Vector3::new(0.0, 0.0, 4.0),
        )
        .unwrap();
        let skewed = classify_block(&rows_around(Vector3::new(0.6, 2.0, 2.0), 0.5), &tri, 1.0);
        assert_eq!(skewed.mode, PeriodicMode::Triclinic);
        let inside = classify_block(&rows_around(Vector3::new(2.0, 2.0, 2.0), 0.5), &tri, 1.0);
        assert_eq!(inside.mode, PeriodicMode::NoPeriodic);
    }

    #[test]
    fn test_per_interaction_minimum_image() {
        let pbox = PeriodicBox::cubic(2.0).unwrap();
        let rows = [F32x4::new(0.5, 0.5, 0.5, 1.0); LANES];
        let frame = pbox.frame(Vector3::new(0.5, 0.5, 0.5));
        let atom = F32x4::new(2.85, 0.5, 0.5, -1.0);
        let (d, r2) = pair_displacements(PeriodicMode::PerInteraction, &frame, &rows, atom);
        assert_relative_eq!(d.xs.lane(0), -0.35, epsilon = 1e-6);
        assert_relative_eq!(r2.lane(3), 0.1225, epsilon = 1e-6);
    }

    #[test]
    fn test_per_atom_wrap_keeps_charge() {
        let pbox = PeriodicBox::cubic(2.0).unwrap();
        let frame = pbox.frame(Vector3::new(0.5, 0.5, 0.5));
        let wrapped = PerAtomImage::wrap_atom(&frame, F32x4::new(2.85, -1.2, 0.5, -0.75));
        assert_relative_eq!(wrapped.lane(0), 0.85, epsilon = 1e-6);
        assert_relative_eq!(wrapped.lane(1), 0.8, epsilon = 1e-6);
        assert_eq!(wrapped.lane(2), 0.5);
        assert_eq!(wrapped.lane(3), -0.75);
    }

    #[test]
    fn test_triclinic_matches_scalar_minimum_image() {
        let tri = PeriodicBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
            Vector3::new(-1.0, 0.5, 3.0),
        )
        .unwrap();
        let rows = rows_around(Vector3::new(0.2, 2.8, 0.1), 0.4);
        let atom = F32x4::new(2.9, 0.3, 2.9, 0.0);
        let frame = tri.frame(Vector3::zeros());
        let (d, r2) = pair_displacements(PeriodicMode::Triclinic, &frame, &rows, atom);
        for i in 0..LANES {
            let expected = tri.minimum_image(rows[i].xyz() - atom.xyz());
            assert_relative_eq!(d.get(i), expected, epsilon = 1e-5);
            assert_relative_eq!(r2.lane(i), expected.norm_squared(), epsilon = 1e-5);
        }
    }

    proptest! {
        #[test]
        fn test_valid_modes_agree(
            center in prop::array::uniform3(0.0..4.0f32),
            offsets in prop::collection::vec(prop::array::uniform3(-0.3..0.3f32), 8),
            atom in prop::array::uniform3(0.0..4.0f32),
        ) {
            let cutoff = 1.0;
            let pbox = PeriodicBox::cubic(4.0).unwrap();
            let rows: [F32x4; LANES] = std::array::from_fn(|i| {
                let p = pbox.wrap_into_cell(Vector3::from(center) + Vector3::from(offsets[i]));
                F32x4::from_vector(&p, 1.0)
            });
            let atom = F32x4::new(atom[0], atom[1], atom[2], 0.0);
            let image = classify_block(&rows, &pbox, cutoff);
            let frame = pbox.frame(image.center);

            let (reference, r2_ref) =
                pair_displacements(PeriodicMode::PerInteraction, &frame, &rows, atom);

            let mut valid = vec![PeriodicMode::Triclinic];
            if image.mode != PeriodicMode::PerInteraction {
                valid.push(PeriodicMode::PerAtom);
            }
            if image.mode == PeriodicMode::NoPeriodic {
                valid.push(PeriodicMode::NoPeriodic);
            }

            for mode in valid {
                let (d, r2) = pair_displacements(mode, &frame, &rows, atom);
                for i in 0..LANES {
                    if r2_ref.lane(i) < cutoff * cutoff {
                        prop_assert!((d.get(i) - reference.get(i)).norm() < 1e-5, "{mode:?}");
                        prop_assert!((r2.lane(i) - r2_ref.lane(i)).abs() < 1e-5);
                    }
                }
            }
        }
    }
}
