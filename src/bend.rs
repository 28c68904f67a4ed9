//! Cylindrical bend modifier.
//!
//! The single defining equation of the page-turn illusion: a flat strip of
//! length `L` bent through angle `θ` becomes an arc of radius `r = L/θ`.
//! Inside the `[from, to]` region points wrap onto the arc; outside it they
//! are carried by rigid continuations of the boundary tangent, so geometry
//! beyond the bent region never re-enters the curve.
//!
//! # Precision
//! At large radii (`|r| > 10`) the arc angle `yr` is a near-linear function
//! of `y` over a huge domain and single-precision `cos`/`sin` accumulate
//! visible faceting. The per-point map switches to double-precision
//! accumulation there and narrows back to `f32` storage. This is a
//! correctness requirement of the transform, not a tuning knob.

use crate::types::BendAxis;
use glam::{Mat4, Quat, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Vertices per parallel work unit in [`BendModifier::apply_to_buffer`].
pub const BATCH_SIZE: usize = 64;

/// Radius threshold above which the trig terms accumulate in `f64`.
const DOUBLE_PRECISION_RADIUS: f32 = 10.0;

/// Angles smaller than this (radians) collapse to the flat/identity branch.
const MIN_BEND_ANGLE: f32 = 1e-4;

/// A nonlinear cylindrical-space transform.
///
/// Parameters are public and freely mutable; call [`BendModifier::recompute`]
/// after changing any of them and before mapping points. The derived state
/// (`r`, `oor`, placement and continuation matrices) is rebuilt there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BendModifier {
    /// Total bend sweep in degrees, signed
    pub angle: f32,
    /// Additional Y-axis pre-rotation in degrees, applied before bending.
    /// Used to fan flex direction per page.
    pub dir: f32,
    /// Local bend axis
    pub axis: BendAxis,
    /// Offset of the bend pivot within the gizmo space
    pub center: Vec3,
    /// When set, curvature is confined to the `[from, to]` region and the
    /// outside is carried rigidly. When clear the curve applies everywhere;
    /// `from`/`to` still size the radius.
    pub limit: bool,
    /// Lower region bound along the bend axis
    pub from: f32,
    /// Upper region bound along the bend axis
    pub to: f32,
    /// Gizmo placement within page space
    pub gizmo_position: Vec3,
    /// Gizmo orientation within page space
    pub gizmo_rotation: Quat,
    /// Gizmo scale within page space
    pub gizmo_scale: Vec3,

    // Derived state, rebuilt by recompute()
    #[serde(skip)]
    r: f32,
    #[serde(skip)]
    oor: f32,
    #[serde(skip)]
    tm: Mat4,
    #[serde(skip)]
    itm: Mat4,
    #[serde(skip)]
    tm_above: Mat4,
    #[serde(skip)]
    tm_below: Mat4,
}

impl Default for BendModifier {
    fn default() -> Self {
        BendModifier {
            angle: 0.0,
            dir: 0.0,
            axis: BendAxis::Y,
            center: Vec3::ZERO,
            limit: true,
            from: 0.0,
            to: 0.0,
            gizmo_position: Vec3::ZERO,
            gizmo_rotation: Quat::IDENTITY,
            gizmo_scale: Vec3::ONE,
            r: 0.0,
            oor: 0.0,
            tm: Mat4::IDENTITY,
            itm: Mat4::IDENTITY,
            tm_above: Mat4::IDENTITY,
            tm_below: Mat4::IDENTITY,
        }
    }
}

impl BendModifier {
    /// Create a modifier with default placement and no bend
    pub fn new() -> Self {
        Self::default()
    }

    /// Bend radius `region length / angle`, 0 in the flat case
    #[inline]
    pub fn radius(&self) -> f32 {
        self.r
    }

    /// Reciprocal radius, 0 in the flat case
    #[inline]
    pub fn one_over_radius(&self) -> f32 {
        self.oor
    }

    /// Rebuild all derived state from the current parameters.
    ///
    /// Clamps `from ≤ to`, derives `r`/`oor`, rebuilds the placement
    /// matrices, and calibrates the rigid continuations `tm_above`/`tm_below`
    /// so the boundary tangent lines continue the arc without a kink.
    pub fn recompute(&mut self) {
        // Invariant: from ≤ to, enforced by clamping on every recompute
        if self.from > self.to {
            self.from = self.to;
        }

        self.update_placement();

        let len = self.to - self.from;
        let angle_rad = self.angle.to_radians();
        if angle_rad.abs() < MIN_BEND_ANGLE || len <= 0.0 {
            // Flat case: a first-class branch, not a degenerate curve
            self.r = 0.0;
            self.oor = 0.0;
            self.tm_above = Mat4::IDENTITY;
            self.tm_below = Mat4::IDENTITY;
            return;
        }

        self.r = len / angle_rad;
        self.oor = 1.0 / self.r;

        // Calibration order is load-bearing: each continuation evaluates the
        // raw curve against the region state as it stands mid-recompute, and
        // above is built before below. The seam matching depends on it.
        self.tm_above = self.continuation(self.to);
        self.tm_below = self.continuation(self.from);
    }

    /// Rigid continuation of the arc tangent at a region boundary.
    ///
    /// Rotates by the proportional tangent angle at the boundary, pivoted at
    /// the boundary point, then translates by the delta between where the
    /// full curve maps the pivot and where the rigid body leaves it.
    fn continuation(&self, boundary: f32) -> Mat4 {
        let theta = -boundary * self.oor;
        let pivot = Vec3::new(0.0, boundary, 0.0);
        let rigid = Mat4::from_translation(pivot)
            * Mat4::from_rotation_z(theta)
            * Mat4::from_translation(-pivot);
        let delta = self.curve_point(pivot) - pivot;
        Mat4::from_translation(delta) * rigid
    }

    /// Placement: page space → bend space.
    ///
    /// Gizmo TRS plus pivot offset, inverted, then the chosen bend axis is
    /// swung onto local Y and the `dir` fan rotation applied.
    fn update_placement(&mut self) {
        let place = Mat4::from_scale_rotation_translation(
            self.gizmo_scale,
            self.gizmo_rotation,
            self.gizmo_position,
        ) * Mat4::from_translation(self.center);

        let mut tm = place.inverse();
        tm = match self.axis {
            BendAxis::X => Mat4::from_rotation_z(FRAC_PI_2) * tm,
            BendAxis::Y => tm,
            BendAxis::Z => Mat4::from_rotation_x(-FRAC_PI_2) * tm,
        };
        if self.dir != 0.0 {
            tm = Mat4::from_rotation_y(self.dir.to_radians()) * tm;
        }
        self.tm = tm;
        self.itm = tm.inverse();
    }

    /// The raw cylindrical map in bend space.
    ///
    /// `yr = π − y/r`, `x' = (r−x)·cos(yr) + r`, `y' = (r−x)·sin(yr)`.
    /// One algorithm, precision selected by the radius branch.
    #[inline]
    fn curve_point(&self, p: Vec3) -> Vec3 {
        if self.r == 0.0 {
            return p;
        }
        if self.r.abs() > DOUBLE_PRECISION_RADIUS {
            let x = p.x as f64;
            let y = p.y as f64;
            let r = self.r as f64;
            let yr = std::f64::consts::PI - y / r;
            let (s, c) = yr.sin_cos();
            Vec3::new(((r - x) * c + r) as f32, ((r - x) * s) as f32, p.z)
        } else {
            let yr = std::f32::consts::PI - p.y * self.oor;
            let (s, c) = yr.sin_cos();
            Vec3::new((self.r - p.x) * c + self.r, (self.r - p.x) * s, p.z)
        }
    }

    /// Map a single point through the bend.
    ///
    /// Reference evaluator: placement in, region routing, curve or rigid
    /// continuation, placement out. [`BendModifier::apply_to_buffer`] applies
    /// exactly this rule per element.
    #[inline]
    pub fn map_point(&self, p: Vec3) -> Vec3 {
        let q = self.tm.transform_point3(p);
        let q = if self.limit && self.r != 0.0 && q.y <= self.from {
            self.tm_below.transform_point3(q)
        } else if self.limit && self.r != 0.0 && q.y >= self.to {
            self.tm_above.transform_point3(q)
        } else {
            self.curve_point(q)
        };
        self.itm.transform_point3(q)
    }

    /// Apply the bend to every vertex of a buffer, in parallel.
    ///
    /// Element-wise with no inter-element dependency; dispatched as
    /// [`BATCH_SIZE`] work units and joined before returning, so the caller
    /// always observes a completed buffer. Output is bit-identical to the
    /// sequential variant regardless of worker count.
    pub fn apply_to_buffer(&self, input: &[Vec3], output: &mut [Vec3]) {
        debug_assert_eq!(input.len(), output.len());
        output
            .par_chunks_mut(BATCH_SIZE)
            .zip(input.par_chunks(BATCH_SIZE))
            .for_each(|(out, inp)| {
                for (o, &p) in out.iter_mut().zip(inp.iter()) {
                    *o = self.map_point(p);
                }
            });
    }

    /// Apply the bend to a buffer in place, in parallel.
    pub fn apply_in_place(&self, buffer: &mut [Vec3]) {
        buffer.par_chunks_mut(BATCH_SIZE).for_each(|chunk| {
            for p in chunk.iter_mut() {
                *p = self.map_point(*p);
            }
        });
    }

    /// Single-threaded [`BendModifier::apply_to_buffer`]
    pub fn apply_to_buffer_sequential(&self, input: &[Vec3], output: &mut [Vec3]) {
        debug_assert_eq!(input.len(), output.len());
        for (o, &p) in output.iter_mut().zip(input.iter()) {
            *o = self.map_point(p);
        }
    }
}
