//! Page state and the three-stage deformation pass.
//!
//! A page owns an immutable base vertex buffer and a working buffer the
//! modifier stack writes into, plus an optional hole-variant buffer pair
//! used while the page sweeps past its neighbors. Three bend modifiers are
//! always applied in the same fixed order: `flexer` (local curl), `lander`
//! (settling), `turner` (the main page-turn sweep). The order matters: the
//! turner's rigid continuations are calibrated against geometry the earlier
//! stages have already shaped.

use crate::bend::BendModifier;
use crate::curve::Curve;
use crate::types::{PageMesh, Triangle};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// The per-page keyframe curve set evaluated by the schedule controller.
///
/// All curves map the local phase (0–14, one full local page turn) to an
/// angle in degrees or a region boundary in page units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCurves {
    /// Turner sweep angle over the local phase
    pub turner_angle: Curve,
    /// Flexer curl angle over the local phase
    pub flexer_angle: Curve,
    /// Lander settling angle over the local phase
    pub lander_angle: Curve,
    /// Turner region lower bound, normal spread
    pub turner_from: Curve,
    /// Turner region lower bound, reading spread
    pub turner_from_spread: Curve,
}

impl PageCurves {
    /// Stock curve set for a page of the given extent along the bend axis.
    ///
    /// Angles are in degrees; the from-curves are scaled to page units.
    pub fn stock(extent: f32) -> Self {
        let mut turner_angle = Curve::from_pairs(&[(0.0, 0.0), (1.0, 0.0), (6.0, 180.0), (14.0, 180.0)]);
        turner_angle.smooth_tangents();

        let mut flexer_angle = Curve::from_pairs(&[
            (0.0, 0.0),
            (1.0, 12.0),
            (4.0, 6.0),
            (8.0, 0.0),
            (14.0, 0.0),
        ]);
        flexer_angle.smooth_tangents();

        let mut lander_angle = Curve::from_pairs(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (6.0, -8.0),
            (9.0, 0.0),
            (14.0, 0.0),
        ]);
        lander_angle.smooth_tangents();

        let mut turner_from = Curve::from_pairs(&[
            (0.0, 0.0),
            (2.0, 0.15 * extent),
            (6.0, 0.4 * extent),
            (14.0, 0.4 * extent),
        ]);
        turner_from.smooth_tangents();

        let mut turner_from_spread = Curve::from_pairs(&[
            (0.0, 0.1 * extent),
            (4.0, 0.3 * extent),
            (10.0, 0.55 * extent),
            (14.0, 0.55 * extent),
        ]);
        turner_from_spread.smooth_tangents();

        PageCurves {
            turner_angle,
            flexer_angle,
            lander_angle,
            turner_from,
            turner_from_spread,
        }
    }
}

/// One rectangular sheet of the book.
#[derive(Debug, Clone)]
pub struct Page {
    mesh: PageMesh,
    hole_mesh: Option<PageMesh>,
    deformed: Vec<Vec3>,
    hole_deformed: Vec<Vec3>,

    /// Local curl, applied first
    pub flexer: BendModifier,
    /// Settling, applied second
    pub lander: BendModifier,
    /// The main turn sweep, applied last
    pub turner: BendModifier,
    /// Keyframe curves driving the three modifiers
    pub curves: PageCurves,
    /// Disqualifies this page from the hole-topology path regardless of
    /// phase (covers, or pages next to reduced geometry)
    pub no_hole: bool,

    dirty: bool,
    use_hole: bool,
}

impl Page {
    /// Create a page from base geometry.
    ///
    /// All three modifiers start with their bend region spanning the page
    /// extent along Y and no sweep. The page starts dirty so the first
    /// deform pass fills the working buffer.
    pub fn new(mesh: PageMesh) -> Self {
        let deformed = mesh.vertices.clone();
        let mut page = Page {
            deformed,
            hole_mesh: None,
            hole_deformed: Vec::new(),
            flexer: BendModifier::new(),
            lander: BendModifier::new(),
            turner: BendModifier::new(),
            curves: PageCurves::stock(mesh.bounds.size().y),
            no_hole: false,
            dirty: true,
            use_hole: false,
            mesh,
        };
        let (lo, hi) = (page.mesh.bounds.min.y, page.mesh.bounds.max.y);
        for m in [&mut page.flexer, &mut page.lander, &mut page.turner] {
            m.from = lo;
            m.to = hi;
        }
        page
    }

    /// Attach the optional hole-variant topology
    pub fn with_hole_variant(mut self, mesh: PageMesh) -> Self {
        self.hole_deformed = mesh.vertices.clone();
        self.hole_mesh = Some(mesh);
        self
    }

    /// Whether a hole-variant topology exists
    pub fn has_hole(&self) -> bool {
        self.hole_mesh.is_some()
    }

    /// Whether the hole-variant buffer pair is currently active
    pub fn uses_hole(&self) -> bool {
        self.use_hole
    }

    /// Select the hole-variant (or normal) buffer pair.
    ///
    /// Ignored when no hole mesh exists. A topology swap re-enters Dirty so
    /// the newly active working buffer gets re-deformed.
    pub fn set_use_hole(&mut self, use_hole: bool) {
        let use_hole = use_hole && self.hole_mesh.is_some();
        if use_hole != self.use_hole {
            self.use_hole = use_hole;
            self.dirty = true;
        }
    }

    /// The normal-topology base mesh (attachment bindings are captured here)
    pub fn base_mesh(&self) -> &PageMesh {
        &self.mesh
    }

    /// The currently active base mesh
    pub fn active_mesh(&self) -> &PageMesh {
        if self.use_hole {
            self.hole_mesh.as_ref().unwrap_or(&self.mesh)
        } else {
            &self.mesh
        }
    }

    /// Triangles of the currently active topology
    pub fn triangles(&self) -> &[Triangle] {
        &self.active_mesh().triangles
    }

    /// Read-only snapshot of the active deformed buffer.
    ///
    /// Valid after a deform pass; the deform-then-read sequence is
    /// synchronous, so no partially written buffer is ever observed here.
    pub fn deformed_vertices(&self) -> &[Vec3] {
        if self.use_hole && self.hole_mesh.is_some() {
            &self.hole_deformed
        } else {
            &self.deformed
        }
    }

    /// Whether any modifier parameter changed since the last deform pass
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a re-deform on the next pass (e.g. after an external topology
    /// change)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Run the three-stage deformation pass if the page is dirty.
    ///
    /// Recomputes flexer, lander, turner state in that fixed order, then
    /// chains them output→input: the flexer reads the immutable base buffer,
    /// the lander and turner transform the working buffer in place. Pure
    /// function of modifier state and base buffer; repeating with unchanged
    /// parameters is bit-identical. Clears the dirty flag.
    pub fn deform(&mut self) {
        if !self.dirty {
            return;
        }

        self.flexer.recompute();
        self.lander.recompute();
        self.turner.recompute();

        let (base, work) = if self.use_hole {
            match &self.hole_mesh {
                Some(hole) => (&hole.vertices, &mut self.hole_deformed),
                None => (&self.mesh.vertices, &mut self.deformed),
            }
        } else {
            (&self.mesh.vertices, &mut self.deformed)
        };

        self.flexer.apply_to_buffer(base, work);
        self.lander.apply_in_place(work);
        self.turner.apply_in_place(work);

        self.dirty = false;
    }

    /// Map a normalized page-surface coordinate through all three modifiers.
    ///
    /// Uses the single-point evaluators against the current modifier state
    /// (recomputed by the last deform pass), so props can be placed without
    /// waiting for a buffer deform.
    pub fn map_local_point(&self, u: f32, v: f32) -> Vec3 {
        let size = self.mesh.bounds.size();
        let p = self.mesh.bounds.min + Vec3::new(u * size.x, v * size.y, 0.0);
        let p = self.flexer.map_point(p);
        let p = self.lander.map_point(p);
        self.turner.map_point(p)
    }
}
