//! Barycentric surface attachment.
//!
//! Dependent objects (bookmarks, props, decorations) are glued to the page
//! surface by a triangle index triple plus barycentric coordinates, captured
//! once against the base mesh and re-interpolated against the deformed
//! buffer every frame. A second binding a small step ahead of the object
//! gives a tangent reference for orientation.
//!
//! Visibility is orthogonal to placement: a mask window over the normalized
//! flip range shows or hides the object, and a narrower band inside that
//! window drives appear/vanish blending. Events are delivered through
//! explicitly registered callbacks with typed payloads, not a broadcast
//! messaging.

use crate::curve::Curve;
use crate::page::Page;
use crate::types::PageMesh;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attachment failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The page mesh has no triangles to bind against
    #[error("page mesh has no triangles to attach to")]
    EmptyMesh,
}

/// A captured surface binding: one triangle and the barycentric weights of
/// the bound point within it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBinding {
    /// Vertex indices of the bound triangle
    pub indices: [u32; 3],
    /// Barycentric weights, summing to 1
    pub bary: Vec3,
}

impl SurfaceBinding {
    /// Interpolate against a vertex buffer.
    ///
    /// Returns `None` when any index is out of range for the buffer; the
    /// binding was captured against a topology that has since swapped.
    #[inline]
    fn interpolate(&self, vertices: &[Vec3]) -> Option<Vec3> {
        let [i0, i1, i2] = self.indices.map(|i| i as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            return None;
        }
        Some(vertices[i0] * self.bary.x + vertices[i1] * self.bary.y + vertices[i2] * self.bary.z)
    }

    /// Surface normal of the bound triangle in a vertex buffer
    #[inline]
    fn normal(&self, vertices: &[Vec3]) -> Option<Vec3> {
        let [i0, i1, i2] = self.indices.map(|i| i as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            return None;
        }
        let e1 = vertices[i1] - vertices[i0];
        let e2 = vertices[i2] - vertices[i0];
        Some(e1.cross(e2).normalize_or_zero())
    }
}

/// World placement of an attached object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// World position on (or offset from) the surface
    pub position: Vec3,
    /// World orientation
    pub rotation: Quat,
}

impl Default for Placement {
    fn default() -> Self {
        Placement {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Typed visibility payload delivered to registered callbacks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityEvent {
    /// Whether the mask window currently shows the object
    pub visible: bool,
    /// Appear/vanish blend fraction (0 hidden, 1 fully settled)
    pub alpha: f32,
}

/// Callback signature for visibility changes
pub type VisibilityCallback = Box<dyn FnMut(VisibilityEvent) + Send>;

/// An object glued to the page surface.
pub struct Attachment {
    /// Requested position as a percentage of the page bounding box (0–100
    /// per axis)
    pub position: Vec3,
    /// Small percent-space offset establishing the forward direction on the
    /// surface; zero means no tangent reference
    pub attach_forward: Vec3,
    /// Fixed local rotation offset composed onto the surface orientation
    pub rotation: Quat,
    /// Offset along the surface normal, evaluated over the flip fraction
    pub surface_offset: Curve,
    /// Mask window over the normalized flip range: shown while inside
    pub visible_range: (f32, f32),
    /// Width of the appear/vanish band inside the mask window
    pub fade_band: f32,
    /// Blend shape over the fade band (0–1 → 0–1 by default)
    pub fade: Curve,

    binding: Option<(SurfaceBinding, SurfaceBinding)>,
    placement: Placement,
    last_visible: Option<bool>,
    callbacks: Vec<VisibilityCallback>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("position", &self.position)
            .field("attach_forward", &self.attach_forward)
            .field("binding", &self.binding)
            .field("placement", &self.placement)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl Default for Attachment {
    fn default() -> Self {
        Attachment {
            position: Vec3::splat(50.0),
            attach_forward: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            surface_offset: Curve::constant(0.0),
            visible_range: (0.0, 1.0),
            fade_band: 0.05,
            fade: Curve::from_pairs(&[(0.0, 0.0), (1.0, 1.0)]),
            binding: None,
            placement: Placement::default(),
            last_visible: None,
            callbacks: Vec::new(),
        }
    }
}

impl Attachment {
    /// Create an attachment at a percent-space position
    pub fn at(position: Vec3) -> Self {
        Attachment {
            position,
            ..Default::default()
        }
    }

    /// Whether [`Attachment::bind`] has captured a surface binding
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Last computed placement (retained across stale frames)
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Register a visibility callback.
    ///
    /// Invoked from [`Attachment::update_visibility`] whenever the mask
    /// window state flips.
    pub fn on_visibility(&mut self, callback: VisibilityCallback) {
        self.callbacks.push(callback);
    }

    /// Capture the surface binding against the page's base mesh.
    ///
    /// Brute-force nearest-point-on-mesh search over all triangles, once at
    /// the object position and once at `position + attach_forward`. The
    /// binding is permanent until re-bound.
    pub fn bind(&mut self, page: &Page) -> Result<(), AttachError> {
        let mesh = page.base_mesh();
        if mesh.triangles.is_empty() {
            return Err(AttachError::EmptyMesh);
        }

        let size = mesh.bounds.size();
        let anchor = mesh.bounds.min + size * (self.position / 100.0);
        let forward = anchor + size * (self.attach_forward / 100.0);

        let bp = closest_binding(mesh, anchor);
        let bf = closest_binding(mesh, forward);
        self.binding = Some((bp, bf));
        Ok(())
    }

    /// Recompute world placement from the current deformed buffer.
    ///
    /// `flip_alpha` is the normalized flip fraction, driving the surface
    /// offset curve. When the stored indices are out of range for the active
    /// buffer (hole-variant swap since capture), the previous placement is
    /// retained for the frame, stale but stable.
    pub fn update(&mut self, page: &Page, flip_alpha: f32) -> Placement {
        let Some((bp, bf)) = self.binding else {
            return self.placement;
        };
        let vertices = page.deformed_vertices();

        let (Some(p), Some(fwd_point), Some(normal)) = (
            bp.interpolate(vertices),
            bf.interpolate(vertices),
            bp.normal(vertices),
        ) else {
            // stale binding: topology swapped underneath us
            return self.placement;
        };

        let fwd = fwd_point - p;
        let rotation = if fwd.length_squared() <= 1e-12 {
            // no forward reference (object pinned on a vertex, or zero
            // attach_forward): fixed fallback orientation
            self.rotation
        } else {
            look_along(fwd, normal) * self.rotation
        };

        let position = p + normal * self.surface_offset.evaluate(flip_alpha);
        self.placement = Placement { position, rotation };
        self.placement
    }

    /// Evaluate the visibility window without side effects.
    pub fn visibility(&self, flip_alpha: f32) -> VisibilityEvent {
        let (low, high) = self.visible_range;
        let visible = flip_alpha >= low && flip_alpha <= high;
        let alpha = if visible {
            let band = self.fade_band.max(1e-6);
            let appear = ((flip_alpha - low) / band).clamp(0.0, 1.0);
            let vanish = ((high - flip_alpha) / band).clamp(0.0, 1.0);
            self.fade.evaluate(appear.min(vanish))
        } else {
            0.0
        };
        VisibilityEvent { visible, alpha }
    }

    /// Evaluate visibility and notify callbacks when the shown/hidden state
    /// flips.
    pub fn update_visibility(&mut self, flip_alpha: f32) -> VisibilityEvent {
        let event = self.visibility(flip_alpha);
        if self.last_visible != Some(event.visible) {
            self.last_visible = Some(event.visible);
            for callback in &mut self.callbacks {
                callback(event);
            }
        }
        event
    }
}

/// Orientation looking along `forward` with `up` as the surface normal.
///
/// Basis columns are (right, up', forward); falls back to an unrotated
/// frame when forward and up are parallel.
fn look_along(forward: Vec3, up: Vec3) -> Quat {
    let f = forward.normalize();
    let right = up.cross(f).normalize_or_zero();
    if right.length_squared() < 1e-10 {
        return Quat::IDENTITY;
    }
    let up = f.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, f))
}

/// Brute-force nearest point on the mesh, returning the closest triangle's
/// binding.
fn closest_binding(mesh: &PageMesh, point: Vec3) -> SurfaceBinding {
    let mut best = SurfaceBinding {
        indices: [0, 0, 0],
        bary: Vec3::new(1.0, 0.0, 0.0),
    };
    let mut best_dist = f32::MAX;

    for tri in &mesh.triangles {
        let [i0, i1, i2] = tri.indices();
        let a = mesh.vertices[i0 as usize];
        let b = mesh.vertices[i1 as usize];
        let c = mesh.vertices[i2 as usize];

        let (closest, bary) = closest_point_on_triangle(point, a, b, c);
        let dist = (closest - point).length_squared();
        if dist < best_dist {
            best_dist = dist;
            best = SurfaceBinding {
                indices: tri.indices(),
                bary,
            };
        }
    }

    best
}

/// Closest point on a triangle with its barycentric coordinates.
///
/// Voronoi-region walk: vertex regions, then edge regions, then the face
/// interior.
fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (Vec3, Vec3) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, Vec3::new(1.0, 0.0, 0.0));
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, Vec3::new(0.0, 1.0, 0.0));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, Vec3::new(1.0 - v, v, 0.0));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, Vec3::new(0.0, 0.0, 1.0));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, Vec3::new(1.0 - w, 0.0, w));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, Vec3::new(0.0, 1.0 - w, w));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, Vec3::new(1.0 - v - w, v, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageMesh;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn flat_page() -> Page {
        Page::new(PageMesh::flat_grid(1.0, 1.0, 8, 8))
    }

    #[test]
    fn test_closest_point_face_interior() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let (point, bary) = closest_point_on_triangle(Vec3::new(0.25, 0.25, 0.5), a, b, c);
        assert!((point - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6);
        assert!((bary.x + bary.y + bary.z - 1.0).abs() < 1e-6);
        // reconstruction matches
        let rebuilt = a * bary.x + b * bary.y + c * bary.z;
        assert!((rebuilt - point).length() < 1e-6);
    }

    #[test]
    fn test_closest_point_vertex_and_edge_regions() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);

        let (point, bary) = closest_point_on_triangle(Vec3::new(-1.0, -1.0, 0.0), a, b, c);
        assert!((point - a).length() < 1e-6);
        assert_eq!(bary, Vec3::new(1.0, 0.0, 0.0));

        let (point, bary) = closest_point_on_triangle(Vec3::new(0.5, -1.0, 0.0), a, b, c);
        assert!((point - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        assert!(bary.z.abs() < 1e-6);
    }

    #[test]
    fn test_bind_center_interpolates_back() {
        let mut page = flat_page();
        page.deform(); // identity pass fills the working buffer
        let mut attachment = Attachment::at(Vec3::new(50.0, 50.0, 0.0));
        attachment.bind(&page).unwrap();
        assert!(attachment.is_bound());

        let placement = attachment.update(&page, 0.0);
        // undeformed page: the bound point is the bbox center
        let expected = page.base_mesh().bounds.center();
        assert!(
            (placement.position - expected).length() < 1e-5,
            "got {:?}",
            placement.position
        );
    }

    #[test]
    fn test_bind_empty_mesh_fails() {
        let page = Page::new(PageMesh::new(
            Vec::new(),
            Vec::new(),
            crate::types::Aabb::new(Vec3::ZERO, Vec3::ONE),
        ));
        let mut attachment = Attachment::default();
        assert_eq!(attachment.bind(&page), Err(AttachError::EmptyMesh));
    }

    #[test]
    fn test_tracks_deformed_surface() {
        let mut page = flat_page();
        let mut attachment = Attachment::at(Vec3::new(50.0, 50.0, 50.0));
        attachment.bind(&page).unwrap();

        page.deform();
        let flat = attachment.update(&page, 0.0).position;

        page.turner.angle = 90.0;
        page.mark_dirty();
        page.deform();
        let bent = attachment.update(&page, 0.0).position;

        assert!(
            (bent - flat).length() > 1e-3,
            "placement must follow the deformation"
        );

        // still on the deformed surface: matches the barycentric
        // interpolation of its triangle
        let (bp, _) = attachment.binding.unwrap();
        let on_surface = bp.interpolate(page.deformed_vertices()).unwrap();
        assert!((bent - on_surface).length() < 1e-5);
    }

    #[test]
    fn test_zero_forward_uses_fallback_rotation() {
        let mut page = flat_page();
        page.deform();
        let local = Quat::from_rotation_z(0.7);
        let mut attachment = Attachment::at(Vec3::new(50.0, 50.0, 0.0));
        attachment.rotation = local;
        attachment.bind(&page).unwrap();

        let placement = attachment.update(&page, 0.0);
        let dot = placement.rotation.dot(local).abs();
        assert!(dot > 1.0 - 1e-5, "fallback must be the local rotation");
    }

    #[test]
    fn test_forward_reference_orients_along_surface() {
        let mut page = flat_page();
        page.deform();
        let mut attachment = Attachment::at(Vec3::new(40.0, 40.0, 0.0));
        attachment.attach_forward = Vec3::new(0.0, 5.0, 0.0);
        attachment.bind(&page).unwrap();

        let placement = attachment.update(&page, 0.0);
        // flat page in XY: forward is +Y
        let fwd = placement.rotation * Vec3::Z;
        assert!(
            (fwd - Vec3::Y).length() < 1e-3,
            "forward should be +Y, got {:?}",
            fwd
        );
    }

    #[test]
    fn test_stale_binding_retains_placement() {
        let hole = PageMesh::flat_grid(1.0, 1.0, 2, 2);
        let mut page =
            Page::new(PageMesh::flat_grid(1.0, 1.0, 8, 8)).with_hole_variant(hole);
        page.deform();

        let mut attachment = Attachment::at(Vec3::new(90.0, 90.0, 0.0));
        attachment.bind(&page).unwrap();
        let before = attachment.update(&page, 0.0);

        // swap to the much smaller hole topology: indices go stale
        page.set_use_hole(true);
        page.turner.angle = 45.0;
        page.deform();
        let after = attachment.update(&page, 0.0);

        assert_eq!(before, after, "stale binding must retain the last placement");
    }

    #[test]
    fn test_surface_offset_curve() {
        let mut page = flat_page();
        page.deform();
        let mut attachment = Attachment::at(Vec3::new(50.0, 50.0, 0.0));
        attachment.surface_offset = Curve::constant(0.25);
        attachment.bind(&page).unwrap();

        let placement = attachment.update(&page, 0.0);
        // flat page normal is ±Z; offset shifts off the plane
        assert!((placement.position.z.abs() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_visibility_window_and_fade() {
        let mut attachment = Attachment::default();
        attachment.visible_range = (0.2, 0.8);
        attachment.fade_band = 0.1;

        assert!(!attachment.visibility(0.1).visible);
        assert!(attachment.visibility(0.5).visible);
        assert!((attachment.visibility(0.5).alpha - 1.0).abs() < 1e-5);
        // halfway into the appear band
        assert!((attachment.visibility(0.25).alpha - 0.5).abs() < 1e-5);
        assert_eq!(attachment.visibility(0.9).alpha, 0.0);
    }

    #[test]
    fn test_visibility_callback_fires_on_transitions() {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();

        let mut attachment = Attachment::default();
        attachment.visible_range = (0.2, 0.8);
        attachment.on_visibility(Box::new(move |_event| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        attachment.update_visibility(0.0); // initial state: hidden
        attachment.update_visibility(0.1); // still hidden, no event
        attachment.update_visibility(0.5); // shown
        attachment.update_visibility(0.6); // still shown, no event
        attachment.update_visibility(0.9); // hidden

        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}
