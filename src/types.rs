//! Core geometry types shared across the deformation pipeline.
//!
//! The page-turn engine consumes pre-tessellated geometry from an external
//! mesh builder: a vertex buffer, a triangle index buffer, and a bounding
//! box. Nothing here generates topology.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Create from center and half-extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if point is inside
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Triangle face indices into a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    /// First vertex index
    pub a: u32,
    /// Second vertex index
    pub b: u32,
    /// Third vertex index
    pub c: u32,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Triangle { a, b, c }
    }

    /// Indices as an array, in winding order
    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        [self.a, self.b, self.c]
    }
}

/// Local bend axis of a modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BendAxis {
    /// Bend along local X
    X,
    /// Bend along local Y
    #[default]
    Y,
    /// Bend along local Z
    Z,
}

/// Page geometry as delivered by the external mesh builder.
///
/// The vertex buffer is treated as immutable base data; deformation writes
/// into separate working buffers owned by [`crate::page::Page`].
#[derive(Debug, Clone)]
pub struct PageMesh {
    /// Base vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle index buffer
    pub triangles: Vec<Triangle>,
    /// Bounding box of the base vertices
    pub bounds: Aabb,
}

impl PageMesh {
    /// Create a mesh from raw buffers
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<Triangle>, bounds: Aabb) -> Self {
        PageMesh {
            vertices,
            triangles,
            bounds,
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Uniform rectangular grid in the XY plane, `cols × rows` quads.
    ///
    /// Fixture builder for tests and benchmarks; real page meshes come from
    /// the external tessellation layer.
    pub fn flat_grid(width: f32, height: f32, cols: u32, rows: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let mut vertices = Vec::with_capacity(((cols + 1) * (rows + 1)) as usize);
        for iy in 0..=rows {
            let y = height * iy as f32 / rows as f32;
            for ix in 0..=cols {
                let x = width * ix as f32 / cols as f32;
                vertices.push(Vec3::new(x, y, 0.0));
            }
        }

        let stride = cols + 1;
        let mut triangles = Vec::with_capacity((cols * rows * 2) as usize);
        for iy in 0..rows {
            for ix in 0..cols {
                let i0 = iy * stride + ix;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                triangles.push(Triangle::new(i0, i1, i3));
                triangles.push(Triangle::new(i0, i3, i2));
            }
        }

        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(width, height, 0.0));
        PageMesh {
            vertices,
            triangles,
            bounds,
        }
    }
}
