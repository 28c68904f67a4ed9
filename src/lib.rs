//! # pagecurl
//!
//! Procedural page-turn deformation engine.
//!
//! Deforms flat rectangular page meshes into realistic curved page shapes as
//! a function of a continuous turn parameter, and keeps attached objects
//! glued to the deforming surface.
//!
//! ## Pipeline
//!
//! - **[`bend`]**: the nonlinear cylindrical transform: a flat strip of
//!   length `L` bent through angle `θ` becomes an arc of radius `L/θ`, with
//!   rigid tangent continuations outside the bend region.
//! - **[`page`]**: three stacked bend modifiers per page (flex, land, turn)
//!   applied in fixed order to the base vertex buffer.
//! - **[`schedule`]**: keyframe curves staggered across pages by a shuffle
//!   constant, so one global flip value cascades through the book.
//! - **[`attach`]**: barycentric surface bindings re-projected onto the
//!   deformed buffer every frame.
//!
//! ## Example
//!
//! ```rust
//! use pagecurl::prelude::*;
//!
//! let mut book = Book::new();
//! for _ in 0..4 {
//!     book.add_page(PageMesh::flat_grid(1.0, 1.4, 16, 16));
//! }
//! book.shuffle = 4.0;
//!
//! // advance the global turn position and deform
//! book.flip = 0.35;
//! book.update();
//!
//! let vertices = book.pages[0].deformed_vertices();
//! assert!(!vertices.is_empty());
//! ```

#![warn(missing_docs)]

pub mod attach;
pub mod bend;
pub mod curve;
pub mod page;
pub mod schedule;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::attach::{
        AttachError, Attachment, Placement, SurfaceBinding, VisibilityEvent,
    };
    pub use crate::bend::{BendModifier, BATCH_SIZE};
    pub use crate::curve::{Curve, Interpolation, Keyframe};
    pub use crate::page::{Page, PageCurves};
    pub use crate::schedule::{Book, PageScheduleController, PARAM_TOLERANCE, PHASE_UNITS};
    pub use crate::types::{Aabb, BendAxis, PageMesh, Triangle};
    pub use glam::{Quat, Vec3};
}

// Re-exports for convenience
pub use attach::Attachment;
pub use bend::BendModifier;
pub use page::Page;
pub use schedule::Book;
