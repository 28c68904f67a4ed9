//! Book aggregate and the keyframe-driven page schedule.
//!
//! Every page reads the same global turn signal, phase-shifted by the
//! `shuffle` stagger so pages turn in a cascading sequence rather than all
//! at once. The controller evaluates each page's curves at its local phase,
//! writes the results into the three bend modifiers, and marks the page
//! dirty only when a value actually moved. The deform fan-out then runs
//! after all schedule writes are done, so the parallel pass reads only
//! immutable shared state.

use crate::curve::Curve;
use crate::page::Page;
use crate::types::PageMesh;
use rayon::prelude::*;

/// Local phase units spanning one full single-page turn
pub const PHASE_UNITS: f32 = 14.0;

/// Change-detection tolerance for scheduled parameter writes
pub const PARAM_TOLERANCE: f32 = 1e-5;

/// Local phase window within which a page keeps its full topology; outside
/// it the page has fully swept past its neighbors and may switch to the
/// hole variant.
const HOLE_PHASE_RANGE: (f32, f32) = (-14.0, 28.0);

/// Write a scheduled value, reporting whether it moved past tolerance.
#[inline]
fn write_param(slot: &mut f32, value: f32) -> bool {
    if (*slot - value).abs() > PARAM_TOLERANCE {
        *slot = value;
        true
    } else {
        false
    }
}

/// Lerp with the blend weight clamped to `[0, 1]`
#[inline]
fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Evaluates per-page curves and writes modifier parameters.
///
/// Stateless; all state lives on the pages and the book. Runs
/// single-threaded before the deform fan-out begins.
pub struct PageScheduleController;

impl PageScheduleController {
    /// Schedule one page at its local phase.
    ///
    /// * `local_flip`: per-page phase, `global_flip·14 − index·shuffle`.
    /// * `global_alpha`: normalized position through the whole book,
    ///   modulating the turner sweep via the book's max-angle curve.
    /// * `spine_angle`: the book's current overall curvature, added to the
    ///   turner sweep.
    /// * `allow_hole`: false for cover pages and pages disqualified by a
    ///   reduced-geometry neighbor.
    pub fn update_page(
        page: &mut Page,
        local_flip: f32,
        global_alpha: f32,
        spine_angle: f32,
        max_angle: &Curve,
        allow_hole: bool,
    ) {
        let lander_angle = page.curves.lander_angle.evaluate(local_flip);
        let flexer_angle = page.curves.flexer_angle.evaluate(local_flip);
        let turner_angle = page.curves.turner_angle.evaluate(local_flip)
            * max_angle.evaluate(global_alpha)
            + spine_angle;

        // The spread blend is weighted by the local phase itself, not the
        // book position: the region boundary morphs continuously as this
        // page turns.
        let turner_from = lerp_clamped(
            page.curves.turner_from.evaluate(local_flip),
            page.curves.turner_from_spread.evaluate(local_flip),
            local_flip,
        );

        let mut changed = false;
        changed |= write_param(&mut page.lander.angle, lander_angle);
        changed |= write_param(&mut page.flexer.angle, flexer_angle);
        changed |= write_param(&mut page.turner.angle, turner_angle);
        changed |= write_param(&mut page.turner.from, turner_from);
        if changed {
            page.mark_dirty();
        }

        let wants_hole = (local_flip < HOLE_PHASE_RANGE.0 || local_flip >= HOLE_PHASE_RANGE.1)
            && page.has_hole()
            && allow_hole
            && !page.no_hole;
        page.set_use_hole(wants_hole);
    }
}

/// Ordered sequence of pages driven by one continuous flip value.
#[derive(Debug)]
pub struct Book {
    /// Pages in reading order
    pub pages: Vec<Page>,
    /// Current global turn position; one unit per page turn, not
    /// necessarily integral
    pub flip: f32,
    /// Phase stagger between adjacent pages
    pub shuffle: f32,
    /// Current overall spine curvature in degrees, offsetting every
    /// turner sweep
    pub spine_angle: f32,
    /// Global sweep modulation over the normalized book position
    pub max_angle: Curve,
    /// Deform pages concurrently instead of the default sequential loop.
    /// Observable results are identical either way.
    pub parallel_pages: bool,
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Book {
    /// Create an empty book
    pub fn new() -> Self {
        Book {
            pages: Vec::new(),
            flip: 0.0,
            shuffle: 1.0,
            spine_angle: 0.0,
            max_angle: Curve::constant(1.0),
            parallel_pages: false,
        }
    }

    /// Append a page built from base geometry, returning it for setup
    pub fn add_page(&mut self, mesh: PageMesh) -> &mut Page {
        self.pages.push(Page::new(mesh));
        self.pages.last_mut().expect("page was just pushed")
    }

    /// Local phase of a page at the current flip position
    pub fn local_phase(&self, index: usize) -> f32 {
        self.flip * PHASE_UNITS - index as f32 * self.shuffle
    }

    /// Normalized position through the whole book, 0 at the front cover
    pub fn global_alpha(&self) -> f32 {
        if self.pages.is_empty() {
            0.0
        } else {
            (self.flip / self.pages.len() as f32).clamp(0.0, 1.0)
        }
    }

    /// Fan flexer direction across pages with a deterministic spread so
    /// simultaneously turning pages do not curl identically.
    pub fn fan_flex(&mut self, spread: f32) {
        for (i, page) in self.pages.iter_mut().enumerate() {
            // low-discrepancy stride keeps neighbors apart
            let t = (i as f32 * 0.618_034).fract() * 2.0 - 1.0;
            page.flexer.dir = spread * t;
            page.mark_dirty();
        }
    }

    /// Run one frame: schedule every page, then deform the dirty ones.
    ///
    /// The schedule pass is single-threaded; the deform pass is a sequential
    /// loop by default and a rayon fan-out when `parallel_pages` is set.
    /// Pages are independent, so both produce identical buffers.
    pub fn update(&mut self) {
        let alpha = self.global_alpha();
        let spine = self.spine_angle;
        let count = self.pages.len();

        for i in 0..count {
            let local = self.flip * PHASE_UNITS - i as f32 * self.shuffle;
            // cover pages always render their full topology
            let allow_hole = i != 0 && i != count - 1;
            PageScheduleController::update_page(
                &mut self.pages[i],
                local,
                alpha,
                spine,
                &self.max_angle,
                allow_hole,
            );
        }

        if self.parallel_pages {
            self.pages.par_iter_mut().for_each(|page| page.deform());
        } else {
            for page in &mut self.pages {
                page.deform();
            }
        }
    }
}
