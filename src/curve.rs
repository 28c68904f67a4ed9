//! Scalar keyframe curves.
//!
//! Every animated quantity in the page pipeline (bend angles, region bounds,
//! attachment fades) is driven by a `phase → value` curve: a sorted list of
//! keyframes with per-key interpolation. Curves clamp outside their key
//! range; page phases never loop, they saturate at either end of a turn.

use serde::{Deserialize, Serialize};

/// Interpolation mode between a keyframe and its successor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Interpolation {
    /// Linear interpolation (lerp)
    #[default]
    Linear,
    /// Hermite interpolation with explicit tangents
    Smooth {
        /// Out tangent of this keyframe
        out_tangent: f32,
        /// In tangent of the next keyframe
        in_tangent: f32,
    },
    /// Hold this value until the next keyframe
    Step,
}

/// A single keyframe with time, value, and interpolation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keyframe {
    /// Phase (curve-local time)
    pub time: f32,
    /// Value at this keyframe
    pub value: f32,
    /// Interpolation to the next keyframe
    pub interpolation: Interpolation,
}

impl Keyframe {
    /// Create a linear keyframe
    pub fn new(time: f32, value: f32) -> Self {
        Keyframe {
            time,
            value,
            interpolation: Interpolation::Linear,
        }
    }

    /// Create a step keyframe
    pub fn step(time: f32, value: f32) -> Self {
        Keyframe {
            time,
            value,
            interpolation: Interpolation::Step,
        }
    }

    /// Create a smooth (Hermite) keyframe with explicit tangents
    pub fn smooth(time: f32, value: f32, out_tangent: f32, in_tangent: f32) -> Self {
        Keyframe {
            time,
            value,
            interpolation: Interpolation::Smooth {
                out_tangent,
                in_tangent,
            },
        }
    }
}

/// A scalar keyframe curve: monotonic keys, clamped evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Curve {
    /// Keyframes sorted by time
    pub keys: Vec<Keyframe>,
}

impl Curve {
    /// Create an empty curve (evaluates to 0)
    pub fn new() -> Self {
        Curve { keys: Vec::new() }
    }

    /// Create a curve evaluating to a single constant value
    pub fn constant(value: f32) -> Self {
        Curve {
            keys: vec![Keyframe::new(0.0, value)],
        }
    }

    /// Build a linear curve from `(time, value)` pairs
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        let mut curve = Curve::new();
        for &(t, v) in pairs {
            curve.insert(Keyframe::new(t, v));
        }
        curve
    }

    /// Insert a keyframe, maintaining sorted order.
    ///
    /// Uses `total_cmp` for the time comparison so NaN timestamps do not panic.
    pub fn insert(&mut self, keyframe: Keyframe) {
        let pos = self
            .keys
            .binary_search_by(|k| k.time.total_cmp(&keyframe.time))
            .unwrap_or_else(|p| p);
        self.keys.insert(pos, keyframe);
    }

    /// Time of the last keyframe (0 when empty)
    pub fn duration(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Replace every key's interpolation with smoothed, monotone tangents.
    ///
    /// Catmull-Rom style tangents with Fritsch-Carlson limiting: a tangent is
    /// zeroed where the adjacent secants disagree in sign (local extrema and
    /// plateaus hold their value, no overshoot), and clamped to three times
    /// the segment secant otherwise. Keys must already be sorted in time
    /// (guaranteed by [`Curve::insert`]).
    pub fn smooth_tangents(&mut self) {
        let n = self.keys.len();
        if n < 2 {
            return;
        }

        // segment secants
        let mut secants = vec![0.0f32; n - 1];
        for i in 0..n - 1 {
            let dt = self.keys[i + 1].time - self.keys[i].time;
            secants[i] = if dt.abs() < 1e-6 {
                0.0
            } else {
                (self.keys[i + 1].value - self.keys[i].value) / dt
            };
        }

        let mut tangents = vec![0.0f32; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            let (s0, s1) = (secants[i - 1], secants[i]);
            tangents[i] = if s0 * s1 <= 0.0 {
                0.0
            } else {
                (s0 + s1) * 0.5
            };
        }

        // limit tangent magnitude so each segment stays monotone
        for i in 0..n - 1 {
            let s = secants[i];
            if s == 0.0 {
                tangents[i] = 0.0;
                tangents[i + 1] = 0.0;
            } else {
                let limit = 3.0 * s.abs();
                tangents[i] = tangents[i].clamp(-limit, limit);
                tangents[i + 1] = tangents[i + 1].clamp(-limit, limit);
            }
        }

        for i in 0..n - 1 {
            self.keys[i].interpolation = Interpolation::Smooth {
                out_tangent: tangents[i],
                in_tangent: tangents[i + 1],
            };
        }
    }

    /// Evaluate the curve at a phase value, clamping outside the key range.
    pub fn evaluate(&self, t: f32) -> f32 {
        if self.keys.is_empty() {
            return 0.0;
        }
        if t <= self.keys[0].time {
            return self.keys[0].value;
        }
        // keys is non-empty, last() is always Some
        if let Some(last) = self.keys.last() {
            if t >= last.time {
                return last.value;
            }
        }

        // Binary search for the bracketing keyframe pair.
        // total_cmp avoids panicking on NaN timestamps.
        let idx = self
            .keys
            .binary_search_by(|k| k.time.total_cmp(&t))
            .unwrap_or_else(|p| p);
        let idx = if idx > 0 { idx - 1 } else { 0 };

        let k0 = &self.keys[idx];
        let k1 = &self.keys[(idx + 1).min(self.keys.len() - 1)];

        let span = k1.time - k0.time;
        if span <= 0.0 {
            return k0.value;
        }
        let alpha = (t - k0.time) / span;

        match k0.interpolation {
            Interpolation::Linear => k0.value + (k1.value - k0.value) * alpha,
            Interpolation::Step => k0.value,
            Interpolation::Smooth {
                out_tangent,
                in_tangent,
            } => {
                // Hermite basis
                let t2 = alpha * alpha;
                let t3 = t2 * alpha;
                let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let h10 = t3 - 2.0 * t2 + alpha;
                let h01 = -2.0 * t3 + 3.0 * t2;
                let h11 = t3 - t2;
                h00 * k0.value + h10 * span * out_tangent + h01 * k1.value + h11 * span * in_tangent
            }
        }
    }
}
