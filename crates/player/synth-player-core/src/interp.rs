//! Dense interpolation of sparse time/value samples.
//!
//! Adjacent samples form segments in file order. A segment whose endpoints
//! differ in sign is split at its temporal midpoint, and the split value is the
//! endpoint with the smaller magnitude (ties go to the end value). Each piece
//! is then linearly interpolated at a fixed resolution. Segments that would
//! need more than [`MAX_SEGMENT_STEPS`] values are skipped.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::samples::TimeValueSample;

/// Samples per second of segment duration.
pub const DEFAULT_SAMPLES_PER_SECOND: f64 = 100.0;

/// Slack applied before rounding the step count up, so that spans such as
/// `0.1 * 100` do not gain an extra step from float noise.
const STEP_EPSILON: f64 = 1e-9;

/// Most steps a single segment may take: 10 000 s at the default rate.
pub const MAX_SEGMENT_STEPS: usize = 1_000_000;

/// One value per emission tick, in segment order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterpolatedSeries(Vec<f64>);

impl InterpolatedSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// Sign as used for crossing detection: zero counts as positive.
#[inline]
fn sign(v: f64) -> i8 {
    if v >= 0.0 {
        1
    } else {
        -1
    }
}

/// Unclamped lerp, written so `t = 0` and `t = 1` return the endpoints exactly.
#[inline]
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Number of steps for a segment; never less than one. `None` when the span
/// needs more than [`MAX_SEGMENT_STEPS`].
pub fn segment_steps(start_time: f64, end_time: f64, samples_per_second: f64) -> Option<usize> {
    let raw = (end_time - start_time) * samples_per_second;
    if raw.is_nan() || raw <= 0.0 {
        return Some(1);
    }
    let steps = (raw - STEP_EPSILON).ceil();
    if steps > MAX_SEGMENT_STEPS as f64 {
        return None;
    }
    Some((steps as usize).max(1))
}

/// Append `steps + 1` values from `start_value` to `end_value` inclusive.
fn push_segment(out: &mut Vec<f64>, start_value: f64, end_value: f64, steps: usize) {
    out.reserve(steps + 1);
    for j in 0..=steps {
        let t = j as f64 / steps as f64;
        out.push(lerp(start_value, end_value, t));
    }
}

/// Interpolate at [`DEFAULT_SAMPLES_PER_SECOND`].
pub fn interpolate_samples(samples: &[TimeValueSample]) -> InterpolatedSeries {
    interpolate_samples_at(samples, DEFAULT_SAMPLES_PER_SECOND)
}

/// Interpolate with an explicit resolution. Fewer than two samples give an empty series.
pub fn interpolate_samples_at(
    samples: &[TimeValueSample],
    samples_per_second: f64,
) -> InterpolatedSeries {
    interpolate_with_skips(samples, samples_per_second).0
}

/// Like [`interpolate_samples_at`], also returning how many segments were
/// skipped for exceeding [`MAX_SEGMENT_STEPS`].
pub fn interpolate_with_skips(
    samples: &[TimeValueSample],
    samples_per_second: f64,
) -> (InterpolatedSeries, usize) {
    let rate = if samples_per_second.is_finite() && samples_per_second > 0.0 {
        samples_per_second
    } else {
        DEFAULT_SAMPLES_PER_SECOND
    };
    let mut out = Vec::new();
    let mut skipped = 0;
    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if sign(a.value) != sign(b.value) {
            let mid_time = (a.time + b.time) / 2.0;
            let mid_value = if a.value.abs() < b.value.abs() {
                a.value
            } else {
                b.value
            };
            match (
                segment_steps(a.time, mid_time, rate),
                segment_steps(mid_time, b.time, rate),
            ) {
                (Some(first), Some(second)) => {
                    push_segment(&mut out, a.value, mid_value, first);
                    push_segment(&mut out, mid_value, b.value, second);
                }
                _ => {
                    warn!("segment {}s..{}s is too long; skipped", a.time, b.time);
                    skipped += 1;
                }
            }
        } else if let Some(steps) = segment_steps(a.time, b.time, rate) {
            push_segment(&mut out, a.value, b.value, steps);
        } else {
            warn!("segment {}s..{}s is too long; skipped", a.time, b.time);
            skipped += 1;
        }
    }
    (InterpolatedSeries(out), skipped)
}
