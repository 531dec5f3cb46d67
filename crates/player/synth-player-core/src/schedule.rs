//! Event-time distribution: turn a shaping curve, an event count and a
//! duration into cumulative trigger timestamps.
//!
//! Index `i` maps to `t = i / (count - 1)` and reads the curve at `1 - t`, so
//! later events sample earlier curve positions. Each curve value scales a fixed
//! step of `duration / (count - 1)` seconds that is added to the running total.

use serde::{Deserialize, Serialize};

/// A user-authored function over `[0, 1]`.
pub trait ShapingCurve {
    fn evaluate(&self, x: f64) -> f64;
}

impl<F> ShapingCurve for F
where
    F: Fn(f64) -> f64,
{
    #[inline]
    fn evaluate(&self, x: f64) -> f64 {
        self(x)
    }
}

/// One key of a [`KeyedCurve`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub x: f64,
    pub y: f64,
}

/// Piecewise-linear curve through authored keys, held flat outside the key range.
/// Keys are sorted by `x` on construction. With no keys the curve is `1.0`
/// everywhere, which spaces events uniformly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct KeyedCurve {
    keys: Vec<CurveKey>,
}

impl KeyedCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.retain(|k| k.x.is_finite() && k.y.is_finite());
        keys.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { keys }
    }

    pub fn constant(y: f64) -> Self {
        Self::new(vec![CurveKey { x: 0.0, y }])
    }

    /// Straight line from `(0, y0)` to `(1, y1)`.
    pub fn linear(y0: f64, y1: f64) -> Self {
        Self::new(vec![CurveKey { x: 0.0, y: y0 }, CurveKey { x: 1.0, y: y1 }])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }
}

impl From<Vec<CurveKey>> for KeyedCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl From<KeyedCurve> for Vec<CurveKey> {
    fn from(curve: KeyedCurve) -> Self {
        curve.keys
    }
}

impl ShapingCurve for KeyedCurve {
    fn evaluate(&self, x: f64) -> f64 {
        let keys = &self.keys;
        let (first, last) = match (keys.first(), keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 1.0,
        };
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }
        for pair in keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x >= a.x && x <= b.x {
                let span = b.x - a.x;
                if span <= 0.0 {
                    return b.y;
                }
                let t = (x - a.x) / span;
                return a.y + (b.y - a.y) * t;
            }
        }
        last.y
    }
}

/// Cumulative trigger timestamps in seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSchedule(Vec<f64>);

impl EventSchedule {
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

    pub fn times(&self) -> &[f64] {
        &self.0
    }

    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Build the schedule for `count` events spread over `duration` seconds.
///
/// `count == 0` yields an empty schedule and `count == 1` yields `[0.0]`.
/// Negative curve values are not rejected and can make the schedule non-monotonic.
pub fn distribute_event_times(
    count: usize,
    duration: f64,
    curve: &dyn ShapingCurve,
) -> EventSchedule {
    match count {
        0 => return EventSchedule::default(),
        1 => return EventSchedule(vec![0.0]),
        _ => {}
    }
    let steps = (count - 1) as f64;
    let increment = duration / steps;
    let mut times = Vec::with_capacity(count);
    let mut total = 0.0;
    for i in 0..count {
        let t = i as f64 / steps;
        total += curve.evaluate(1.0 - t) * increment;
        times.push(total);
    }
    EventSchedule(times)
}
