//! Time-series rows of the form `<time>_<value>[_...]`.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::records::{parse_number, Parsed, RowIssueKind};

const MIN_FIELDS: usize = 2;

/// A raw curve sample: `value` at `time` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeValueSample {
    pub time: f64,
    pub value: f64,
}

impl TimeValueSample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Parse a time-series source. Samples keep file order; they are not sorted.
pub fn parse_samples(text: &str) -> Parsed<TimeValueSample> {
    let mut parsed = Parsed::default();

    for (idx, raw) in text.split('\n').enumerate() {
        let line = idx + 1;
        let row = raw.trim();
        if row.is_empty() {
            continue;
        }
        let fields: Vec<&str> = row.split('_').collect();
        if fields.len() < MIN_FIELDS {
            parsed.report.reject(
                line,
                RowIssueKind::TooFewColumns {
                    expected: MIN_FIELDS,
                    found: fields.len(),
                },
                row,
            );
            continue;
        }
        match (parse_number(fields[0]), parse_number(fields[1])) {
            (Ok(time), Ok(value)) => {
                trace!("sample t={time} v={value}");
                parsed.accept(TimeValueSample { time, value });
            }
            (Err(kind), _) | (_, Err(kind)) => parsed.report.reject(line, kind, row),
        }
    }
    parsed
}

/// True when sample times never decrease in file order.
pub fn is_time_ordered(samples: &[TimeValueSample]) -> bool {
    samples.windows(2).all(|w| w[0].time <= w[1].time)
}
