//! Engine-wide counters for skipped input and failed work.

use serde::{Deserialize, Serialize};

use crate::records::ParseReport;

/// Running counters for everything the engine skipped or survived.
/// Failures never interrupt playback; this is where they become visible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Preset rows rejected as malformed.
    pub rows_malformed: usize,
    /// Preset rows rejected as duplicates.
    pub rows_duplicate: usize,
    /// Time-series lines that failed to parse.
    pub samples_malformed: usize,
    /// Curve segments dropped for needing too many interpolation steps.
    pub segments_skipped: usize,
    pub fetch_failures: usize,
    /// Channel runs cancelled by a restart, stop or explicit cancel.
    pub channels_cancelled: usize,
    pub events_fired: usize,
    pub secondary_fired: usize,
    pub presets_loaded: usize,
}

impl Diagnostics {
    pub(crate) fn record_preset_report(&mut self, report: &ParseReport) {
        self.rows_malformed += report.malformed();
        self.rows_duplicate += report.duplicates();
    }

    pub(crate) fn record_sample_report(&mut self, report: &ParseReport) {
        self.samples_malformed += report.issues.len();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
