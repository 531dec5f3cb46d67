//! Preset files: keyframe CSVs applied as randomized parameter writes.
//!
//! At most one file is selected at a time. Loading a file clears the flags and
//! data of every other file, so the library never holds two presets' worth of
//! records. Requests are served from `Engine::update`; a fetch that does not
//! resolve immediately is polled on later ticks like a channel fetch.

use std::fmt;
use std::task::Poll;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::assets::{AssetSource, FetchRequest, PendingFetch};
use crate::config::PresetConfig;
use crate::diagnostics::Diagnostics;
use crate::error::FetchError;
use crate::ids::PresetId;
use crate::interp::lerp;
use crate::outputs::{ChangeSource, CoreEvent, Outputs, ParameterChange};
use crate::records::{parse_records, KeyframeRecord};

/// Decimal places kept on randomized preset values.
const PRESET_DECIMALS: i32 = 6;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetFile {
    pub file_name: String,
    /// Requested (or currently applied).
    pub selected: bool,
    pub loaded: bool,
    pub data: Vec<KeyframeRecord>,
}

impl PresetFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    fn unload(&mut self) {
        self.selected = false;
        self.loaded = false;
        self.data.clear();
    }
}

impl From<&PresetConfig> for PresetFile {
    fn from(cfg: &PresetConfig) -> Self {
        Self {
            file_name: cfg.file_name.clone(),
            selected: cfg.selected,
            ..Self::default()
        }
    }
}

/// Round to the precision preset values are sent with.
pub fn round_preset_value(value: f64) -> f64 {
    let scale = 10f64.powi(PRESET_DECIMALS);
    (value * scale).round() / scale
}

struct PendingLoad {
    preset: PresetId,
    fetch: Box<dyn PendingFetch>,
}

pub struct PresetLibrary {
    files: Vec<PresetFile>,
    pending: Option<PendingLoad>,
    rng: StdRng,
}

impl fmt::Debug for PresetLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetLibrary")
            .field("files", &self.files)
            .field("pending", &self.pending.as_ref().map(|p| p.preset))
            .finish()
    }
}

impl PresetLibrary {
    pub fn new(configs: &[PresetConfig], seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            files: configs.iter().map(PresetFile::from).collect(),
            pending: None,
            rng,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PresetFile] {
        &self.files
    }

    pub fn get(&self, preset: PresetId) -> Option<&PresetFile> {
        self.files.get(preset.0 as usize)
    }

    /// The file currently applied, if any.
    pub fn active(&self) -> Option<PresetId> {
        self.files
            .iter()
            .position(|f| f.selected && f.loaded)
            .map(|i| PresetId(i as u32))
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn push(&mut self, file: PresetFile) -> PresetId {
        self.files.push(file);
        PresetId((self.files.len() - 1) as u32)
    }

    /// Mark a file for (re)loading on the next poll. Unknown ids are ignored.
    ///
    /// The newest request wins: a load in flight for another file is dropped,
    /// and other files requested but not yet loaded are deselected.
    pub fn select(&mut self, preset: PresetId) -> bool {
        let index = preset.0 as usize;
        if index >= self.files.len() {
            warn!("select: no preset {}", preset.0);
            return false;
        }
        if self.pending.as_ref().is_some_and(|p| p.preset != preset) {
            if let Some(p) = self.pending.take() {
                debug!("preset {} load superseded by {}", p.preset.0, preset.0);
            }
        }
        for (i, file) in self.files.iter_mut().enumerate() {
            if i == index {
                file.selected = true;
                file.loaded = false;
            } else if file.selected && !file.loaded {
                file.selected = false;
            }
        }
        true
    }

    /// Re-request every selected file, as `play()` does.
    pub fn reload_selected(&mut self) {
        for file in self.files.iter_mut().filter(|f| f.selected) {
            file.loaded = false;
        }
    }

    /// Clear every file except `keep`.
    pub fn clear_others(&mut self, keep: PresetId) {
        for (i, file) in self.files.iter_mut().enumerate() {
            if i != keep.0 as usize {
                file.unload();
            }
        }
    }

    /// Make `preset` the only selected file and request it, dropping any load in flight.
    pub fn request_exclusive(&mut self, preset: PresetId) {
        if let Some(p) = self.pending.take() {
            debug!("preset {} load superseded by {}", p.preset.0, preset.0);
        }
        self.clear_others(preset);
        self.select(preset);
    }

    /// Serve the next request: poll the load in flight, or start the first
    /// selected file that is not loaded yet.
    pub fn poll(
        &mut self,
        assets: &mut dyn AssetSource,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) {
        if let Some(pending) = &mut self.pending {
            let preset = pending.preset;
            if let Poll::Ready(result) = pending.fetch.poll_fetch() {
                self.pending = None;
                self.finish(preset, result, out, diag);
            }
            return;
        }
        let Some(index) = self.files.iter().position(|f| f.selected && !f.loaded) else {
            return;
        };
        self.begin(PresetId(index as u32), assets, out, diag);
    }

    fn begin(
        &mut self,
        preset: PresetId,
        assets: &mut dyn AssetSource,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) {
        let index = preset.0 as usize;
        let file_name = self.files[index].file_name.clone();
        if file_name.is_empty() {
            debug!("preset {} has no file name; request dropped", preset.0);
            self.files[index].selected = false;
            return;
        }
        match assets.request(&file_name) {
            FetchRequest::Ready(result) => self.finish(preset, result, out, diag),
            FetchRequest::Pending(fetch) => {
                debug!("preset {} waiting on {file_name}", preset.0);
                self.pending = Some(PendingLoad { preset, fetch });
            }
        }
    }

    fn finish(
        &mut self,
        preset: PresetId,
        result: Result<String, FetchError>,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) {
        let index = preset.0 as usize;
        self.clear_others(preset);
        let file_name = self.files[index].file_name.clone();
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                warn!("preset {}: {err}", preset.0);
                diag.fetch_failures += 1;
                self.files[index].unload();
                out.push_event(CoreEvent::FetchFailed {
                    channel: None,
                    preset: Some(preset),
                    locator: file_name,
                    message: err.to_string(),
                });
                return;
            }
        };

        let parsed = parse_records(&text);
        if !parsed.report.is_clean() {
            warn!(
                "preset {file_name}: skipped {} malformed and {} duplicate row(s)",
                parsed.report.malformed(),
                parsed.report.duplicates()
            );
            diag.record_preset_report(&parsed.report);
            out.push_event(CoreEvent::RowsRejected {
                locator: file_name.clone(),
                malformed: parsed.report.malformed(),
                duplicates: parsed.report.duplicates(),
            });
        }

        let file = &mut self.files[index];
        file.data = parsed.items;
        file.loaded = true;
        file.selected = true;
        let records = file.data.len();
        self.emit(preset, out);

        diag.presets_loaded += 1;
        info!("preset {file_name} loaded ({records} records)");
        out.push_event(CoreEvent::PresetLoaded { preset, records });
    }

    /// One randomized write per record of `preset`.
    pub fn emit(&mut self, preset: PresetId, out: &mut Outputs) {
        let Some(file) = self.files.get(preset.0 as usize) else {
            return;
        };
        for record in &file.data {
            let (lo, hi) = record.value_range();
            let t: f64 = self.rng.gen();
            let value = round_preset_value(lerp(lo, hi, t));
            out.push_change(ParameterChange {
                source: ChangeSource::Preset(preset),
                parameter: record.parameter.clone(),
                value,
            });
        }
    }
}

/// Rotation through the preset collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoCycle {
    active: bool,
    next: usize,
    wait: f64,
}

impl AutoCycle {
    pub fn start(&mut self) {
        self.active = true;
        self.next = 0;
        self.wait = 0.0;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance by `dt`; returns the preset due on this tick. The first preset
    /// is due on the tick after `start`, then one every `delay` seconds.
    pub fn advance(&mut self, dt: f64, len: usize, delay: f64) -> Option<PresetId> {
        if !self.active || len == 0 {
            return None;
        }
        if self.wait > 0.0 {
            self.wait -= dt;
            if self.wait > 0.0 {
                return None;
            }
        }
        let index = self.next % len;
        self.next = (index + 1) % len;
        self.wait = delay;
        Some(PresetId(index as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;

    const PRESET: &str = "row,Cutoff,0.5,-0.1,0.1\nrow,Resonance,2,0,0\n";

    fn library(names: &[&str]) -> PresetLibrary {
        let configs: Vec<PresetConfig> = names
            .iter()
            .map(|n| PresetConfig {
                file_name: n.to_string(),
                selected: false,
            })
            .collect();
        PresetLibrary::new(&configs, Some(7))
    }

    #[test]
    fn rounding_keeps_six_decimals() {
        assert_eq!(round_preset_value(0.123_456_789), 0.123_457);
        assert_eq!(round_preset_value(-1.0000004), -1.0);
    }

    #[test]
    fn load_emits_values_within_range() {
        let mut lib = library(&["a.csv"]);
        let mut assets = MemorySource::new().with_asset("a.csv", PRESET);
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        lib.select(PresetId(0));
        lib.poll(&mut assets, &mut out, &mut diag);

        let cutoff = out.values_for("Cutoff");
        assert_eq!(cutoff.len(), 1);
        assert!((0.4..=0.6).contains(&cutoff[0]));
        assert_eq!(out.values_for("Resonance"), vec![2.0]);
        assert_eq!(lib.active(), Some(PresetId(0)));
        assert_eq!(diag.presets_loaded, 1);
    }

    #[test]
    fn inverted_offsets_sample_the_inverted_range() {
        let mut lib = library(&["a.csv"]);
        let mut assets = MemorySource::new().with_asset("a.csv", "r,Gain,1,0.5,-0.5\n");
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        for _ in 0..20 {
            lib.select(PresetId(0));
            lib.poll(&mut assets, &mut out, &mut diag);
        }
        let values = out.values_for("Gain");
        assert_eq!(values.len(), 20);
        assert!(values.iter().all(|v| (0.5..=1.5).contains(v)));
    }

    #[test]
    fn missing_file_clears_the_others() {
        let mut lib = library(&["a.csv", "b.csv"]);
        let mut assets = MemorySource::new().with_asset("a.csv", PRESET);
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        lib.select(PresetId(0));
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(lib.files()[0].loaded);

        lib.select(PresetId(1));
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(lib.files().iter().all(|f| !f.loaded && !f.selected && f.data.is_empty()));
        assert_eq!(diag.fetch_failures, 1);
        assert_eq!(lib.active(), None);
    }

    #[test]
    fn empty_file_name_is_a_no_op() {
        let mut lib = library(&[""]);
        let mut assets = MemorySource::new();
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        lib.select(PresetId(0));
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(out.is_empty());
        assert_eq!(assets.request_count(), 0);
        assert!(!lib.files()[0].selected);
    }

    #[test]
    fn pending_load_resolves_on_a_later_poll() {
        let mut lib = library(&["a.csv"]);
        let mut assets = MemorySource::new().with_latency(1).with_asset("a.csv", PRESET);
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        lib.select(PresetId(0));
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(lib.is_loading());
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(out.changes.is_empty());
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(!lib.is_loading());
        assert_eq!(out.changes.len(), 2);
    }

    #[test]
    fn newer_selection_supersedes_a_pending_load() {
        let mut lib = library(&["a.csv", "b.csv"]);
        let mut assets = MemorySource::new()
            .with_latency(1)
            .with_asset("a.csv", PRESET)
            .with_asset("b.csv", "row,Gain,0.75,0,0\n");
        let mut out = Outputs::default();
        let mut diag = Diagnostics::default();
        lib.select(PresetId(0));
        lib.poll(&mut assets, &mut out, &mut diag);
        assert!(lib.is_loading());

        lib.select(PresetId(1));
        assert!(!lib.is_loading());
        assert!(!lib.files()[0].selected);
        for _ in 0..4 {
            lib.poll(&mut assets, &mut out, &mut diag);
        }
        assert_eq!(lib.active(), Some(PresetId(1)));
        assert_eq!(out.values_for("Gain"), vec![0.75]);
        assert!(out.values_for("Cutoff").is_empty());
        assert_eq!(diag.presets_loaded, 1);
    }

    #[test]
    fn seeded_libraries_agree() {
        let run = || {
            let mut lib = library(&["a.csv"]);
            let mut assets = MemorySource::new().with_asset("a.csv", PRESET);
            let mut out = Outputs::default();
            lib.select(PresetId(0));
            lib.poll(&mut assets, &mut out, &mut Diagnostics::default());
            out.values_for("Cutoff")
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn auto_cycle_rotates_with_delay() {
        let mut cycle = AutoCycle::default();
        assert_eq!(cycle.advance(0.1, 3, 1.0), None);
        cycle.start();
        let mut due = Vec::new();
        for _ in 0..25 {
            if let Some(p) = cycle.advance(0.25, 3, 1.0) {
                due.push(p.0);
            }
        }
        assert_eq!(due, vec![0, 1, 2, 0, 1, 2, 0]);
        cycle.stop();
        assert_eq!(cycle.advance(10.0, 3, 1.0), None);
    }

    #[test]
    fn auto_cycle_never_fires_on_an_empty_collection() {
        let mut cycle = AutoCycle::default();
        cycle.start();
        assert_eq!(cycle.advance(5.0, 0, 1.0), None);
    }
}
