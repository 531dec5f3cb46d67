//! Engine configuration.
//!
//! Every section is `#[serde(default)]`, so a JSON config only needs the
//! fields it changes. Defaults match a freshly created player: one event over
//! one second, a 0.25 s secondary delay, 0.1 s channel delays and 2 s between
//! auto-cycled presets.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ids::EventId;
use crate::interp::DEFAULT_SAMPLES_PER_SECOND;
use crate::schedule::KeyedCurve;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub events: EventConfig,
    pub channels: Vec<ChannelConfig>,
    pub presets: Vec<PresetConfig>,
    pub auto_cycle: AutoCycleConfig,
    /// Whether `Engine::start` loads selected presets and calls `play`.
    pub execute_on_start: bool,
    pub stop_policy: StopPolicy,
    /// Interpolation resolution for channel curves.
    pub samples_per_second: f64,
    /// Seed for preset randomization; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            events: EventConfig::default(),
            channels: Vec::new(),
            presets: Vec::new(),
            auto_cycle: AutoCycleConfig::default(),
            execute_on_start: true,
            stop_policy: StopPolicy::default(),
            samples_per_second: DEFAULT_SAMPLES_PER_SECOND,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_preset(mut self, file_name: impl Into<String>) -> Self {
        self.presets.push(PresetConfig {
            file_name: file_name.into(),
            selected: false,
        });
        self
    }
}

/// Discrete trigger schedule and the events it posts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub count: usize,
    /// Seconds scaled by the shaping curve.
    pub duration: f64,
    pub curve: KeyedCurve,
    pub primary: Option<EventId>,
    /// Posted `secondary_delay` seconds after each primary.
    pub secondary: Option<EventId>,
    pub secondary_delay: f64,
    /// Posted by `stop()`; falls back to `secondary`.
    pub stop_event: Option<EventId>,
    /// Hand the secondary delay to the sink instead of timing it on the engine tick.
    pub delegate_secondary_delay: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            count: 1,
            duration: 1.0,
            curve: KeyedCurve::default(),
            primary: None,
            secondary: None,
            secondary_delay: 0.25,
            stop_event: None,
            delegate_secondary_delay: false,
        }
    }
}

/// One time-series channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// File name (relative to the asset root) or `http(s)://` URL. Empty disables the channel.
    pub locator: String,
    /// Seconds to wait after `play()` before fetching.
    pub delay: f64,
    /// Sink parameter the curve is written to.
    pub parameter: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            locator: String::new(),
            delay: 0.1,
            parameter: String::new(),
        }
    }
}

impl ChannelConfig {
    pub fn new(locator: impl Into<String>, parameter: impl Into<String>, delay: f64) -> Self {
        Self {
            locator: locator.into(),
            delay,
            parameter: parameter.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub file_name: String,
    /// Load this preset on start (and on every `play()`).
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCycleConfig {
    pub enabled: bool,
    /// Seconds between presets.
    pub delay: f64,
}

impl Default for AutoCycleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: 2.0,
        }
    }
}

/// What `stop()` does to work that is already running.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Channels keep emitting and scheduled events keep firing.
    #[default]
    LetFinish,
    /// Cancel channel runs, the event schedule and pending secondary posts.
    Cancel,
}
