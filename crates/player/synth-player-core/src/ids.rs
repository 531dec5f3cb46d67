//! Identifiers for channels, presets, playback runs and sink events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a channel inside the engine's channel list.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u32);

/// Index of a preset file inside the engine's preset library.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PresetId(pub u32);

/// Monotonic counter identifying one `play()` cycle of a channel.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    #[inline]
    pub fn next(self) -> Self {
        RunId(self.0.wrapping_add(1))
    }
}

/// Name of an event understood by the host's event sink (e.g. a sound-bank event).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
