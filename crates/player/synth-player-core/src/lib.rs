//! Synth player core (host-agnostic)
//!
//! Time-keyed parameter playback: preset keyframe files applied as randomized
//! parameter writes, time/value curves interpolated and streamed one value per
//! host tick, and discrete sound events fired on a curve-shaped schedule.
//! Hosts own the frame clock and the sinks; they call `Engine::update()` every
//! tick and dispatch the returned `Outputs`.

pub mod assets;
pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod interp;
pub mod outputs;
pub mod presets;
pub mod records;
pub mod samples;
pub mod schedule;
pub mod sinks;

// Re-exports for hosts
#[cfg(feature = "http")]
pub use assets::HttpSource;
pub use assets::{
    is_network_locator, AssetSource, FetchRequest, FileSource, MemorySource, PendingFetch,
    StreamingAssets,
};
pub use channel::{ChannelDriver, ChannelState};
pub use config::{
    AutoCycleConfig, ChannelConfig, EngineConfig, EventConfig, PresetConfig, StopPolicy,
};
pub use diagnostics::Diagnostics;
pub use engine::Engine;
pub use error::{ConfigError, FetchError};
pub use ids::{ChannelId, EventId, PresetId, RunId};
pub use inputs::{EngineCommand, Inputs};
pub use interp::{
    interpolate_samples, interpolate_samples_at, interpolate_with_skips, InterpolatedSeries,
    MAX_SEGMENT_STEPS,
};
pub use outputs::{ChangeSource, CoreEvent, EventPost, Outputs, ParameterChange, PostRole};
pub use presets::{round_preset_value, AutoCycle, PresetFile, PresetLibrary};
pub use records::{parse_records, KeyframeRecord, ParseReport, Parsed, RowIssue, RowIssueKind};
pub use samples::{parse_samples, TimeValueSample};
pub use schedule::{distribute_event_times, CurveKey, EventSchedule, KeyedCurve, ShapingCurve};
pub use sinks::{EventSink, ParameterSink, RecordingSink, SinkCall};
