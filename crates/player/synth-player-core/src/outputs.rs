//! Output contracts from the engine.
//!
//! Outputs carry the parameter writes and event posts produced since the last
//! drain, plus a separate list of semantic events. Hosts apply writes and posts
//! to their sinks (see [`Outputs::dispatch`]) and may react to the events, e.g.
//! to run visual side effects on every trigger.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, EventId, PresetId, RunId};
use crate::sinks::{EventSink, ParameterSink};

/// Where a parameter write came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSource {
    Channel(ChannelId),
    Preset(PresetId),
}

/// One parameter write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub source: ChangeSource,
    pub parameter: String,
    pub value: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostRole {
    Primary,
    Secondary,
    Stop,
}

/// One event post. A zero delay maps to `post_event`, anything else to
/// `post_event_with_delay`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventPost {
    pub event: EventId,
    pub role: PostRole,
    #[serde(default)]
    pub delay_seconds: f64,
}

/// Discrete semantic signals emitted while stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CoreEvent {
    PlaybackStarted,
    PlaybackStopped,
    /// A trigger fired. `index` is the schedule slot, `None` for the trigger fired by `play()`.
    Triggered {
        index: Option<usize>,
        elapsed: f64,
    },
    ChannelStarted {
        channel: ChannelId,
        run: RunId,
    },
    ChannelCancelled {
        channel: ChannelId,
        run: RunId,
    },
    ChannelLoaded {
        channel: ChannelId,
        samples: usize,
        values: usize,
    },
    ChannelFinished {
        channel: ChannelId,
        last_value: Option<f64>,
    },
    FetchFailed {
        channel: Option<ChannelId>,
        preset: Option<PresetId>,
        locator: String,
        message: String,
    },
    RowsRejected {
        locator: String,
        malformed: usize,
        duplicates: usize,
    },
    PresetLoaded {
        preset: PresetId,
        records: usize,
    },
    AutoCycleStarted,
    AutoCycleStopped,
}

/// Everything produced since the last drain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub changes: Vec<ParameterChange>,
    #[serde(default)]
    pub posts: Vec<EventPost>,
    #[serde(default)]
    pub events: Vec<CoreEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.posts.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_change(&mut self, change: ParameterChange) {
        self.changes.push(change);
    }

    #[inline]
    pub fn push_post(&mut self, post: EventPost) {
        self.posts.push(post);
    }

    #[inline]
    pub fn push_event(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.posts.is_empty() && self.events.is_empty()
    }

    /// Append another batch, keeping order.
    pub fn append(&mut self, mut other: Outputs) {
        self.changes.append(&mut other.changes);
        self.posts.append(&mut other.posts);
        self.events.append(&mut other.events);
    }

    /// Values written to `parameter`, in order.
    pub fn values_for(&self, parameter: &str) -> Vec<f64> {
        self.changes
            .iter()
            .filter(|c| c.parameter == parameter)
            .map(|c| c.value)
            .collect()
    }

    /// Apply parameter writes, then event posts, to the host sinks.
    pub fn dispatch(&self, params: &mut dyn ParameterSink, events: &mut dyn EventSink) {
        for change in &self.changes {
            params.set_parameter_value(&change.parameter, change.value);
        }
        for post in &self.posts {
            if post.delay_seconds > 0.0 {
                events.post_event_with_delay(&post.event, post.delay_seconds);
            } else {
                events.post_event(&post.event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{RecordingSink, SinkCall};

    #[test]
    fn dispatch_routes_delayed_posts() {
        let mut out = Outputs::default();
        out.push_change(ParameterChange {
            source: ChangeSource::Channel(ChannelId(0)),
            parameter: "Cutoff".into(),
            value: 0.5,
        });
        out.push_post(EventPost {
            event: EventId::new("Hit"),
            role: PostRole::Primary,
            delay_seconds: 0.0,
        });
        out.push_post(EventPost {
            event: EventId::new("Tail"),
            role: PostRole::Secondary,
            delay_seconds: 0.25,
        });

        let mut params = RecordingSink::new();
        let mut events = RecordingSink::new();
        out.dispatch(&mut params, &mut events);

        assert_eq!(params.values_for("Cutoff"), vec![0.5]);
        assert_eq!(
            events.calls,
            vec![
                SinkCall::PostEvent {
                    event: EventId::new("Hit")
                },
                SinkCall::PostEventWithDelay {
                    event: EventId::new("Tail"),
                    delay_seconds: 0.25
                },
            ]
        );
    }

    #[test]
    fn append_keeps_order_and_clear_empties() {
        let mut a = Outputs::default();
        a.push_event(CoreEvent::PlaybackStarted);
        let mut b = Outputs::default();
        b.push_event(CoreEvent::PlaybackStopped);
        a.append(b);
        assert_eq!(
            a.events,
            vec![CoreEvent::PlaybackStarted, CoreEvent::PlaybackStopped]
        );
        a.clear();
        assert!(a.is_empty());
    }
}
