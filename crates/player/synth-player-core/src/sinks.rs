//! Host-side collaborators that receive parameter writes and event posts.

use serde::{Deserialize, Serialize};

use crate::ids::EventId;

/// Real-time control target (RTPC-style) that float values are written to.
pub trait ParameterSink {
    fn set_parameter_value(&mut self, name: &str, value: f64);
}

/// Receiver of discrete sound events.
pub trait EventSink {
    fn post_event(&mut self, event: &EventId);

    /// Post after `delay_seconds`. Sinks without native delay support may post
    /// immediately.
    fn post_event_with_delay(&mut self, event: &EventId, delay_seconds: f64) {
        let _ = delay_seconds;
        self.post_event(event);
    }
}

/// One call observed by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SinkCall {
    SetParameter { name: String, value: f64 },
    PostEvent { event: EventId },
    PostEventWithDelay { event: EventId, delay_seconds: f64 },
}

/// Sink that records every call in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Values written to `name`, in call order.
    pub fn values_for(&self, name: &str) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::SetParameter { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl ParameterSink for RecordingSink {
    fn set_parameter_value(&mut self, name: &str, value: f64) {
        self.calls.push(SinkCall::SetParameter {
            name: name.to_string(),
            value,
        });
    }
}

impl EventSink for RecordingSink {
    fn post_event(&mut self, event: &EventId) {
        self.calls.push(SinkCall::PostEvent {
            event: event.clone(),
        });
    }

    fn post_event_with_delay(&mut self, event: &EventId, delay_seconds: f64) {
        self.calls.push(SinkCall::PostEventWithDelay {
            event: event.clone(),
            delay_seconds,
        });
    }
}
