//! Channel playback driver.
//!
//! One driver per channel, advanced once per host tick:
//!
//! `Idle -> Delaying -> Fetching -> Interpolating -> Emitting -> Idle`
//!
//! Transitions that need no waiting happen within the same tick, so a local
//! asset is fetched, parsed, interpolated and its first value written on the
//! tick the delay expires. Afterwards one value is written per tick, followed
//! by a final write of the last value on the tick after the series runs out.

use std::fmt;
use std::task::Poll;

use log::{debug, trace, warn};

use crate::assets::{AssetSource, FetchRequest, PendingFetch};
use crate::config::ChannelConfig;
use crate::diagnostics::Diagnostics;
use crate::ids::{ChannelId, RunId};
use crate::interp::{interpolate_with_skips, InterpolatedSeries};
use crate::outputs::{ChangeSource, CoreEvent, Outputs, ParameterChange};
use crate::samples::{is_time_ordered, parse_samples, TimeValueSample};

/// Observable driver state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ChannelState {
    Idle,
    Delaying { remaining: f64 },
    Fetching,
    Interpolating,
    /// `cursor` is the index of the next value to write; `cursor == len` means
    /// only the final write is left.
    Emitting { cursor: usize },
}

enum Phase {
    Idle,
    Delaying { remaining: f64 },
    Fetching(Box<dyn PendingFetch>),
    Interpolating(String),
    Emitting { cursor: usize },
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("Idle"),
            Phase::Delaying { remaining } => write!(f, "Delaying({remaining})"),
            Phase::Fetching(_) => f.write_str("Fetching"),
            Phase::Interpolating(text) => write!(f, "Interpolating({} bytes)", text.len()),
            Phase::Emitting { cursor } => write!(f, "Emitting({cursor})"),
        }
    }
}

#[derive(Debug)]
pub struct ChannelDriver {
    id: ChannelId,
    config: ChannelConfig,
    samples_per_second: f64,
    phase: Phase,
    run: RunId,
    samples: Vec<TimeValueSample>,
    series: InterpolatedSeries,
    current_value: f64,
}

impl ChannelDriver {
    pub fn new(id: ChannelId, config: ChannelConfig, samples_per_second: f64) -> Self {
        Self {
            id,
            config,
            samples_per_second,
            phase: Phase::Idle,
            run: RunId::default(),
            samples: Vec::new(),
            series: InterpolatedSeries::default(),
            current_value: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ChannelState {
        match &self.phase {
            Phase::Idle => ChannelState::Idle,
            Phase::Delaying { remaining } => ChannelState::Delaying {
                remaining: *remaining,
            },
            Phase::Fetching(_) => ChannelState::Fetching,
            Phase::Interpolating(_) => ChannelState::Interpolating,
            Phase::Emitting { cursor } => ChannelState::Emitting { cursor: *cursor },
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Id of the current (or most recent) run.
    #[inline]
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Last value written to the sink.
    #[inline]
    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn samples(&self) -> &[TimeValueSample] {
        &self.samples
    }

    pub fn series(&self) -> &InterpolatedSeries {
        &self.series
    }

    /// Begin a new run, cancelling the one in flight. Returns whether a run was cancelled.
    pub fn start(&mut self, out: &mut Outputs, diag: &mut Diagnostics) -> bool {
        let cancelled = self.cancel(out, diag);
        self.run = self.run.next();
        self.phase = Phase::Delaying {
            remaining: self.config.delay,
        };
        debug!(
            "channel {} run {} starts (delay {}s)",
            self.id.0, self.run.0, self.config.delay
        );
        out.push_event(CoreEvent::ChannelStarted {
            channel: self.id,
            run: self.run,
        });
        cancelled
    }

    /// Drop the run in flight, including any pending fetch.
    pub fn cancel(&mut self, out: &mut Outputs, diag: &mut Diagnostics) -> bool {
        if !self.is_active() {
            return false;
        }
        debug!(
            "channel {} run {} cancelled in {:?}",
            self.id.0, self.run.0, self.phase
        );
        self.phase = Phase::Idle;
        diag.channels_cancelled += 1;
        out.push_event(CoreEvent::ChannelCancelled {
            channel: self.id,
            run: self.run,
        });
        true
    }

    /// Advance by one host tick.
    pub fn tick(
        &mut self,
        dt: f64,
        assets: &mut dyn AssetSource,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) {
        if let Phase::Delaying { remaining } = &mut self.phase {
            if *remaining > 0.0 {
                *remaining -= dt;
                if *remaining > 0.0 {
                    return;
                }
            }
            if !self.request(assets, out, diag) {
                return;
            }
        } else if let Phase::Fetching(pending) = &mut self.phase {
            match pending.poll_fetch() {
                Poll::Pending => return,
                Poll::Ready(result) => self.resolve(result, out, diag),
            }
        }

        if matches!(self.phase, Phase::Interpolating(_)) {
            if let Phase::Interpolating(text) = std::mem::replace(&mut self.phase, Phase::Idle) {
                self.load(&text, out, diag);
            }
        }

        self.emit(out);
    }

    /// Ask the asset source for the locator. Returns true when the run can
    /// continue on this tick.
    fn request(
        &mut self,
        assets: &mut dyn AssetSource,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) -> bool {
        if self.config.locator.is_empty() {
            debug!("channel {} has no locator; run ends", self.id.0);
            self.phase = Phase::Idle;
            return false;
        }
        match assets.request(&self.config.locator) {
            FetchRequest::Ready(result) => {
                self.resolve(result, out, diag);
                matches!(self.phase, Phase::Interpolating(_))
            }
            FetchRequest::Pending(pending) => {
                trace!("channel {} waiting on {}", self.id.0, self.config.locator);
                self.phase = Phase::Fetching(pending);
                false
            }
        }
    }

    fn resolve(
        &mut self,
        result: Result<String, crate::error::FetchError>,
        out: &mut Outputs,
        diag: &mut Diagnostics,
    ) {
        match result {
            Ok(text) => self.phase = Phase::Interpolating(text),
            Err(err) => {
                warn!("channel {}: {err}", self.id.0);
                diag.fetch_failures += 1;
                out.push_event(CoreEvent::FetchFailed {
                    channel: Some(self.id),
                    preset: None,
                    locator: self.config.locator.clone(),
                    message: err.to_string(),
                });
                self.phase = Phase::Idle;
            }
        }
    }

    fn load(&mut self, text: &str, out: &mut Outputs, diag: &mut Diagnostics) {
        let parsed = parse_samples(text);
        if !parsed.report.is_clean() {
            warn!(
                "channel {}: skipped {} malformed line(s) in {}",
                self.id.0,
                parsed.report.issues.len(),
                self.config.locator
            );
            diag.record_sample_report(&parsed.report);
            out.push_event(CoreEvent::RowsRejected {
                locator: self.config.locator.clone(),
                malformed: parsed.report.malformed(),
                duplicates: parsed.report.duplicates(),
            });
        }
        self.samples = parsed.items;
        if !is_time_ordered(&self.samples) {
            warn!(
                "channel {}: sample times in {} are not ascending; segments follow file order",
                self.id.0, self.config.locator
            );
        }
        let (series, skipped) = interpolate_with_skips(&self.samples, self.samples_per_second);
        if skipped > 0 {
            warn!(
                "channel {}: skipped {skipped} oversized segment(s) in {}",
                self.id.0, self.config.locator
            );
            diag.segments_skipped += skipped;
        }
        self.series = series;
        debug!(
            "channel {} loaded {} samples -> {} values",
            self.id.0,
            self.samples.len(),
            self.series.len()
        );
        out.push_event(CoreEvent::ChannelLoaded {
            channel: self.id,
            samples: self.samples.len(),
            values: self.series.len(),
        });
        self.phase = Phase::Emitting { cursor: 0 };
    }

    fn emit(&mut self, out: &mut Outputs) {
        let Phase::Emitting { cursor } = &mut self.phase else {
            return;
        };
        if let Some(value) = self.series.get(*cursor) {
            *cursor += 1;
            self.write(value, out);
            return;
        }
        let last = self.series.last();
        if let Some(value) = last {
            self.write(value, out);
        }
        self.phase = Phase::Idle;
        debug!("channel {} run {} finished", self.id.0, self.run.0);
        out.push_event(CoreEvent::ChannelFinished {
            channel: self.id,
            last_value: last,
        });
    }

    fn write(&mut self, value: f64, out: &mut Outputs) {
        self.current_value = value;
        if self.config.parameter.is_empty() {
            return;
        }
        trace!("{} = {value}", self.config.parameter);
        out.push_change(ParameterChange {
            source: ChangeSource::Channel(self.id),
            parameter: self.config.parameter.clone(),
            value,
        });
    }
}
