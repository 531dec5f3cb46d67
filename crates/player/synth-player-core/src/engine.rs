//! Engine: owns channels, the event schedule, presets and auto-cycle.
//!
//! Per tick, `update` runs:
//! 1. host commands
//! 2. channel drivers (delay, fetch poll, one emission each)
//! 3. due events from the schedule, all of them (catch-up)
//! 4. due secondary posts
//! 5. auto-cycle, then preset requests
//!
//! `play`/`stop`/`toggle` may also be called directly between ticks; what
//! they produce is kept and returned by the next `update` (or `take_outputs`).

use std::fmt;

use log::{debug, info, warn};

use crate::assets::AssetSource;
use crate::channel::ChannelDriver;
use crate::config::{ChannelConfig, EngineConfig, PresetConfig, StopPolicy};
use crate::diagnostics::Diagnostics;
use crate::ids::{ChannelId, PresetId};
use crate::inputs::{EngineCommand, Inputs};
use crate::outputs::{CoreEvent, EventPost, Outputs, PostRole};
use crate::presets::{AutoCycle, PresetFile, PresetLibrary};
use crate::schedule::{distribute_event_times, EventSchedule, KeyedCurve, ShapingCurve};

pub struct Engine {
    cfg: EngineConfig,
    /// Replaces `cfg.events.curve` when set.
    curve_override: Option<Box<dyn ShapingCurve>>,

    schedule: EventSchedule,
    cursor: usize,
    elapsed: f64,
    playing: bool,
    /// Elapsed times at which queued secondary posts are due.
    secondary_due: Vec<f64>,

    channels: Vec<ChannelDriver>,
    presets: PresetLibrary,
    auto_cycle: AutoCycle,

    diagnostics: Diagnostics,
    outputs: Outputs,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("custom_curve", &self.curve_override.is_some())
            .field("schedule", &self.schedule)
            .field("cursor", &self.cursor)
            .field("elapsed", &self.elapsed)
            .field("playing", &self.playing)
            .field("secondary_due", &self.secondary_due)
            .field("channels", &self.channels)
            .field("presets", &self.presets)
            .field("auto_cycle", &self.auto_cycle)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let channels = cfg
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| {
                ChannelDriver::new(ChannelId(i as u32), c.clone(), cfg.samples_per_second)
            })
            .collect();
        let presets = PresetLibrary::new(&cfg.presets, cfg.seed);
        let mut engine = Self {
            cfg,
            curve_override: None,
            schedule: EventSchedule::default(),
            cursor: 0,
            elapsed: 0.0,
            playing: false,
            secondary_due: Vec::new(),
            channels,
            presets,
            auto_cycle: AutoCycle::default(),
            diagnostics: Diagnostics::default(),
            outputs: Outputs::default(),
        };
        engine.rebuild_schedule();
        engine
    }

    // ---- accessors ----

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Seconds accumulated since the last `play()`.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn schedule(&self) -> &EventSchedule {
        &self.schedule
    }

    /// Index of the next scheduled event.
    #[inline]
    pub fn next_event_index(&self) -> usize {
        self.cursor
    }

    /// Secondary posts queued on the engine clock.
    pub fn pending_secondaries(&self) -> usize {
        self.secondary_due.len()
    }

    pub fn channels(&self) -> &[ChannelDriver] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&ChannelDriver> {
        self.channels.get(id.0 as usize)
    }

    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_auto_cycling(&self) -> bool {
        self.auto_cycle.is_active()
    }

    // ---- setup ----

    pub fn add_channel(&mut self, cfg: ChannelConfig) -> ChannelId {
        let id = ChannelId(self.channels.len() as u32);
        self.cfg.channels.push(cfg.clone());
        let driver = ChannelDriver::new(id, cfg, self.cfg.samples_per_second);
        self.channels.push(driver);
        id
    }

    pub fn add_preset(&mut self, file_name: impl Into<String>) -> PresetId {
        let file = PresetFile::new(file_name);
        self.cfg.presets.push(PresetConfig {
            file_name: file.file_name.clone(),
            selected: false,
        });
        self.presets.push(file)
    }

    pub fn set_event_count(&mut self, count: usize) {
        self.cfg.events.count = count;
        self.rebuild_schedule();
    }

    pub fn set_event_duration(&mut self, duration: f64) {
        self.cfg.events.duration = duration;
        self.rebuild_schedule();
    }

    /// Shape the schedule with any curve, e.g. a closure.
    pub fn set_shaping_curve<C: ShapingCurve + 'static>(&mut self, curve: C) {
        self.curve_override = Some(Box::new(curve));
        self.rebuild_schedule();
    }

    /// Shape the schedule with keyed points; drops any custom curve.
    pub fn set_keyed_curve(&mut self, curve: KeyedCurve) {
        self.cfg.events.curve = curve;
        self.curve_override = None;
        self.rebuild_schedule();
    }

    fn rebuild_schedule(&mut self) {
        let ev = &self.cfg.events;
        let curve: &dyn ShapingCurve = match &self.curve_override {
            Some(c) => c.as_ref(),
            None => &ev.curve,
        };
        self.schedule = distribute_event_times(ev.count, ev.duration, curve);
        if !self.schedule.is_monotonic() {
            warn!("event schedule is not monotonic; later events fire in catch-up order");
        }
        debug!("event schedule: {:?}", self.schedule.times());
    }

    // ---- transport ----

    /// Host start hook.
    pub fn start(&mut self) {
        if self.cfg.execute_on_start {
            self.play();
        }
        if self.cfg.auto_cycle.enabled {
            self.start_auto_cycle();
        }
    }

    pub fn play(&mut self) {
        info!(
            "play ({} channels, {} events)",
            self.channels.len(),
            self.cfg.events.count
        );
        self.elapsed = 0.0;
        self.cursor = 0;
        self.rebuild_schedule();
        self.secondary_due.clear();
        self.presets.reload_selected();
        self.playing = true;
        self.outputs.push_event(CoreEvent::PlaybackStarted);
        for ch in &mut self.channels {
            ch.start(&mut self.outputs, &mut self.diagnostics);
        }
        self.trigger(None);
    }

    pub fn stop(&mut self) {
        info!("stop ({:?})", self.cfg.stop_policy);
        self.playing = false;
        let ev = &self.cfg.events;
        if let Some(event) = ev.stop_event.as_ref().or(ev.secondary.as_ref()) {
            self.outputs.push_post(EventPost {
                event: event.clone(),
                role: PostRole::Stop,
                delay_seconds: 0.0,
            });
        }
        if self.cfg.stop_policy == StopPolicy::Cancel {
            for ch in &mut self.channels {
                ch.cancel(&mut self.outputs, &mut self.diagnostics);
            }
            self.schedule = EventSchedule::default();
            self.cursor = 0;
            self.secondary_due.clear();
        }
        self.outputs.push_event(CoreEvent::PlaybackStopped);
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn cancel_channel(&mut self, id: ChannelId) -> bool {
        match self.channels.get_mut(id.0 as usize) {
            Some(ch) => ch.cancel(&mut self.outputs, &mut self.diagnostics),
            None => {
                warn!("cancel: no channel {}", id.0);
                false
            }
        }
    }

    // ---- presets ----

    /// Request a preset; it loads on the next `update`.
    pub fn select_preset(&mut self, preset: PresetId) -> bool {
        self.presets.select(preset)
    }

    pub fn start_auto_cycle(&mut self) {
        if self.presets.is_empty() {
            warn!("auto-cycle started with no presets");
        }
        self.auto_cycle.start();
        self.outputs.push_event(CoreEvent::AutoCycleStarted);
    }

    pub fn stop_auto_cycle(&mut self) {
        if self.auto_cycle.is_active() {
            self.auto_cycle.stop();
            self.outputs.push_event(CoreEvent::AutoCycleStopped);
        }
    }

    // ---- tick ----

    /// Drain what direct calls produced since the last drain.
    pub fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: f64, inputs: Inputs, assets: &mut dyn AssetSource) -> Outputs {
        self.apply_inputs(inputs);

        for ch in &mut self.channels {
            ch.tick(dt, assets, &mut self.outputs, &mut self.diagnostics);
        }

        self.elapsed += dt;
        while let Some(at) = self.schedule.get(self.cursor) {
            if self.elapsed < at {
                break;
            }
            let index = self.cursor;
            self.cursor += 1;
            self.trigger(Some(index));
        }
        self.fire_due_secondaries();

        let (len, delay) = (self.presets.len(), self.cfg.auto_cycle.delay);
        if let Some(preset) = self.auto_cycle.advance(dt, len, delay) {
            debug!("auto-cycle -> preset {}", preset.0);
            self.presets.request_exclusive(preset);
        }
        self.presets.poll(assets, &mut self.outputs, &mut self.diagnostics);

        self.take_outputs()
    }

    fn apply_inputs(&mut self, inputs: Inputs) {
        for cmd in inputs.commands {
            match cmd {
                EngineCommand::Play => self.play(),
                EngineCommand::Stop => self.stop(),
                EngineCommand::Toggle => self.toggle(),
                EngineCommand::SelectPreset { preset } => {
                    self.select_preset(preset);
                }
                EngineCommand::StartAutoCycle => self.start_auto_cycle(),
                EngineCommand::StopAutoCycle => self.stop_auto_cycle(),
                EngineCommand::CancelChannel { channel } => {
                    self.cancel_channel(channel);
                }
            }
        }
    }

    fn trigger(&mut self, index: Option<usize>) {
        self.diagnostics.events_fired += 1;
        debug!("trigger {index:?} at {:.3}s", self.elapsed);
        let ev = &self.cfg.events;
        if let Some(primary) = &ev.primary {
            self.outputs.push_post(EventPost {
                event: primary.clone(),
                role: PostRole::Primary,
                delay_seconds: 0.0,
            });
            // The secondary only follows a primary.
            if let Some(secondary) = &ev.secondary {
                if ev.delegate_secondary_delay {
                    self.diagnostics.secondary_fired += 1;
                    self.outputs.push_post(EventPost {
                        event: secondary.clone(),
                        role: PostRole::Secondary,
                        delay_seconds: ev.secondary_delay.max(0.0),
                    });
                } else {
                    self.secondary_due.push(self.elapsed + ev.secondary_delay);
                }
            }
        }
        self.outputs.push_event(CoreEvent::Triggered {
            index,
            elapsed: self.elapsed,
        });
    }

    fn fire_due_secondaries(&mut self) {
        let Some(secondary) = self.cfg.events.secondary.clone() else {
            self.secondary_due.clear();
            return;
        };
        let elapsed = self.elapsed;
        let due = self.secondary_due.iter().filter(|&&t| elapsed >= t).count();
        if due == 0 {
            return;
        }
        self.secondary_due.retain(|&t| elapsed < t);
        for _ in 0..due {
            self.diagnostics.secondary_fired += 1;
            self.outputs.push_post(EventPost {
                event: secondary.clone(),
                role: PostRole::Secondary,
                delay_seconds: 0.0,
            });
        }
    }
}
