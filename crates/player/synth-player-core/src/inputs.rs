//! Input contracts for the engine.
//!
//! Hosts translate key presses, UI actions and the like into commands and pass
//! them to `Engine::update()` each tick. Commands apply before anything else
//! advances.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, PresetId};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default)]
    pub commands: Vec<EngineCommand>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(cmd: EngineCommand) -> Self {
        Self {
            commands: vec![cmd],
        }
    }

    pub fn push(&mut self, cmd: EngineCommand) {
        self.commands.push(cmd);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineCommand {
    Play,
    Stop,
    Toggle,
    /// Request a preset load on this tick.
    SelectPreset { preset: PresetId },
    StartAutoCycle,
    StopAutoCycle,
    CancelChannel { channel: ChannelId },
}
