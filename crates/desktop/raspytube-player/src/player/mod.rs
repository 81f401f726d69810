// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! External player programs.
//!
//! Each supported program implements [`PlayerBackend`]: how to build its
//! command line, how to send it remote-control commands and whether it can
//! report the playback position. Everything above this module talks to the
//! trait only.

pub mod control;
pub mod mpv;
pub mod vlc;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use self::{
    control::{ControlCommand, HttpControl, Position},
    mpv::MpvPlayer,
    vlc::VlcPlayer,
};
use crate::{config::PlayerConfig, err::ControlError};

/// The external programs RaspyTube knows how to drive.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PlayerKind {
    #[default]
    Vlc,
    Mpv,
}

impl PlayerKind {
    /// The program tried when this one is missing.
    pub const fn alternate(self) -> Self {
        match self {
            Self::Vlc => Self::Mpv,
            Self::Mpv => Self::Vlc,
        }
    }
}

/// Which attempt of a fallback launch produced the running player.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlayerRole {
    Primary,
    Fallback,
}

/// What a player can do once it is running.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// The player answers position queries, so a monitor is worth running.
    pub supports_position_query: bool,
    /// Control commands actually reach the player. When false they are
    /// accepted and dropped.
    pub supports_control:        bool,
}

/// Everything needed to start a player on a resolved stream.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct LaunchRequest {
    #[builder(into)]
    pub stream_url:           String,
    #[builder(default)]
    pub start_offset_seconds: u64,
    #[builder(default)]
    pub fullscreen:           bool,
}

/// One external player program.
#[async_trait::async_trait]
pub trait PlayerBackend: Send + Sync {
    fn kind(&self) -> PlayerKind;

    fn capabilities(&self) -> Capabilities;

    /// Executable looked up on `PATH`.
    fn program(&self) -> &str;

    /// Command-line arguments for `request`, program name excluded.
    fn args(&self, request: &LaunchRequest) -> Vec<String>;

    /// Best-effort remote control of the running player.
    async fn send_control(&self, command: ControlCommand) -> Result<(), ControlError>;

    /// Current and total time, or `None` when the player cannot tell.
    async fn query_position(&self) -> Result<Option<Position>, ControlError>;
}

/// Backend for `kind` configured from `config`.
pub fn backend_for(kind: PlayerKind, config: &PlayerConfig) -> Arc<dyn PlayerBackend> {
    match kind {
        PlayerKind::Vlc => Arc::new(VlcPlayer::from_config(config)),
        PlayerKind::Mpv => Arc::new(MpvPlayer::from_config(config)),
    }
}

/// `--fullscreen` or `--no-fullscreen`; both players spell it the same way.
pub(crate) fn fullscreen_flag(fullscreen: bool) -> &'static str {
    if fullscreen { "--fullscreen" } else { "--no-fullscreen" }
}
