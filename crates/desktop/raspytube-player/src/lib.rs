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

//! Playback core of raspytube: turns a video id into a running external
//! player and keeps the UI informed about it.

pub mod config;
pub mod err;
pub mod event;
pub mod facade;
pub mod fallback;
pub mod monitor;
pub mod player;
pub mod resolver;
pub mod supervisor;
pub mod video;

pub use self::{
    config::{PlayerConfig, ResolverBackend, VlcControlConfig},
    event::{EventReceiver, PlayerEvent, PositionSample, SessionId},
    facade::{Playback, PlaybackState, PlaybackStatus},
    player::{PlayerKind, PlayerRole},
    video::{VideoId, VideoRecord},
};
