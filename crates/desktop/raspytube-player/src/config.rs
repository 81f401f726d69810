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

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    err::{ConfigError, ParseSnafu, ReadSnafu},
    player::PlayerKind,
};

/// Which extraction backend the resolver talks to.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolverBackend {
    /// In-process extraction with `rusty_ytdl`.
    #[default]
    RustyYtdl,
    /// Shell out to the `yt-dlp` binary.
    YtDlp,
}

/// Settings of the VLC HTTP control interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
#[builder(on(String, into))]
pub struct VlcControlConfig {
    #[default = "localhost"]
    #[builder(default = "localhost".to_string())]
    pub host:     String,
    #[default = 8080]
    #[builder(default = 8080)]
    pub port:     u16,
    /// Shared secret passed to `--http-password`.
    #[default = "raspytube"]
    #[builder(default = "raspytube".to_string())]
    pub password: String,
}

impl VlcControlConfig {
    pub fn status_url(&self) -> String {
        format!("http://{}:{}/requests/status.xml", self.host, self.port)
    }
}

/// Player configuration.
///
/// Every field has a default, so a partial `player.json` is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
#[builder(on(String, into))]
pub struct PlayerConfig {
    /// Player tried first on every `play()`.
    #[builder(default)]
    pub preferred_player: PlayerKind,

    #[default = "vlc"]
    #[builder(default = "vlc".to_string())]
    pub vlc_program: String,

    #[default = "mpv"]
    #[builder(default = "mpv".to_string())]
    pub mpv_program: String,

    #[builder(default)]
    pub vlc_control: VlcControlConfig,

    /// IPC socket handed to mpv via `--input-ipc-server`.
    #[default = "/tmp/mpv-socket"]
    #[builder(default = "/tmp/mpv-socket".to_string())]
    pub mpv_socket_path: String,

    /// Start players fullscreen. Toggling fullscreen during playback carries
    /// over to the next video.
    #[builder(default)]
    pub fullscreen: bool,

    /// Volume restored by unmute before any `set_volume`, 0 to 100.
    #[default = 100]
    #[builder(default = 100)]
    pub volume: u8,

    /// Network, file and live caching window for VLC, in milliseconds.
    #[default = 300]
    #[builder(default = 300)]
    pub caching_ms: u32,

    /// Tallest rendition preferred by the resolver.
    #[default = 720]
    #[builder(default = 720)]
    pub max_height: u32,

    #[default(Duration::from_secs(1))]
    #[builder(default = Duration::from_secs(1))]
    #[serde(with = "duration_millis")]
    pub control_timeout: Duration,

    #[default(Duration::from_secs(1))]
    #[builder(default = Duration::from_secs(1))]
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// How long a player gets to exit after the terminate signal.
    #[default(Duration::from_secs(5))]
    #[builder(default = Duration::from_secs(5))]
    #[serde(with = "duration_millis")]
    pub stop_grace: Duration,

    /// Capacity of the event channel drained by the UI.
    #[default = 64]
    #[builder(default = 64)]
    pub event_capacity: usize,

    #[builder(default)]
    pub resolver_backend: ResolverBackend,

    #[default = "yt-dlp"]
    #[builder(default = "yt-dlp".to_string())]
    pub ytdlp_program: String,
}

impl PlayerConfig {
    /// Loads the config file at `path`, or the defaults when it does not
    /// exist.
    pub async fn load<P: ?Sized + AsRef<Path>>(path: &P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no player config, using defaults");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .context(ReadSnafu { path })?;
        let config = serde_json::from_str::<Self>(&content).context(ParseSnafu { path })?;
        info!(path = %path.display(), preferred = %config.preferred_player, "loaded player config");
        Ok(config)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
