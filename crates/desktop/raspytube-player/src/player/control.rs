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

use std::{fmt, time::Duration};

use snafu::{IntoError, OptionExt};
use tracing::debug;

use crate::{
    config::VlcControlConfig,
    err::{ControlError, MalformedStatusSnafu, TimeoutSnafu, UnreachableSnafu},
};

/// Remote-control commands understood by the players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Play,
    ToggleFullscreen,
    /// Volume level, 0 to 100.
    Volume(u8),
    /// Absolute position in seconds.
    Seek(u64),
}

impl ControlCommand {
    /// Query string of the VLC HTTP interface for this command.
    pub fn query(self) -> String {
        match self {
            Self::Pause => "command=pl_pause".to_string(),
            Self::Play => "command=pl_play".to_string(),
            Self::ToggleFullscreen => "command=fullscreen".to_string(),
            Self::Volume(level) => format!("command=volume&val={level}"),
            Self::Seek(seconds) => format!("command=seek&val={seconds}"),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => f.write_str("pause"),
            Self::Play => f.write_str("play"),
            Self::ToggleFullscreen => f.write_str("fullscreen"),
            Self::Volume(level) => write!(f, "volume {level}"),
            Self::Seek(seconds) => write!(f, "seek {seconds}"),
        }
    }
}

/// Playback position reported by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub current_seconds: u64,
    pub total_seconds:   u64,
}

/// Client of VLC's `status.xml` HTTP interface.
///
/// Authenticates with an empty user name and the shared password, and gives
/// every request the control timeout.
#[derive(Debug, Clone)]
pub struct HttpControl {
    client:     reqwest::Client,
    status_url: String,
    password:   String,
}

impl HttpControl {
    pub fn new(config: &VlcControlConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Expected reqwest client build to succeed");
        Self {
            client,
            status_url: config.status_url(),
            password: config.password.clone(),
        }
    }

    pub async fn send(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.get(&command.to_string(), Some(&command.query()))
            .await
            .map(|_| ())
    }

    pub async fn position(&self) -> Result<Position, ControlError> {
        let body = self.get("status", None).await?;
        parse_status(&body)
    }

    async fn get(&self, label: &str, query: Option<&str>) -> Result<String, ControlError> {
        let url = match query {
            Some(query) => format!("{}?{query}", self.status_url),
            None => self.status_url.clone(),
        };
        debug!(%url, "player control request");
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TimeoutSnafu { command: label }.build()
            } else {
                UnreachableSnafu { command: label }.into_error(e)
            }
        };
        let response = self
            .client
            .get(&url)
            .basic_auth("", Some(&self.password))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(map_err)?;
        response.text().await.map_err(map_err)
    }
}

/// Reads `<time>` and `<length>` (seconds) out of a VLC status document.
/// Negative values, which VLC reports for unknown lengths, become zero.
pub fn parse_status(xml: &str) -> Result<Position, ControlError> {
    let current = element_seconds(xml, "time")?;
    let total = element_seconds(xml, "length")?;
    Ok(Position {
        current_seconds: current,
        total_seconds:   total,
    })
}

fn element_seconds(xml: &str, name: &str) -> Result<u64, ControlError> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let text = xml
        .find(&open)
        .map(|start| &xml[start + open.len()..])
        .and_then(|rest| rest.find(&close).map(|end| &rest[..end]))
        .context(MalformedStatusSnafu {
            reason: format!("missing <{name}>"),
        })?;
    let value = text.trim().parse::<i64>().ok().context(MalformedStatusSnafu {
        reason: format!("<{name}> is not an integer: {text:?}"),
    })?;
    Ok(u64::try_from(value).unwrap_or(0))
}
