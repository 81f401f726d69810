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

use super::{
    Capabilities, ControlCommand, HttpControl, LaunchRequest, PlayerBackend, PlayerKind, Position,
    fullscreen_flag,
};
use crate::{config::PlayerConfig, err::ControlError};

/// VLC with its HTTP interface enabled on the configured port.
///
/// Caching windows are kept short and late frames are dropped: on a small
/// board a smooth picture matters more than strict A/V sync.
#[derive(Debug, Clone)]
pub struct VlcPlayer {
    program:    String,
    http_port:  u16,
    password:   String,
    caching_ms: u32,
    control:    HttpControl,
}

impl VlcPlayer {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            program:    config.vlc_program.clone(),
            http_port:  config.vlc_control.port,
            password:   config.vlc_control.password.clone(),
            caching_ms: config.caching_ms,
            control:    HttpControl::new(&config.vlc_control, config.control_timeout),
        }
    }
}

#[async_trait::async_trait]
impl PlayerBackend for VlcPlayer {
    fn kind(&self) -> PlayerKind { PlayerKind::Vlc }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_position_query: true,
            supports_control:        true,
        }
    }

    fn program(&self) -> &str { &self.program }

    fn args(&self, request: &LaunchRequest) -> Vec<String> {
        let caching = self.caching_ms;
        let mut args = vec![
            request.stream_url.clone(),
            "--extraintf".to_string(),
            "http".to_string(),
            "--http-password".to_string(),
            self.password.clone(),
            "--http-port".to_string(),
            self.http_port.to_string(),
            fullscreen_flag(request.fullscreen).to_string(),
            "--no-video-title-show".to_string(),
            "--quiet".to_string(),
            format!("--network-caching={caching}"),
            format!("--file-caching={caching}"),
            format!("--live-caching={caching}"),
            format!("--sout-mux-caching={caching}"),
            "--cr-average=40".to_string(),
            "--drop-late-frames".to_string(),
            "--skip-frames".to_string(),
        ];
        if request.start_offset_seconds > 0 {
            args.push("--start-time".to_string());
            args.push(request.start_offset_seconds.to_string());
        }
        args
    }

    async fn send_control(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.control.send(command).await
    }

    async fn query_position(&self) -> Result<Option<Position>, ControlError> {
        self.control.position().await.map(Some)
    }
}
