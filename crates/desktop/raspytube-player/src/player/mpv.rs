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

use tracing::debug;

use super::{
    Capabilities, ControlCommand, LaunchRequest, PlayerBackend, PlayerKind, Position,
    fullscreen_flag,
};
use crate::{config::PlayerConfig, err::ControlError};

/// mpv started with an IPC socket.
///
/// Nothing talks to that socket yet: control commands are accepted and
/// dropped, and there is no position query.
// TODO: speak mpv's JSON IPC protocol on `socket_path` for control and
// `time-pos`/`duration` queries.
#[derive(Debug, Clone)]
pub struct MpvPlayer {
    program:     String,
    socket_path: String,
}

impl MpvPlayer {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            program:     config.mpv_program.clone(),
            socket_path: config.mpv_socket_path.clone(),
        }
    }
}

#[async_trait::async_trait]
impl PlayerBackend for MpvPlayer {
    fn kind(&self) -> PlayerKind { PlayerKind::Mpv }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_position_query: false,
            supports_control:        false,
        }
    }

    fn program(&self) -> &str { &self.program }

    fn args(&self, request: &LaunchRequest) -> Vec<String> {
        let mut args = vec![
            request.stream_url.clone(),
            format!("--input-ipc-server={}", self.socket_path),
            fullscreen_flag(request.fullscreen).to_string(),
            "--no-terminal".to_string(),
            "--quiet".to_string(),
        ];
        if request.start_offset_seconds > 0 {
            args.push(format!("--start=+{}", request.start_offset_seconds));
        }
        args
    }

    async fn send_control(&self, command: ControlCommand) -> Result<(), ControlError> {
        debug!(%command, "mpv control not supported, dropping command");
        Ok(())
    }

    async fn query_position(&self) -> Result<Option<Position>, ControlError> { Ok(None) }
}
