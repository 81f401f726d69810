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

use tracing::{error, warn};

use crate::{
    err::LaunchError,
    player::{LaunchRequest, PlayerKind, PlayerRole},
    supervisor::{PlayerProcess, ProcessSupervisor},
};

/// A started player and the attempt that produced it.
#[derive(Debug)]
pub struct LaunchedPlayer {
    pub process: PlayerProcess,
    pub role:    PlayerRole,
}

/// Launches `preferred`, and the other player if and only if `preferred`
/// is not installed. Never more than two attempts.
pub fn launch_with_fallback(
    supervisor: &ProcessSupervisor,
    request: &LaunchRequest,
    preferred: PlayerKind,
) -> Result<LaunchedPlayer, LaunchError> {
    match supervisor.launch(request, preferred) {
        Ok(process) => Ok(LaunchedPlayer {
            process,
            role: PlayerRole::Primary,
        }),
        Err(e) if e.is_binary_not_found() => {
            let alternate = preferred.alternate();
            warn!(%preferred, %alternate, "{e}, falling back");
            supervisor
                .launch(request, alternate)
                .map(|process| LaunchedPlayer {
                    process,
                    role: PlayerRole::Fallback,
                })
                .inspect_err(|e| error!(%alternate, "fallback player failed too: {e}"))
        }
        Err(e) => Err(e),
    }
}
