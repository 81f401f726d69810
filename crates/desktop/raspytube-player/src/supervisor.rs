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

//! Spawning and tearing down external player processes.

use std::{
    collections::HashMap,
    io,
    process::Stdio,
    sync::{Arc, Weak},
    time::Duration,
};

use snafu::IntoError;
use tokio::{
    process::{Child, Command},
    sync::Mutex,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::PlayerConfig,
    err::{BinaryNotFoundSnafu, LaunchError, SpawnSnafu},
    player::{LaunchRequest, PlayerBackend, PlayerKind, backend_for},
};

/// Launches players through their [`PlayerBackend`].
#[derive(Clone)]
pub struct ProcessSupervisor {
    backends: HashMap<PlayerKind, Arc<dyn PlayerBackend>>,
}

impl ProcessSupervisor {
    pub fn new(backends: impl IntoIterator<Item = Arc<dyn PlayerBackend>>) -> Self {
        Self {
            backends: backends.into_iter().map(|b| (b.kind(), b)).collect(),
        }
    }

    /// Supervisor for every known player kind, configured from `config`.
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new([
            backend_for(PlayerKind::Vlc, config),
            backend_for(PlayerKind::Mpv, config),
        ])
    }

    /// Starts `kind` on the request's stream. The player gets no stdio and
    /// its own process group, so it neither blocks on a pipe nor receives
    /// the terminal's Ctrl-C.
    #[instrument(skip(self, request), err(Display))]
    pub fn launch(
        &self,
        request: &LaunchRequest,
        kind: PlayerKind,
    ) -> Result<PlayerProcess, LaunchError> {
        let Some(backend) = self.backends.get(&kind) else {
            return Err(BinaryNotFoundSnafu {
                program: kind.to_string(),
            }
            .into_error(io::Error::new(
                io::ErrorKind::NotFound,
                "no backend registered",
            )));
        };

        let program = backend.program().to_string();
        let args = backend.args(request);
        debug!(%program, ?args, "spawning player");

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BinaryNotFoundSnafu {
                    program: program.as_str(),
                }
                .into_error(e)
            } else {
                SpawnSnafu {
                    program: program.as_str(),
                }
                .into_error(e)
            }
        })?;

        let process = PlayerProcess::new(kind, backend.clone(), child);
        info!(%kind, pid = ?process.pid(), "player started");
        Ok(process)
    }
}

/// A running player. Owns the child process; only its owner can terminate
/// it. Observers get a [`ProcessWatch`].
pub struct PlayerProcess {
    kind:    PlayerKind,
    pid:     Option<u32>,
    backend: Arc<dyn PlayerBackend>,
    child:   Arc<Mutex<Child>>,
}

impl std::fmt::Debug for PlayerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerProcess")
            .field("kind", &self.kind)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl PlayerProcess {
    fn new(kind: PlayerKind, backend: Arc<dyn PlayerBackend>, child: Child) -> Self {
        Self {
            kind,
            pid: child.id(),
            backend,
            child: Arc::new(Mutex::new(child)),
        }
    }

    pub const fn kind(&self) -> PlayerKind { self.kind }

    pub const fn pid(&self) -> Option<u32> { self.pid }

    pub const fn backend(&self) -> &Arc<dyn PlayerBackend> { &self.backend }

    /// Non-owning handle for observers such as the position monitor.
    pub fn watch(&self) -> ProcessWatch {
        ProcessWatch {
            child: Arc::downgrade(&self.child),
        }
    }

    pub async fn is_alive(&self) -> bool { child_alive(&mut *self.child.lock().await) }

    /// Asks the player to exit, waits up to `grace`, then kills it. Failures
    /// are logged; the process is considered gone afterwards either way.
    #[instrument(skip(self), fields(kind = %self.kind, pid = ?self.pid))]
    pub async fn terminate(self, grace: Duration) {
        let mut child = self.child.lock().await;
        if let Ok(Some(status)) = child.try_wait() {
            debug!(%status, "player already exited");
            return;
        }

        if let Err(e) = send_terminate(&mut child) {
            warn!("failed to signal player: {e}");
        }

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => info!(%status, "player exited"),
            Ok(Err(e)) => warn!("failed to wait for player: {e}"),
            Err(_) => {
                warn!(?grace, "player ignored terminate, killing");
                if let Err(e) = child.kill().await {
                    error!("failed to kill player, process may leak: {e}");
                }
            }
        }
    }
}

/// Weak reference to a player process. Never keeps the process handle
/// alive on its own.
#[derive(Debug, Clone)]
pub struct ProcessWatch {
    child: Weak<Mutex<Child>>,
}

impl ProcessWatch {
    /// False once the owning session dropped the process or it exited.
    pub async fn is_alive(&self) -> bool {
        let Some(child) = self.child.upgrade() else {
            return false;
        };
        let mut guard = child.lock().await;
        child_alive(&mut guard)
    }
}

fn child_alive(child: &mut Child) -> bool { matches!(child.try_wait(), Ok(None)) }

#[cfg(unix)]
#[allow(unsafe_code)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
    // SAFETY: kill(2) takes plain integers; the pid belongs to a child that
    // has not been reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> { child.start_kill() }
