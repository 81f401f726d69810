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

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use raspytube_player::{
    PlayerKind,
    err::{BackendError, ControlError, RequestSnafu},
    player::{Capabilities, ControlCommand, LaunchRequest, PlayerBackend, Position},
    resolver::{Extraction, StreamBackend, StreamCandidate},
};
use tokio::sync::Notify;

type Hook = Box<dyn FnOnce() + Send>;

/// Extraction backend that answers instantly, except for ids containing
/// `slow`, which wait for [`GatedBackend::release`]. Ids containing `hooked`
/// run the hook set with [`GatedBackend::on_extract`] once, just before
/// answering.
#[derive(Default)]
pub struct GatedBackend {
    gate:  Notify,
    calls: AtomicUsize,
    hook:  Mutex<Option<Hook>>,
}

impl GatedBackend {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn release(&self) { self.gate.notify_waiters(); }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn on_extract(&self, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }
}

#[async_trait::async_trait]
impl StreamBackend for GatedBackend {
    fn name(&self) -> &'static str { "gated" }

    async fn extract(&self, watch_url: &str) -> Result<Extraction, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if watch_url.contains("slow") {
            self.gate.notified().await;
        }
        if watch_url.contains("hooked") {
            let hook = self.hook.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
        if watch_url.contains("broken") {
            return RequestSnafu {
                message: "connection reset",
            }
            .fail();
        }
        if watch_url.contains("empty") {
            return Ok(Extraction::default());
        }
        Ok(Extraction {
            formats:  vec![StreamCandidate {
                url:       format!("stream-for-{watch_url}"),
                height:    480,
                has_audio: true,
                has_video: true,
            }],
            best_url: None,
        })
    }
}

/// Player backend running an ordinary program, recording what it is asked.
pub struct FakePlayer {
    kind:      PlayerKind,
    program:   String,
    args:      Vec<String>,
    positions: bool,
    control:   bool,
    launches:  AtomicUsize,
    requests:  Mutex<Vec<LaunchRequest>>,
    commands:  Mutex<Vec<ControlCommand>>,
    on_launch: Mutex<Option<Hook>>,
}

impl FakePlayer {
    fn build(kind: PlayerKind, program: &str, args: &[&str], positions: bool) -> Arc<Self> {
        Self::build_with(kind, program, args, positions, true)
    }

    fn build_with(
        kind: PlayerKind,
        program: &str,
        args: &[&str],
        positions: bool,
        control: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            positions,
            control,
            launches: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            on_launch: Mutex::new(None),
        })
    }

    /// Runs until terminated.
    pub fn sleeper(kind: PlayerKind) -> Arc<Self> { Self::build(kind, "sleep", &["30"], false) }

    /// Runs until terminated and reports a position.
    pub fn reporting(kind: PlayerKind) -> Arc<Self> { Self::build(kind, "sleep", &["30"], true) }

    /// Exits on its own after a short while.
    pub fn short_lived(kind: PlayerKind) -> Arc<Self> {
        Self::build(kind, "sleep", &["0.2"], true)
    }

    /// Ignores SIGTERM, so only the kill after the grace period ends it.
    pub fn stubborn(kind: PlayerKind) -> Arc<Self> {
        Self::build(kind, "sh", &["-c", "trap '' TERM; exec sleep 30"], false)
    }

    /// Runs until terminated and cannot be remote-controlled.
    pub fn uncontrolled(kind: PlayerKind) -> Arc<Self> {
        Self::build_with(kind, "sleep", &["30"], false, false)
    }

    pub fn missing(kind: PlayerKind) -> Arc<Self> {
        Self::build(kind, "raspytube-test-no-such-player", &[], false)
    }

    /// Runs `hook` once, while the next launch is building its command line.
    pub fn on_launch(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_launch.lock() = Some(Box::new(hook));
    }

    pub fn launches(&self) -> usize { self.launches.load(Ordering::SeqCst) }

    pub fn requests(&self) -> Vec<LaunchRequest> { self.requests.lock().clone() }

    pub fn commands(&self) -> Vec<ControlCommand> { self.commands.lock().clone() }
}

#[async_trait::async_trait]
impl PlayerBackend for FakePlayer {
    fn kind(&self) -> PlayerKind { self.kind }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_position_query: self.positions,
            supports_control:        self.control,
        }
    }

    fn program(&self) -> &str { &self.program }

    fn args(&self, request: &LaunchRequest) -> Vec<String> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let hook = self.on_launch.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.args.clone()
    }

    async fn send_control(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.commands.lock().push(command);
        Ok(())
    }

    async fn query_position(&self) -> Result<Option<Position>, ControlError> {
        Ok(self.positions.then_some(Position {
            current_seconds: 12,
            total_seconds:   240,
        }))
    }
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
