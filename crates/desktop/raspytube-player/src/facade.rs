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

//! The one entry point the UI talks to.
//!
//! [`Playback`] owns at most one session. Every method except
//! [`Playback::cleanup`] returns immediately: resolution, launching, player
//! control and teardown run as tasks on the runtime captured at
//! construction, and their outcome reaches the UI as [`PlayerEvent`]s.
//!
//! A `play()` may be overtaken by a later one at any point. Each attempt
//! carries a generation number and a cancellation token; an attempt whose
//! generation is no longer current drops its result, and terminates the
//! player it launched, if any.
//!
//! Only one player runs at a time. Before spawning, an attempt waits until
//! every earlier player, retired or launched by a superseded attempt, has
//! exited.

use std::{mem, sync::Arc};

use parking_lot::Mutex;
use raspytube_error::ErrorExt;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::PlayerConfig,
    err::{CancelledSnafu, PlaybackError, ResolveError},
    event::{self, EventReceiver, EventSender, PlayerEvent, SessionId},
    fallback::{LaunchedPlayer, launch_with_fallback},
    monitor::{MonitorHandle, PositionMonitor},
    player::{ControlCommand, LaunchRequest, PlayerBackend, PlayerKind, PlayerRole},
    resolver::StreamResolver,
    supervisor::{PlayerProcess, ProcessSupervisor},
    video::VideoId,
};

/// Where the facade is in the lifecycle of its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Resolving,
    Launching,
    Playing,
    Paused,
}

/// Point-in-time view of the facade for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub state:         PlaybackState,
    pub video_id:      Option<VideoId>,
    pub player_kind:   Option<PlayerKind>,
    pub role:          Option<PlayerRole>,
    pub session:       Option<SessionId>,
    pub is_fullscreen: bool,
    pub volume:        u8,
    pub muted:         bool,
}

/// Playback orchestration: resolve, launch with fallback, monitor, control.
#[derive(Clone)]
pub struct Playback {
    shared: Arc<Shared>,
}

struct Shared {
    resolver:   StreamResolver,
    supervisor: ProcessSupervisor,
    config:     PlayerConfig,
    runtime:    Handle,
    events:     EventSender,
    inner:      Mutex<Inner>,
}

struct Inner {
    generation:   u64,
    next_session: SessionId,
    slot:         Slot,
    /// Applies to the next launch; follows `toggle_fullscreen`.
    fullscreen:   bool,
    volume:       VolumeControl,
    /// In-flight play attempts and teardowns, awaited by `cleanup`.
    tasks:        Vec<JoinHandle<()>>,
    /// One per player that may still be running outside the active session.
    /// Cancelled once that player is gone or has become the active session.
    barriers:     Vec<CancellationToken>,
}

enum Slot {
    Idle,
    Pending(PendingPlay),
    Active(Session),
}

struct PendingPlay {
    generation: u64,
    video_id:   VideoId,
    state:      PlaybackState,
    cancel:     CancellationToken,
}

struct Session {
    id:                   SessionId,
    video_id:             VideoId,
    role:                 PlayerRole,
    process:              PlayerProcess,
    /// `None` for players without remote control.
    controls:             Option<mpsc::UnboundedSender<ControlCommand>>,
    monitor:              Option<MonitorHandle>,
    cancel:               CancellationToken,
    is_playing:           bool,
    is_fullscreen:        bool,
    start_offset_seconds: u64,
}

impl Session {
    fn send(&self, command: ControlCommand) {
        let Some(controls) = &self.controls else {
            debug!(session = %self.id, %command, "player has no remote control, dropping command");
            return;
        };
        debug!(session = %self.id, %command, "queueing player command");
        if controls.send(command).is_err() {
            debug!(session = %self.id, %command, "control worker gone, dropping command");
        }
    }
}

/// Volume with mute that remembers the level to restore.
#[derive(Debug, Clone, Copy)]
struct VolumeControl {
    volume:   u8,
    is_muted: bool,
}

impl VolumeControl {
    const fn effective_volume(self) -> u8 { if self.is_muted { 0 } else { self.volume } }
}

impl Playback {
    /// Facade with the resolver and players named in `config`.
    pub fn new(config: PlayerConfig, runtime: Handle) -> (Self, EventReceiver) {
        let resolver = StreamResolver::from_config(&config);
        let supervisor = ProcessSupervisor::from_config(&config);
        Self::with_parts(resolver, supervisor, config, runtime)
    }

    pub fn with_parts(
        resolver: StreamResolver,
        supervisor: ProcessSupervisor,
        config: PlayerConfig,
        runtime: Handle,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = event::channel(config.event_capacity);
        let inner = Inner {
            generation:   0,
            next_session: SessionId::FIRST,
            slot:         Slot::Idle,
            fullscreen:   config.fullscreen,
            volume:       VolumeControl {
                volume:   config.volume.min(100),
                is_muted: false,
            },
            tasks:        Vec::new(),
            barriers:     Vec::new(),
        };
        let shared = Shared {
            resolver,
            supervisor,
            config,
            runtime,
            events,
            inner: Mutex::new(inner),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            receiver,
        )
    }

    pub fn config(&self) -> &PlayerConfig { &self.shared.config }

    /// Starts playing `video_id`, replacing whatever was playing or still
    /// being started.
    pub fn play(&self, video_id: impl Into<VideoId>, start_offset_seconds: u64) {
        let video_id = video_id.into();
        let mut inner = self.shared.inner.lock();
        self.shared.retire(&mut inner);

        inner.generation += 1;
        let generation = inner.generation;
        let cancel = CancellationToken::new();
        inner.slot = Slot::Pending(PendingPlay {
            generation,
            video_id: video_id.clone(),
            state: PlaybackState::Resolving,
            cancel: cancel.clone(),
        });
        info!(%video_id, generation, start_offset_seconds, "play requested");

        let shared = self.shared.clone();
        let task = self.shared.runtime.spawn(async move {
            shared
                .attempt(generation, video_id, start_offset_seconds, cancel)
                .await;
        });
        inner.track(task);
    }

    pub fn pause(&self) {
        self.with_session("pause", |session, _| {
            if !session.is_playing {
                debug!(session = %session.id, "already paused");
                return;
            }
            session.is_playing = false;
            session.send(ControlCommand::Pause);
        });
    }

    pub fn resume(&self) {
        self.with_session("resume", |session, _| {
            if session.is_playing {
                debug!(session = %session.id, "already playing");
                return;
            }
            session.is_playing = true;
            session.send(ControlCommand::Play);
        });
    }

    /// Jumps to `seconds` from the start of the video.
    pub fn seek(&self, seconds: u64) {
        self.with_session("seek", |session, _| session.send(ControlCommand::Seek(seconds)));
    }

    /// Sets the volume, 0 to 100, and clears mute.
    pub fn set_volume(&self, level: u8) {
        if level > 100 {
            warn!(level, "volume out of range 0..=100, ignoring");
            return;
        }
        self.with_session("set_volume", |session, volume| {
            volume.volume = level;
            volume.is_muted = false;
            session.send(ControlCommand::Volume(level));
        });
    }

    /// Mutes, or restores the volume from before muting.
    pub fn toggle_mute(&self) {
        self.with_session("toggle_mute", |session, volume| {
            volume.is_muted = !volume.is_muted;
            session.send(ControlCommand::Volume(volume.effective_volume()));
        });
    }

    pub fn toggle_fullscreen(&self) {
        let mut inner = self.shared.inner.lock();
        let Slot::Active(session) = &mut inner.slot else {
            debug!(action = "toggle_fullscreen", "no active session, ignoring");
            return;
        };
        session.is_fullscreen = !session.is_fullscreen;
        let fullscreen = session.is_fullscreen;
        session.send(ControlCommand::ToggleFullscreen);
        inner.fullscreen = fullscreen;
    }

    /// Stops the current session, if any. Safe to call at any time.
    pub fn stop(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.retire(&mut inner);
    }

    /// Stops and waits until every player this facade started is gone.
    pub async fn cleanup(&self) {
        let tasks = {
            let mut inner = self.shared.inner.lock();
            self.shared.retire(&mut inner);
            mem::take(&mut inner.tasks)
        };
        debug!(tasks = tasks.len(), "waiting for playback tasks");
        for task in tasks {
            if let Err(e) = task.await {
                warn!("playback task failed: {e}");
            }
        }
        info!("playback cleaned up");
    }

    pub fn status(&self) -> PlaybackStatus {
        let inner = self.shared.inner.lock();
        let mut status = PlaybackStatus {
            state:         PlaybackState::Idle,
            video_id:      None,
            player_kind:   None,
            role:          None,
            session:       None,
            is_fullscreen: inner.fullscreen,
            volume:        inner.volume.volume,
            muted:         inner.volume.is_muted,
        };
        match &inner.slot {
            Slot::Idle => {}
            Slot::Pending(pending) => {
                status.state = pending.state;
                status.video_id = Some(pending.video_id.clone());
            }
            Slot::Active(session) => {
                status.state = if session.is_playing {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Paused
                };
                status.video_id = Some(session.video_id.clone());
                status.player_kind = Some(session.process.kind());
                status.role = Some(session.role);
                status.session = Some(session.id);
                status.is_fullscreen = session.is_fullscreen;
            }
        }
        status
    }

    fn with_session(&self, action: &str, f: impl FnOnce(&mut Session, &mut VolumeControl)) {
        let mut inner = self.shared.inner.lock();
        let Inner { slot, volume, .. } = &mut *inner;
        match slot {
            Slot::Active(session) => f(session, volume),
            _ => debug!(action, "no active session, ignoring"),
        }
    }
}

impl Inner {
    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    /// Registers a player that later launches must wait for.
    fn add_barrier(&mut self, barrier: CancellationToken) {
        self.barriers.retain(|b| !b.is_cancelled());
        self.barriers.push(barrier);
    }
}

impl Shared {
    /// Ends whatever occupies the slot. Must be called with the lock held.
    fn retire(&self, inner: &mut Inner) {
        match mem::replace(&mut inner.slot, Slot::Idle) {
            Slot::Idle => debug!("nothing to stop"),
            Slot::Pending(pending) => {
                info!(generation = pending.generation, video_id = %pending.video_id, "abandoning pending play");
                pending.cancel.cancel();
            }
            Slot::Active(session) => {
                let Session {
                    id,
                    video_id,
                    process,
                    monitor,
                    cancel,
                    start_offset_seconds,
                    ..
                } = session;
                info!(session = %id, %video_id, start_offset_seconds, "stopping session");
                cancel.cancel();
                if let Some(monitor) = monitor {
                    monitor.stop();
                }
                self.events.set_current(None);
                self.events.emit(PlayerEvent::Stopped { session: id });

                let grace = self.config.stop_grace;
                let gone = CancellationToken::new();
                inner.add_barrier(gone.clone());
                let task = self.runtime.spawn(async move {
                    let _gone = gone.drop_guard();
                    process.terminate(grace).await;
                });
                inner.track(task);
            }
        }
    }

    async fn attempt(
        self: Arc<Self>,
        generation: u64,
        video_id: VideoId,
        start_offset_seconds: u64,
        cancel: CancellationToken,
    ) {
        // Held until this attempt's player is gone or installed.
        let settled = CancellationToken::new();
        let _settled = settled.clone().drop_guard();
        let result = self
            .resolve_and_launch(generation, &video_id, start_offset_seconds, &cancel, &settled)
            .await;
        let launched = match result {
            Ok(Some(launched)) => launched,
            Ok(None) => return,
            Err(PlaybackError::Resolve {
                source: e @ ResolveError::Cancelled { .. },
                ..
            }) => {
                debug!(generation, "{e}");
                return;
            }
            Err(e) => {
                self.fail(generation, video_id, &e);
                return;
            }
        };

        if let Some(stale) = self.install(generation, video_id, start_offset_seconds, launched) {
            info!(generation, kind = %stale.kind(), "play was superseded, terminating its player");
            stale.terminate(self.config.stop_grace).await;
        }
    }

    /// `Ok(None)` when the attempt became stale between resolving and
    /// launching.
    async fn resolve_and_launch(
        &self,
        generation: u64,
        video_id: &VideoId,
        start_offset_seconds: u64,
        cancel: &CancellationToken,
        settled: &CancellationToken,
    ) -> Result<Option<LaunchedPlayer>, PlaybackError> {
        let cancelled = || -> PlaybackError {
            CancelledSnafu {
                video_id: video_id.as_str(),
            }
            .build()
            .into()
        };
        let candidate = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            resolved = self.resolver.resolve(video_id) => resolved?,
        };

        let Some((fullscreen, earlier)) = self.advance(generation, settled) else {
            debug!(generation, "superseded after resolving");
            return Ok(None);
        };
        if !earlier.is_empty() {
            debug!(generation, players = earlier.len(), "waiting for earlier players to exit");
        }
        for barrier in earlier {
            tokio::select! {
                () = cancel.cancelled() => return Err(cancelled()),
                () = barrier.cancelled() => {}
            }
        }

        let request = LaunchRequest::builder()
            .stream_url(candidate.url)
            .start_offset_seconds(start_offset_seconds)
            .fullscreen(fullscreen)
            .build();
        let launched =
            launch_with_fallback(&self.supervisor, &request, self.config.preferred_player)?;
        Ok(Some(launched))
    }

    /// Moves a current attempt from resolving to launching. Returns the
    /// fullscreen setting to launch with and the earlier players to wait
    /// for, and registers `settled` for later attempts to wait on.
    fn advance(
        &self,
        generation: u64,
        settled: &CancellationToken,
    ) -> Option<(bool, Vec<CancellationToken>)> {
        let mut inner = self.inner.lock();
        let Slot::Pending(pending) = &mut inner.slot else {
            return None;
        };
        if pending.generation != generation {
            return None;
        }
        pending.state = PlaybackState::Launching;
        inner.barriers.retain(|b| !b.is_cancelled());
        let earlier = inner.barriers.clone();
        inner.add_barrier(settled.clone());
        Some((inner.fullscreen, earlier))
    }

    /// Turns a launched player into the active session, or hands it back if
    /// the attempt is stale.
    fn install(
        &self,
        generation: u64,
        video_id: VideoId,
        start_offset_seconds: u64,
        launched: LaunchedPlayer,
    ) -> Option<PlayerProcess> {
        let mut inner = self.inner.lock();
        let is_current = matches!(
            &inner.slot,
            Slot::Pending(pending) if pending.generation == generation
        );
        if !is_current {
            return Some(launched.process);
        }

        let LaunchedPlayer { process, role } = launched;
        let id = inner.next_session;
        inner.next_session = id.next();

        let kind = process.kind();
        let cancel = CancellationToken::new();
        let backend = process.backend().clone();
        let controls = if backend.capabilities().supports_control {
            Some(self.spawn_control_worker(id, backend.clone(), cancel.clone()))
        } else {
            info!(session = %id, %kind, "player has no remote control, commands will be ignored");
            None
        };
        let monitor = PositionMonitor::builder()
            .backend(backend)
            .watch(process.watch())
            .session(id)
            .events(self.events.clone())
            .interval(self.config.poll_interval)
            .cancel(cancel.child_token())
            .build()
            .start(&self.runtime);

        let session = Session {
            id,
            video_id: video_id.clone(),
            role,
            process,
            controls,
            monitor,
            cancel,
            is_playing: true,
            is_fullscreen: inner.fullscreen,
            start_offset_seconds,
        };
        // Muted or lowered volume carries over into the new player.
        let volume = inner.volume.effective_volume();
        if volume != 100 {
            session.send(ControlCommand::Volume(volume));
        }
        inner.slot = Slot::Active(session);

        self.events.set_current(Some(id));
        self.events.emit(PlayerEvent::Started {
            session: id,
            video_id,
            kind,
            role,
        });
        info!(session = %id, %kind, %role, "playback started");
        None
    }

    fn fail(&self, generation: u64, video_id: VideoId, error: &PlaybackError) {
        let mut inner = self.inner.lock();
        let is_current = matches!(
            &inner.slot,
            Slot::Pending(pending) if pending.generation == generation
        );
        if !is_current {
            debug!(generation, "superseded play failed: {error}");
            return;
        }
        inner.slot = Slot::Idle;
        warn!(generation, %video_id, "playback failed: {error}");
        self.events.emit(PlayerEvent::Failed {
            video_id,
            message: error.output_msg(),
        });
    }

    /// One task per session applies its commands in order.
    fn spawn_control_worker(
        &self,
        session: SessionId,
        backend: Arc<dyn PlayerBackend>,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedSender<ControlCommand> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ControlCommand>();
        self.runtime.spawn(async move {
            loop {
                let command = tokio::select! {
                    () = cancel.cancelled() => break,
                    command = rx.recv() => match command {
                        Some(command) => command,
                        None => break,
                    },
                };
                if let Err(e) = backend.send_control(command).await {
                    warn!(%session, %command, "player control failed: {e}");
                }
            }
            debug!(%session, "control worker stopped");
        });
        tx
    }
}
