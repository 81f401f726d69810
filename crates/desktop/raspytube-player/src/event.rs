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

//! Events flowing from the playback core to the UI.
//!
//! Background tasks never block on the UI. Position samples go through a
//! bounded queue and are dropped when it is full; lifecycle events
//! (`Started`, `Failed`, `Stopped`) are few and always kept. The UI drains
//! both on its own tick with [`EventReceiver::drain`].

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::{
    player::{PlayerKind, PlayerRole},
    video::VideoId,
};

/// Identifies one playback session. Ids grow monotonically per facade and
/// start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub const FIRST: Self = Self(1);

    pub const fn get(self) -> u64 { self.0 }

    pub(crate) const fn next(self) -> Self { Self(self.0 + 1) }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// One position reading of a session's player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    pub session:         SessionId,
    pub current_seconds: u64,
    pub total_seconds:   u64,
}

impl PositionSample {
    /// `MM:SS / MM:SS`, as shown in the player bar.
    pub fn clock(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.current_seconds),
            format_clock(self.total_seconds)
        )
    }
}

fn format_clock(seconds: u64) -> String { format!("{:02}:{:02}", seconds / 60, seconds % 60) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Started {
        session:  SessionId,
        video_id: VideoId,
        kind:     PlayerKind,
        role:     PlayerRole,
    },
    Position(PositionSample),
    /// A `play()` ended without a running player.
    Failed {
        video_id: VideoId,
        message:  String,
    },
    Stopped {
        session: SessionId,
    },
}

/// No session is current.
const NO_SESSION: u64 = 0;

/// Creates the event channel. `capacity` bounds the queued position samples
/// and is clamped to at least one.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
    let (positions_tx, positions_rx) = mpsc::channel(capacity.max(1));
    let current = Arc::new(AtomicU64::new(NO_SESSION));
    (
        EventSender {
            lifecycle: lifecycle_tx,
            positions: positions_tx,
            current:   current.clone(),
        },
        EventReceiver {
            lifecycle: lifecycle_rx,
            positions: positions_rx,
            current,
        },
    )
}

#[derive(Debug, Clone)]
pub struct EventSender {
    lifecycle: mpsc::UnboundedSender<PlayerEvent>,
    positions: mpsc::Sender<PlayerEvent>,
    current:   Arc<AtomicU64>,
}

impl EventSender {
    /// Marks which session's position samples are still wanted.
    pub fn set_current(&self, session: Option<SessionId>) {
        self.current
            .store(session.map_or(NO_SESSION, SessionId::get), Ordering::SeqCst);
    }

    /// Queues `event` without waiting. Returns false when it was dropped:
    /// a position sample finding its queue full, or any event once the
    /// receiver is gone.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        let sent = match event {
            PlayerEvent::Position(sample) => match self.positions.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!(session = %sample.session, "position queue full, dropping sample");
                    return false;
                }
                Err(TrySendError::Closed(_)) => false,
            },
            event => self.lifecycle.send(event).is_ok(),
        };
        if !sent {
            debug!("event receiver gone");
        }
        sent
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    lifecycle: mpsc::UnboundedReceiver<PlayerEvent>,
    positions: mpsc::Receiver<PlayerEvent>,
    current:   Arc<AtomicU64>,
}

impl EventReceiver {
    /// Hands every queued event to `f` without waiting, lifecycle events
    /// first, skipping position samples of sessions that are no longer
    /// current. Returns how many events were delivered.
    pub fn drain(&mut self, mut f: impl FnMut(PlayerEvent)) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.lifecycle.try_recv() {
            f(event);
            delivered += 1;
        }
        while let Ok(event) = self.positions.try_recv() {
            if self.is_stale(&event) {
                continue;
            }
            f(event);
            delivered += 1;
        }
        delivered
    }

    /// Waits for the next wanted event, preferring lifecycle events. `None`
    /// once every sender is gone.
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        loop {
            let event = tokio::select! {
                biased;
                Some(event) = self.lifecycle.recv() => event,
                Some(event) = self.positions.recv() => event,
                else => return None,
            };
            if !self.is_stale(&event) {
                return Some(event);
            }
        }
    }

    fn is_stale(&self, event: &PlayerEvent) -> bool {
        match event {
            PlayerEvent::Position(sample) => {
                sample.session.get() != self.current.load(Ordering::SeqCst)
            }
            _ => false,
        }
    }
}
