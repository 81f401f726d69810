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

use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    event::{EventSender, PlayerEvent, PositionSample, SessionId},
    player::PlayerBackend,
    supervisor::ProcessWatch,
};

/// Polls a player for its position and forwards the samples as events.
///
/// The monitor only observes the process through a [`ProcessWatch`] and
/// ends on its own once the process is gone.
#[derive(bon::Builder)]
pub struct PositionMonitor {
    backend:  Arc<dyn PlayerBackend>,
    watch:    ProcessWatch,
    session:  SessionId,
    events:   EventSender,
    #[builder(default = Duration::from_secs(1))]
    interval: Duration,
    #[builder(default)]
    cancel:   CancellationToken,
}

impl PositionMonitor {
    /// Spawns the polling loop on `runtime`. `None` when the player cannot
    /// report its position.
    pub fn start(self, runtime: &Handle) -> Option<MonitorHandle> {
        if !self.backend.capabilities().supports_position_query {
            debug!(kind = %self.backend.kind(), "player has no position query, not monitoring");
            return None;
        }
        let cancel = self.cancel.clone();
        let join = runtime.spawn(self.run());
        Some(MonitorHandle { cancel, join })
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!(session = %self.session, "position monitor cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if !self.watch.is_alive().await {
                info!(session = %self.session, "player exited, position monitor stopping");
                return;
            }

            let polled = tokio::select! {
                () = self.cancel.cancelled() => return,
                polled = self.backend.query_position() => polled,
            };
            match polled {
                Ok(Some(position)) => {
                    self.events.emit(PlayerEvent::Position(PositionSample {
                        session:         self.session,
                        current_seconds: position.current_seconds,
                        total_seconds:   position.total_seconds,
                    }));
                }
                Ok(None) => {}
                Err(e) => debug!(session = %self.session, "position poll failed: {e}"),
            }
        }
    }
}

/// Running monitor. Dropping the handle leaves the loop running until the
/// process exits; call [`MonitorHandle::stop`] to end it early.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    join:   JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) { self.cancel.cancel(); }

    /// Waits for the loop to end.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            debug!("position monitor task failed: {e}");
        }
    }
}
