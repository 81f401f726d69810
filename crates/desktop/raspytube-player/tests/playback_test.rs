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

#![cfg(unix)]

mod common;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{FakePlayer, GatedBackend, eventually};
use raspytube_player::{
    EventReceiver, Playback, PlaybackState, PlayerConfig, PlayerEvent, PlayerKind, PlayerRole,
    SessionId,
    player::{ControlCommand, PlayerBackend},
    resolver::StreamResolver,
    supervisor::ProcessSupervisor,
};

struct Harness {
    playback: Playback,
    events:   EventReceiver,
    resolver: Arc<GatedBackend>,
}

fn harness(players: &[Arc<FakePlayer>]) -> Harness {
    harness_with_grace(players, Duration::from_secs(2))
}

fn harness_with_grace(players: &[Arc<FakePlayer>], stop_grace: Duration) -> Harness {
    raspytube_common_telemetry::init_default_ut_logging();
    let config = PlayerConfig::builder()
        .poll_interval(Duration::from_millis(50))
        .stop_grace(stop_grace)
        .build();
    let backend = GatedBackend::new();
    let resolver = StreamResolver::new(backend.clone(), config.max_height);
    let supervisor = ProcessSupervisor::new(
        players
            .iter()
            .map(|p| p.clone() as Arc<dyn PlayerBackend>),
    );
    let (playback, events) = Playback::with_parts(
        resolver,
        supervisor,
        config,
        tokio::runtime::Handle::current(),
    );
    Harness {
        playback,
        events,
        resolver: backend,
    }
}

fn drain(events: &mut EventReceiver) -> Vec<PlayerEvent> {
    let mut seen = Vec::new();
    events.drain(|e| seen.push(e));
    seen
}

async fn reach(playback: &Playback, state: PlaybackState) {
    assert!(
        eventually(|| playback.status().state == state).await,
        "never reached {state}, status: {:?}",
        playback.status()
    );
}

#[tokio::test]
async fn test_play_pause_resume_stop() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc.clone()]);

    playback.play("fast", 30);
    reach(&playback, PlaybackState::Playing).await;

    let status = playback.status();
    assert_eq!(status.video_id.as_ref().map(|v| v.as_str()), Some("fast"));
    assert_eq!(status.player_kind, Some(PlayerKind::Vlc));
    assert_eq!(status.role, Some(PlayerRole::Primary));
    let request = &vlc.requests()[0];
    assert_eq!(request.start_offset_seconds, 30);
    assert!(request.stream_url.starts_with("stream-for-"));

    playback.pause();
    assert_eq!(playback.status().state, PlaybackState::Paused);
    playback.pause();
    playback.resume();
    assert_eq!(playback.status().state, PlaybackState::Playing);
    playback.seek(90);
    assert!(eventually(|| vlc.commands().len() == 3).await);
    assert_eq!(vlc.commands(), vec![
        ControlCommand::Pause,
        ControlCommand::Play,
        ControlCommand::Seek(90),
    ]);

    playback.cleanup().await;
    assert_eq!(playback.status().state, PlaybackState::Idle);

    let seen = drain(&mut events);
    let session = status.session.unwrap();
    assert!(matches!(
        seen.first(),
        Some(PlayerEvent::Started { session: s, kind: PlayerKind::Vlc, .. }) if *s == session
    ));
    assert_eq!(seen.last(), Some(&PlayerEvent::Stopped { session }));
}

#[tokio::test]
async fn test_later_play_preempts_resolving_one() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        resolver,
    } = harness(&[vlc.clone()]);

    playback.play("slow", 0);
    assert_eq!(playback.status().state, PlaybackState::Resolving);
    assert!(eventually(|| resolver.calls() == 1).await);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;

    resolver.release();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = playback.status();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.video_id.as_ref().map(|v| v.as_str()), Some("fast"));
    assert_eq!(vlc.launches(), 1);

    playback.cleanup().await;
    let started: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::Started { .. }))
        .collect();
    assert_eq!(started.len(), 1);
}

#[tokio::test]
async fn test_play_replaces_running_session() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc.clone()]);

    playback.play("first", 0);
    reach(&playback, PlaybackState::Playing).await;
    let first = playback.status().session.unwrap();

    playback.play("second", 0);
    assert!(
        eventually(|| {
            let status = playback.status();
            status.state == PlaybackState::Playing && status.session != Some(first)
        })
        .await
    );
    let second = playback.status().session.unwrap();
    assert!(second > first);

    playback.cleanup().await;
    let seen = drain(&mut events);
    assert!(seen.contains(&PlayerEvent::Stopped { session: first }));
    assert!(seen.contains(&PlayerEvent::Stopped { session: second }));
    assert_eq!(vlc.launches(), 2);
}

#[tokio::test]
async fn test_new_player_waits_for_old_one_to_exit() {
    let grace = Duration::from_millis(600);
    let vlc = FakePlayer::stubborn(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness_with_grace(&[vlc.clone()], grace);

    playback.play("first", 0);
    reach(&playback, PlaybackState::Playing).await;
    let first = playback.status().session.unwrap();
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let replaced_at = Instant::now();
    playback.play("second", 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    // The old player ignores SIGTERM and is still inside its grace period.
    assert_eq!(playback.status().state, PlaybackState::Launching);
    assert_eq!(vlc.launches(), 1);

    reach(&playback, PlaybackState::Playing).await;
    assert!(replaced_at.elapsed() >= grace);
    assert_eq!(vlc.launches(), 2);

    let lifecycle: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| !matches!(e, PlayerEvent::Position(_)))
        .collect();
    let second = playback.status().session.unwrap();
    assert!(matches!(
        lifecycle.as_slice(),
        [
            PlayerEvent::Started { session: a, .. },
            PlayerEvent::Stopped { session: b },
            PlayerEvent::Started { session: c, .. },
        ] if *a == first && *b == first && *c == second
    ));
    playback.cleanup().await;
}

#[tokio::test]
async fn test_stop_while_waiting_for_old_player_never_launches() {
    let vlc = FakePlayer::stubborn(PlayerKind::Vlc);
    let Harness { playback, .. } = harness_with_grace(&[vlc.clone()], Duration::from_millis(500));

    playback.play("first", 0);
    reach(&playback, PlaybackState::Playing).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    playback.play("second", 0);
    reach(&playback, PlaybackState::Launching).await;
    playback.stop();
    playback.cleanup().await;

    assert_eq!(playback.status().state, PlaybackState::Idle);
    assert_eq!(vlc.launches(), 1);
}

#[tokio::test]
async fn test_play_during_launch_terminates_the_stale_player() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc.clone()]);

    // The first launch is overtaken while its player is being spawned.
    let hook_playback = playback.clone();
    vlc.on_launch(move || hook_playback.play("second", 0));

    playback.play("first", 0);
    assert!(
        eventually(|| {
            let status = playback.status();
            status.state == PlaybackState::Playing
                && status.video_id.as_ref().map(|v| v.as_str()) == Some("second")
        })
        .await
    );
    assert_eq!(vlc.launches(), 2);

    playback.cleanup().await;
    let seen = drain(&mut events);
    let started: Vec<_> = seen
        .iter()
        .filter(|e| matches!(e, PlayerEvent::Started { .. }))
        .collect();
    assert!(matches!(
        started.as_slice(),
        [PlayerEvent::Started { session, video_id, .. }]
            if *session == SessionId::FIRST && video_id.as_str() == "second"
    ));
    // Only the installed session is ever stopped.
    assert_eq!(
        seen.iter()
            .filter(|e| matches!(e, PlayerEvent::Stopped { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_play_after_resolving_drops_the_stale_result() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        resolver,
    } = harness(&[vlc.clone()]);

    let hook_playback = playback.clone();
    resolver.on_extract(move || hook_playback.play("fast", 0));

    playback.play("hooked", 0);
    assert!(
        eventually(|| {
            let status = playback.status();
            status.state == PlaybackState::Playing
                && status.video_id.as_ref().map(|v| v.as_str()) == Some("fast")
        })
        .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(resolver.calls(), 2);
    assert_eq!(vlc.launches(), 1);
    assert_eq!(vlc.requests()[0].stream_url, "stream-for-https://www.youtube.com/watch?v=fast");

    playback.cleanup().await;
    let started = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::Started { .. }))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_commands_for_uncontrolled_player_are_dropped() {
    let vlc = FakePlayer::uncontrolled(PlayerKind::Vlc);
    let Harness { playback, .. } = harness(&[vlc.clone()]);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;
    playback.pause();
    playback.seek(30);
    playback.set_volume(20);
    assert_eq!(playback.status().state, PlaybackState::Paused);
    assert_eq!(playback.status().volume, 20);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(vlc.commands().is_empty());
    playback.cleanup().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc]);

    playback.stop();
    assert_eq!(playback.status().state, PlaybackState::Idle);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;
    playback.stop();
    playback.stop();
    assert_eq!(playback.status().state, PlaybackState::Idle);
    playback.cleanup().await;
    playback.cleanup().await;

    let stopped = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::Stopped { .. }))
        .count();
    assert_eq!(stopped, 1);
}

#[tokio::test]
async fn test_stop_while_resolving_never_launches() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness {
        playback, resolver, ..
    } = harness(&[vlc.clone()]);

    playback.play("slow", 0);
    assert!(eventually(|| resolver.calls() == 1).await);
    playback.stop();
    resolver.release();
    playback.cleanup().await;

    assert_eq!(playback.status().state, PlaybackState::Idle);
    assert_eq!(vlc.launches(), 0);
}

#[tokio::test]
async fn test_missing_preferred_player_falls_back() {
    let vlc = FakePlayer::missing(PlayerKind::Vlc);
    let mpv = FakePlayer::sleeper(PlayerKind::Mpv);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc.clone(), mpv.clone()]);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;
    let status = playback.status();
    assert_eq!(status.player_kind, Some(PlayerKind::Mpv));
    assert_eq!(status.role, Some(PlayerRole::Fallback));
    assert_eq!((vlc.launches(), mpv.launches()), (1, 1));

    // The preference is not remembered: the next play tries VLC again.
    playback.play("fast", 0);
    assert!(eventually(|| vlc.launches() == 2 && mpv.launches() == 2).await);

    playback.cleanup().await;
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        PlayerEvent::Started {
            kind: PlayerKind::Mpv,
            role: PlayerRole::Fallback,
            ..
        }
    )));
}

#[tokio::test]
async fn test_failures_surface_as_events() {
    let vlc = FakePlayer::missing(PlayerKind::Vlc);
    let mpv = FakePlayer::missing(PlayerKind::Mpv);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc.clone(), mpv.clone()]);

    playback.play("fast", 0);
    let mut failed = Vec::new();
    assert!(
        eventually(|| {
            events.drain(|e| failed.push(e));
            !failed.is_empty()
        })
        .await
    );
    assert_eq!(playback.status().state, PlaybackState::Idle);
    assert_eq!((vlc.launches(), mpv.launches()), (1, 1));
    let PlayerEvent::Failed { video_id, message } = &failed[0] else {
        panic!("expected a failure, got {failed:?}");
    };
    assert_eq!(video_id.as_str(), "fast");
    assert!(message.contains("not found"), "{message}");

    for (id, needle) in [("empty", "no playable format"), ("broken", "connection reset")] {
        playback.play(id, 0);
        let mut seen = Vec::new();
        assert!(
            eventually(|| {
                events.drain(|e| seen.push(e));
                !seen.is_empty()
            })
            .await
        );
        assert!(
            matches!(&seen[0], PlayerEvent::Failed { message, .. } if message.contains(needle)),
            "{seen:?}"
        );
        assert_eq!(playback.status().state, PlaybackState::Idle);
    }
}

#[tokio::test]
async fn test_controls_without_session_are_ignored() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness { playback, .. } = harness(&[vlc.clone()]);

    playback.pause();
    playback.resume();
    playback.seek(10);
    playback.set_volume(50);
    playback.toggle_mute();
    playback.toggle_fullscreen();

    let status = playback.status();
    assert_eq!(status.state, PlaybackState::Idle);
    assert_eq!(status.volume, 100);
    assert!(!status.muted);
    assert!(vlc.commands().is_empty());
}

#[tokio::test]
async fn test_volume_mute_and_fullscreen() {
    let vlc = FakePlayer::sleeper(PlayerKind::Vlc);
    let Harness { playback, .. } = harness(&[vlc.clone()]);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;

    playback.set_volume(60);
    playback.set_volume(101);
    playback.toggle_mute();
    assert!(playback.status().muted);
    playback.toggle_mute();
    playback.toggle_fullscreen();

    let status = playback.status();
    assert_eq!(status.volume, 60);
    assert!(!status.muted);
    assert!(status.is_fullscreen);
    assert!(eventually(|| vlc.commands().len() == 4).await);
    assert_eq!(vlc.commands(), vec![
        ControlCommand::Volume(60),
        ControlCommand::Volume(0),
        ControlCommand::Volume(60),
        ControlCommand::ToggleFullscreen,
    ]);

    // Fullscreen carries over to the next launch.
    playback.play("fast", 0);
    assert!(eventually(|| vlc.requests().len() == 2).await);
    assert!(vlc.requests()[1].fullscreen);
    playback.cleanup().await;
}

#[tokio::test]
async fn test_positions_reach_the_ui() {
    let vlc = FakePlayer::reporting(PlayerKind::Vlc);
    let Harness {
        playback,
        mut events,
        ..
    } = harness(&[vlc]);

    playback.play("fast", 0);
    reach(&playback, PlaybackState::Playing).await;
    let session = playback.status().session.unwrap();

    let mut samples = Vec::new();
    assert!(
        eventually(|| {
            events.drain(|e| {
                if let PlayerEvent::Position(sample) = e {
                    samples.push(sample);
                }
            });
            !samples.is_empty()
        })
        .await
    );
    assert_eq!(samples[0].session, session);
    assert_eq!(samples[0].clock(), "00:12 / 04:00");

    playback.cleanup().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        drain(&mut events)
            .iter()
            .all(|e| !matches!(e, PlayerEvent::Position(_)))
    );
}
