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

//! Line commands typed while `raspytube play` is running.

use std::{
    io::{self, Write},
    num::ParseIntError,
    str::FromStr,
};

use raspytube_player::{Playback, PlayerEvent};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

pub const HELP: &str = "commands: pause | resume | seek <seconds> | volume <0-100> | mute | \
                        fullscreen | stop | play <video id> | status | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Seek(u64),
    Volume(u8),
    Mute,
    Fullscreen,
    Stop,
    Play(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Snafu)]
pub enum ParseCommandError {
    #[snafu(display("unknown command `{input}`"))]
    Unknown { input: String },
    #[snafu(display("`{command}` needs an argument"))]
    MissingArgument { command: &'static str },
    #[snafu(display("`{command}` takes a number"))]
    InvalidNumber {
        command: &'static str,
        source:  ParseIntError,
    },
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let mut argument = |command: &'static str| {
            words.next().context(MissingArgumentSnafu { command })
        };
        let command = match name.as_str() {
            "pause" | "p" => Self::Pause,
            "resume" | "r" => Self::Resume,
            "seek" => {
                let seconds = argument("seek")?;
                Self::Seek(seconds.parse().context(InvalidNumberSnafu { command: "seek" })?)
            }
            "volume" | "vol" => {
                let level = argument("volume")?;
                Self::Volume(level.parse().context(InvalidNumberSnafu { command: "volume" })?)
            }
            "mute" | "m" => Self::Mute,
            "fullscreen" | "f" => Self::Fullscreen,
            "stop" | "s" => Self::Stop,
            "play" => Self::Play(argument("play")?.to_string()),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => {
                return UnknownSnafu {
                    input: line.trim(),
                }
                .fail();
            }
        };
        Ok(command)
    }
}

/// Applies `command` to `playback`. Returns false when the user asked to
/// quit.
pub fn apply(playback: &Playback, command: Command) -> bool {
    match command {
        Command::Pause => playback.pause(),
        Command::Resume => playback.resume(),
        Command::Seek(seconds) => playback.seek(seconds),
        Command::Volume(level) if level > 100 => println!("volume goes from 0 to 100"),
        Command::Volume(level) => playback.set_volume(level),
        Command::Mute => playback.toggle_mute(),
        Command::Fullscreen => playback.toggle_fullscreen(),
        Command::Stop => playback.stop(),
        Command::Play(video_id) => playback.play(video_id, 0),
        Command::Status => {
            let status = playback.status();
            println!(
                "{} {} via {} ({}), volume {}{}",
                status.state,
                status
                    .video_id
                    .as_ref()
                    .map_or("-", |id| id.as_str()),
                status
                    .player_kind
                    .map_or_else(|| "-".to_string(), |k| k.to_string()),
                status
                    .role
                    .map_or_else(|| "-".to_string(), |r| r.to_string()),
                status.volume,
                if status.muted { " (muted)" } else { "" }
            );
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

/// Prints one event for the user. Failures go to stderr.
pub fn render(event: PlayerEvent) {
    let result = if matches!(event, PlayerEvent::Failed { .. }) {
        write_event(&mut io::stderr().lock(), &event)
    } else {
        write_event(&mut io::stdout().lock(), &event)
    };
    if let Err(e) = result {
        debug!("failed to print player event: {e}");
    }
}

/// Position updates rewrite the current line and are flushed right away.
fn write_event(out: &mut impl Write, event: &PlayerEvent) -> io::Result<()> {
    match event {
        PlayerEvent::Started {
            session,
            video_id,
            kind,
            role,
        } => writeln!(out, "playing {video_id} in {kind} ({role}, session {session})"),
        PlayerEvent::Position(sample) => {
            write!(out, "\r{}  ", sample.clock())?;
            out.flush()
        }
        PlayerEvent::Failed { video_id, message } => {
            writeln!(out, "\ncannot play {video_id}: {message}")
        }
        PlayerEvent::Stopped { session } => writeln!(out, "\nstopped session {session}"),
    }
}
