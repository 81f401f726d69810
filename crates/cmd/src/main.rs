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

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use raspytube_common_telemetry::{LoggingOptions, init_global_logging, set_panic_hook};
use raspytube_error::ErrorExt;
use raspytube_player::{Playback, PlayerConfig, PlayerKind, VideoId, resolver::StreamResolver};
use snafu::{ResultExt, Whatever, whatever};
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{info, warn};

mod build_info;
mod interactive;

use interactive::Command;

/// How often the terminal UI drains player events.
const UI_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[clap(
name = "raspytube",
about= "Play YouTube videos in VLC or mpv",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    /// Player config file, `player.json` in the config directory by default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep config and logs under this directory instead of the platform
    /// defaults.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter such as `info` or `raspytube_player=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to stdout.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Play(PlayArgs),
    Resolve(ResolveArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Plays a video in an external player and reads commands from stdin.
Examples:

raspytube play dQw4w9WgXcQ
raspytube play dQw4w9WgXcQ --start 42 --player mpv --fullscreen

")]
struct PlayArgs {
    video_id: String,

    /// Start offset in seconds.
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Player to try first, overriding the config.
    #[arg(long)]
    player: Option<PlayerKind>,

    #[arg(long)]
    fullscreen: bool,
}

impl PlayArgs {
    async fn run(self, mut config: PlayerConfig) -> Result<(), Whatever> {
        if let Some(player) = self.player {
            config.preferred_player = player;
        }
        config.fullscreen |= self.fullscreen;

        let (playback, mut events) = Playback::new(config, Handle::current());
        let mut input = Some(spawn_stdin_reader()?);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut tick = tokio::time::interval(UI_TICK);

        println!("{}", interactive::HELP);
        playback.play(self.video_id, self.start);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    if let Err(e) = result {
                        warn!("failed to listen for ctrl-c: {e}");
                    }
                    info!("interrupted");
                    break;
                }
                _ = tick.tick() => {
                    events.drain(interactive::render);
                }
                line = recv_line(&mut input) => {
                    let Some(line) = line else {
                        // Without stdin only Ctrl-C ends playback.
                        input = None;
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(command) => {
                            if !interactive::apply(&playback, command) {
                                break;
                            }
                        }
                        Err(e) => println!("{e}; {}", interactive::HELP),
                    }
                }
            }
        }

        playback.cleanup().await;
        events.drain(interactive::render);
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Prints the stream URL that would be handed to the player.
Examples:

raspytube resolve dQw4w9WgXcQ

")]
struct ResolveArgs {
    video_id: String,
}

impl ResolveArgs {
    async fn run(self, config: PlayerConfig) -> Result<(), Whatever> {
        let resolver = StreamResolver::from_config(&config);
        match resolver.resolve(&VideoId::from(self.video_id)).await {
            Ok(candidate) => {
                println!(
                    "{}p audio={} video={}",
                    candidate.height, candidate.has_audio, candidate.has_video
                );
                println!("{}", candidate.url);
                Ok(())
            }
            Err(e) => whatever!("{}", e.output_msg()),
        }
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Prints the effective player config as JSON.
Examples:

raspytube config > ~/.config/raspytube/player.json

")]
struct ConfigArgs {
    /// Print where the config file is read from instead.
    #[arg(long)]
    path: bool,
}

impl ConfigArgs {
    fn run(&self, path: &std::path::Path, config: &PlayerConfig) -> Result<(), Whatever> {
        if self.path {
            println!("{}", path.display());
            return Ok(());
        }
        let json =
            serde_json::to_string_pretty(config).whatever_context("failed to encode config")?;
        println!("{json}");
        Ok(())
    }
}

/// Reads stdin on its own thread; a blocked read must not hold up shutdown.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>, Whatever> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("failed to read stdin: {e}");
                        break;
                    }
                }
            }
        })
        .whatever_context("failed to spawn stdin reader")?;
    Ok(rx)
}

async fn recv_line(input: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    if let Some(dir) = &cli.data_dir {
        raspytube_paths::set_custom_data_dir(dir);
    }

    set_panic_hook();
    let _guards = init_global_logging(
        &LoggingOptions::builder()
            .dir(raspytube_paths::logs_dir().to_string_lossy())
            .maybe_level(cli.log_level.clone())
            .append_stdout(cli.verbose)
            .build(),
    );
    info!("========== {} ==========", build_info::banner());

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| raspytube_paths::player_config_file().clone());
    let config = match PlayerConfig::load(&config_path).await {
        Ok(config) => config,
        Err(e) => whatever!("{}", e.output_msg()),
    };

    match cli.commands {
        Commands::Play(args) => args.run(config).await,
        Commands::Resolve(args) => args.run(config).await,
        Commands::Config(args) => args.run(&config_path, &config),
    }
}
