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

use std::path::PathBuf;

use raspytube_error::{ErrorExt, StatusCode};
use snafu::Snafu;

/// Failure reported by a stream extraction backend.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum BackendError {
    #[snafu(display("video unavailable: {reason}"))]
    Unavailable {
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
    #[snafu(display("extraction request failed: {message}"))]
    Request {
        message: String,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
    #[snafu(display("failed to run extractor {program}"))]
    Extractor {
        program: String,
        source:  std::io::Error,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
    #[snafu(display("failed to decode extractor output"))]
    Decode {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ResolveError {
    #[snafu(display("video {video_id} not found"))]
    NotFound {
        video_id: String,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },
    #[snafu(display("could not resolve streams for {video_id}"))]
    Network {
        video_id: String,
        source:   BackendError,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },
    #[snafu(display("no playable format for {video_id}"))]
    NoPlayableFormat {
        video_id: String,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },
    #[snafu(display("resolution of {video_id} was cancelled"))]
    Cancelled {
        video_id: String,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum LaunchError {
    #[snafu(display("player binary `{program}` not found"))]
    BinaryNotFound {
        program: String,
        source:  std::io::Error,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
    #[snafu(display("failed to spawn player `{program}`"))]
    Spawn {
        program: String,
        source:  std::io::Error,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
}

impl LaunchError {
    /// Only a missing binary is worth retrying with the other player.
    pub const fn is_binary_not_found(&self) -> bool { matches!(self, Self::BinaryNotFound { .. }) }
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ControlError {
    #[snafu(display("player did not answer `{command}` in time"))]
    Timeout {
        command: String,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
    #[snafu(display("player control endpoint unreachable for `{command}`"))]
    Unreachable {
        command: String,
        source:  reqwest::Error,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
    #[snafu(display("malformed player status: {reason}"))]
    MalformedStatus {
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

/// Why a `play()` request ended without a running player.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum PlaybackError {
    #[snafu(transparent)]
    Resolve {
        source: ResolveError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
    #[snafu(transparent)]
    Launch {
        source: LaunchError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("Failed to read config file {}", path.display()))]
    Read {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
    #[snafu(display("Failed to parse config file {}", path.display()))]
    Parse {
        path:   PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

impl ErrorExt for ResolveError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::Network { .. } | Self::NoPlayableFormat { .. } | Self::Cancelled { .. } => {
                StatusCode::Unavailable
            }
        }
    }
}

impl ErrorExt for LaunchError {
    fn status_code(&self) -> StatusCode { StatusCode::Unavailable }
}

impl ErrorExt for ControlError {
    fn status_code(&self) -> StatusCode { StatusCode::Unavailable }
}

impl ErrorExt for PlaybackError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Resolve { source, .. } => source.status_code(),
            Self::Launch { source, .. } => source.status_code(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode { StatusCode::InvalidArgument }
}
