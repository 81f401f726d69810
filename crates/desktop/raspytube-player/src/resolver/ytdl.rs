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

use rusty_ytdl::{Video, VideoError, VideoFormat};

use super::{Extraction, StreamBackend, StreamCandidate};
use crate::err::{BackendError, RequestSnafu, UnavailableSnafu};

/// In-process extraction through `rusty_ytdl`.
///
/// `rusty_ytdl` has no notion of a single "best" URL, so `best_url` is
/// always `None` and selection relies on the formats list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustyYtdlBackend;

#[async_trait::async_trait]
impl StreamBackend for RustyYtdlBackend {
    fn name(&self) -> &'static str { "rusty_ytdl" }

    async fn extract(&self, watch_url: &str) -> Result<Extraction, BackendError> {
        let video = Video::new(watch_url).map_err(map_video_error)?;
        let info = video.get_info().await.map_err(map_video_error)?;
        Ok(Extraction {
            formats:  info.formats.iter().map(to_candidate).collect(),
            best_url: None,
        })
    }
}

fn to_candidate(format: &VideoFormat) -> StreamCandidate {
    StreamCandidate {
        url:       format.url.clone(),
        height:    format
            .height
            .and_then(|h| u32::try_from(h).ok())
            .unwrap_or_default(),
        has_audio: format.has_audio,
        has_video: format.has_video,
    }
}

fn map_video_error(err: VideoError) -> BackendError {
    match err {
        VideoError::VideoNotFound => UnavailableSnafu {
            reason: err.to_string(),
        }
        .build(),
        other => RequestSnafu {
            message: other.to_string(),
        }
        .build(),
    }
}
