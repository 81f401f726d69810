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

//! Turns a video id into one directly playable stream URL.
//!
//! Extraction itself is delegated to a [`StreamBackend`]; this module only
//! owns the selection policy and the error mapping.

pub mod ytdl;
pub mod ytdlp;

use std::sync::Arc;

use snafu::{IntoError, OptionExt};
use tracing::{debug, info, instrument, warn};

pub use self::{ytdl::RustyYtdlBackend, ytdlp::YtDlpBackend};
use crate::{
    config::{PlayerConfig, ResolverBackend},
    err::{BackendError, NetworkSnafu, NoPlayableFormatSnafu, NotFoundSnafu, ResolveError},
    video::VideoId,
};

/// One rendition offered by the extraction backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub url:       String,
    /// Vertical resolution, `0` when the backend does not report one.
    pub height:    u32,
    pub has_audio: bool,
    pub has_video: bool,
}

impl StreamCandidate {
    const fn has_media(&self) -> bool { self.has_audio || self.has_video }

    const fn is_muxed_within(&self, max_height: u32) -> bool {
        self.has_audio && self.has_video && self.height <= max_height
    }
}

/// Raw answer of a backend for one watch URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub formats:  Vec<StreamCandidate>,
    /// The backend's own pick, used when no format qualifies.
    pub best_url: Option<String>,
}

/// A stream-extraction service. Implementations perform exactly one query
/// per call and never retry.
#[async_trait::async_trait]
pub trait StreamBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, watch_url: &str) -> Result<Extraction, BackendError>;
}

/// Picks the stream to play out of an extraction:
///
/// 1. the first candidate with audio and video no taller than `max_height`,
/// 2. otherwise the first candidate with any media,
/// 3. otherwise the backend's top-level URL.
pub fn select_candidate(extraction: Extraction, max_height: u32) -> Option<StreamCandidate> {
    let Extraction { formats, best_url } = extraction;

    if let Some(position) = formats.iter().position(|c| c.is_muxed_within(max_height)) {
        return formats.into_iter().nth(position);
    }
    if let Some(position) = formats.iter().position(StreamCandidate::has_media) {
        return formats.into_iter().nth(position);
    }
    best_url.map(|url| StreamCandidate {
        url,
        height: 0,
        has_audio: true,
        has_video: true,
    })
}

#[derive(Clone)]
pub struct StreamResolver {
    backend:    Arc<dyn StreamBackend>,
    max_height: u32,
}

impl StreamResolver {
    pub fn new(backend: Arc<dyn StreamBackend>, max_height: u32) -> Self {
        Self {
            backend,
            max_height,
        }
    }

    /// Resolver with the backend named in `config`.
    pub fn from_config(config: &PlayerConfig) -> Self {
        let backend: Arc<dyn StreamBackend> = match config.resolver_backend {
            ResolverBackend::RustyYtdl => Arc::new(RustyYtdlBackend),
            ResolverBackend::YtDlp => Arc::new(YtDlpBackend::new(config.ytdlp_program.clone())),
        };
        Self::new(backend, config.max_height)
    }

    #[instrument(skip(self), fields(backend = self.backend.name()), err(Display))]
    pub async fn resolve(&self, video_id: &VideoId) -> Result<StreamCandidate, ResolveError> {
        let watch_url = video_id.watch_url();
        let extraction = match self.backend.extract(&watch_url).await {
            Ok(extraction) => extraction,
            Err(BackendError::Unavailable { reason, .. }) => {
                warn!(%video_id, %reason, "video unavailable");
                return NotFoundSnafu {
                    video_id: video_id.as_str(),
                }
                .fail();
            }
            Err(e) => {
                return Err(NetworkSnafu {
                    video_id: video_id.as_str(),
                }
                .into_error(e));
            }
        };
        debug!(
            formats = extraction.formats.len(),
            has_best_url = extraction.best_url.is_some(),
            "extracted stream candidates"
        );

        let candidate = select_candidate(extraction, self.max_height).context(
            NoPlayableFormatSnafu {
                video_id: video_id.as_str(),
            },
        )?;
        info!(%video_id, height = candidate.height, "resolved stream");
        Ok(candidate)
    }
}
