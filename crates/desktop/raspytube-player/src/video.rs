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

use std::fmt;

use serde::{Deserialize, Serialize};

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Opaque identifier of a remote video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Canonical watch page URL handed to the extraction backend.
    pub fn watch_url(&self) -> String { format!("{WATCH_URL_PREFIX}{}", self.0) }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self { Self::new(value) }
}

/// A video as delivered by the metadata client. Only `video_id` matters for
/// playback; the rest is display data carried along for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id:      VideoId,
    pub title:         String,
    #[serde(default)]
    pub channel_name:  String,
    #[serde(default)]
    pub view_count:    String,
    #[serde(default)]
    pub thumbnail_url: String,
}
