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

use std::process::Stdio;

use serde::Deserialize;
use snafu::ResultExt;
use tokio::process::Command;
use tracing::debug;

use super::{Extraction, StreamBackend, StreamCandidate};
use crate::err::{BackendError, DecodeSnafu, ExtractorSnafu, RequestSnafu, UnavailableSnafu};

/// Phrases yt-dlp prints when the video itself cannot be served.
const UNAVAILABLE_MARKERS: [&str; 4] = [
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Incomplete YouTube ID",
];

/// Extraction by running `yt-dlp -J` and reading its JSON dump.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    program: String,
}

impl YtDlpBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl StreamBackend for YtDlpBackend {
    fn name(&self) -> &'static str { "yt-dlp" }

    async fn extract(&self, watch_url: &str) -> Result<Extraction, BackendError> {
        let output = Command::new(&self.program)
            .args(["-J", "--no-warnings", "--no-playlist", watch_url])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context(ExtractorSnafu {
                program: self.program.as_str(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(status = %output.status, %stderr, "yt-dlp failed");
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited without output")
                .trim()
                .to_string();
            if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
                return UnavailableSnafu { reason }.fail();
            }
            return RequestSnafu { message: reason }.fail();
        }

        parse_dump(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct Dump {
    #[serde(default)]
    formats: Vec<DumpFormat>,
    url:     Option<String>,
}

#[derive(Debug, Deserialize)]
struct DumpFormat {
    url:    Option<String>,
    height: Option<u32>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

/// A stream is present unless yt-dlp explicitly reports its codec as
/// `"none"`; an absent codec field counts as present.
fn codec_present(codec: Option<&str>) -> bool { codec != Some("none") }

fn parse_dump(raw: &[u8]) -> Result<Extraction, BackendError> {
    let dump: Dump = serde_json::from_slice(raw).context(DecodeSnafu)?;
    let formats = dump
        .formats
        .into_iter()
        .filter_map(|f| {
            let url = f.url?;
            Some(StreamCandidate {
                url,
                height: f.height.unwrap_or_default(),
                has_audio: codec_present(f.acodec.as_deref()),
                has_video: codec_present(f.vcodec.as_deref()),
            })
        })
        .collect();
    Ok(Extraction {
        formats,
        best_url: dump.url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::select_candidate;

    #[test]
    fn parses_formats_and_codec_flags() {
        let raw = br#"{
            "id": "dQw4w9WgXcQ",
            "formats": [
                {"format_id": "140", "url": "audio", "acodec": "mp4a.40.2", "vcodec": "none"},
                {"format_id": "137", "url": "hd", "height": 1080, "acodec": "none", "vcodec": "avc1"},
                {"format_id": "18", "url": "sd", "height": 360, "acodec": "mp4a.40.2", "vcodec": "avc1"},
                {"format_id": "sb0", "height": 90}
            ]
        }"#;
        let extraction = parse_dump(raw).unwrap();
        assert_eq!(extraction.formats.len(), 3);
        assert_eq!(extraction.best_url, None);

        let audio = &extraction.formats[0];
        assert!(audio.has_audio && !audio.has_video);
        assert_eq!(audio.height, 0);

        assert_eq!(select_candidate(extraction, 720).unwrap().url, "sd");
    }

    #[test]
    fn missing_codec_fields_count_as_present() {
        let raw = br#"{"formats": [{"url": "plain", "height": 480}], "url": "top"}"#;
        let extraction = parse_dump(raw).unwrap();
        assert!(extraction.formats[0].has_audio && extraction.formats[0].has_video);
        assert_eq!(extraction.best_url.as_deref(), Some("top"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            parse_dump(b"ERROR: nope"),
            Err(BackendError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_an_extractor_error() {
        let backend = YtDlpBackend::new("raspytube-test-no-such-ytdlp");
        let err = backend
            .extract("https://www.youtube.com/watch?v=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Extractor { .. }));
    }
}
