// ffmpeg backend: audio transcoding to MP3

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::downloader::errors::DownloadError;
use crate::downloader::tools::{self, ToolKind};
use crate::downloader::traits::AudioTranscoder;

pub struct FfmpegTranscoder {
    binary_override: Option<String>,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            binary_override: None,
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary_override: Some(binary.into()),
        }
    }

    fn binary(&self) -> Option<String> {
        self.binary_override
            .clone()
            .or_else(|| tools::find_binary(ToolKind::Ffmpeg))
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Output path derived by swapping the extension to .mp3
fn mp3_output_path(input: &Path) -> PathBuf {
    input.with_extension("mp3")
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        self.binary().is_some()
    }

    async fn convert(&self, input: &Path) -> Result<PathBuf, DownloadError> {
        let binary = self
            .binary()
            .ok_or_else(|| DownloadError::MissingDependency("ffmpeg not found".to_string()))?;
        let output_path = mp3_output_path(input);
        debug!(input = %input.display(), output = %output_path.display(), "running ffmpeg");

        let output = Command::new(binary)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| DownloadError::ConversionError(format!("ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("ffmpeg failed")
                .to_string();
            return Err(DownloadError::ConversionError(detail));
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_swaps_extension() {
        assert_eq!(
            mp3_output_path(Path::new("/tmp/track.m4a")),
            PathBuf::from("/tmp/track.mp3")
        );
        assert_eq!(
            mp3_output_path(Path::new("/tmp/no_ext")),
            PathBuf::from("/tmp/no_ext.mp3")
        );
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let transcoder = FfmpegTranscoder::with_binary("ffmpeg");
        // An explicit override is always treated as present
        assert!(transcoder.is_available());
    }
}
