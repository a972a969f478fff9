// Common data models for the download workflow

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::FailureKind;

/// Target container chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    /// Keep the video container as delivered (progressive mp4)
    Mp4,
    /// Download best audio and transcode to MP3
    Mp3,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp4 => write!(f, "mp4"),
            Self::Mp3 => write!(f, "mp3"),
        }
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mp3" => Ok(Self::Mp3),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// Named video quality bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionTier {
    P360,
    P480,
    P720,
    P1080,
}

impl ResolutionTier {
    /// Vertical pixel count for the tier
    pub fn height(&self) -> u32 {
        match self {
            Self::P360 => 360,
            Self::P480 => 480,
            Self::P720 => 720,
            Self::P1080 => 1080,
        }
    }

    /// Map a stream height onto a tier, if it matches one exactly
    pub fn from_height(height: u32) -> Option<Self> {
        match height {
            360 => Some(Self::P360),
            480 => Some(Self::P480),
            720 => Some(Self::P720),
            1080 => Some(Self::P1080),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "360p" => Ok(Self::P360),
            "480p" => Ok(Self::P480),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            other => Err(format!("unknown resolution: {}", other)),
        }
    }
}

/// User-facing resolution choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSelector {
    /// Maximum-resolution progressive stream available
    Highest,
    /// Exactly this tier, or fail
    Tier(ResolutionTier),
    /// Audio-only stream regardless of container
    AudioOnly,
}

impl FromStr for ResolutionSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highest" => Ok(Self::Highest),
            "audio" => Ok(Self::AudioOnly),
            other => other.parse::<ResolutionTier>().map(Self::Tier),
        }
    }
}

/// One user-initiated download. Immutable once built.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub container: Container,
    pub resolution: ResolutionSelector,
    pub dest_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        container: Container,
        resolution: ResolutionSelector,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            container,
            resolution,
            dest_dir: dest_dir.into(),
        }
    }
}

/// What a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Audio and video multiplexed together
    Progressive,
    VideoOnly,
    AudioOnly,
}

/// One selectable encoded track from the resolved manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaStream {
    /// Backend format identifier (e.g. "22", "140")
    pub format_id: String,
    /// Container extension (mp4, webm, m4a)
    pub container_ext: String,
    pub kind: StreamKind,
    pub resolution: Option<ResolutionTier>,
    /// Average audio bitrate in kbps
    pub abr_kbps: Option<f32>,
    /// Total byte size, when the manifest reports one
    pub filesize: Option<u64>,
}

impl MediaStream {
    pub fn is_progressive(&self) -> bool {
        self.kind == StreamKind::Progressive
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == StreamKind::AudioOnly
    }
}

/// Snapshot of transfer completion, recomputed per received chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub bytes_received: u64,
    pub total_bytes: u64,
    /// Truncated completion percentage, 0..=100
    pub percent: u8,
}

/// Terminal result of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    Success {
        /// Base name of the final file
        file_name: String,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
