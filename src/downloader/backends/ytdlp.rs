// yt-dlp backend: manifest resolution and stream transfer

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaStream, ResolutionTier, StreamKind};
use crate::downloader::tools::{self, ToolKind};
use crate::downloader::traits::{ChunkCallback, StreamResolver};

// Byte-level progress lines requested via --progress-template
const PROGRESS_TEMPLATE: &str = "download:vg-progress %(progress.downloaded_bytes)s";

lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(r"^vg-progress\s+(\d+)").unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref ALREADY_RE: Regex =
        Regex::new(r"\[download\]\s+(.+)\s+has already been downloaded").unwrap();
}

/// Configuration for the yt-dlp backend
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Override the detected yt-dlp binary
    pub binary: Option<String>,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Socket timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: None,
            proxy: None,
            timeout_seconds: 30,
        }
    }
}

impl ResolverConfig {
    pub fn with_binary(mut self, binary: Option<String>) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

pub struct YtDlpResolver {
    config: ResolverConfig,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    fn binary(&self) -> String {
        self.config
            .binary
            .clone()
            .or_else(|| tools::find_binary(ToolKind::YtDlp))
            .unwrap_or_else(|| "yt-dlp".to_string())
    }

    fn network_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args.push("--socket-timeout".to_string());
        args.push(self.config.timeout_seconds.to_string());
        args
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<Vec<MediaStream>, DownloadError> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.network_args());
        args.push(url.to_string());

        let output = Command::new(self.binary())
            .args(&args)
            .output()
            .await
            .map_err(|e| DownloadError::ResolutionFailed(format!("yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::ResolutionFailed(tail(&stderr)));
        }

        let manifest: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::ResolutionFailed(format!("manifest parse: {}", e)))?;
        Ok(parse_manifest(&manifest))
    }

    async fn transfer(
        &self,
        url: &str,
        stream: &MediaStream,
        dest_dir: &Path,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<PathBuf, DownloadError> {
        let dest = dest_dir.to_string_lossy().into_owned();
        let mut args = vec![
            "-f".to_string(),
            stream.format_id.clone(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "-P".to_string(),
            dest,
            "-o".to_string(),
            "%(title)s.%(ext)s".to_string(),
        ];
        args.extend(self.network_args());
        args.push(url.to_string());

        let mut child = Command::new(self.binary())
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DownloadError::TransferError(format!("yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::TransferError("no stdout from yt-dlp".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::TransferError("no stderr from yt-dlp".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut destination: Option<PathBuf> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| DownloadError::TransferError(format!("read yt-dlp output: {}", e)))?
        {
            if let Some(bytes) = parse_progress_line(&line) {
                on_chunk(bytes);
            } else if let Some(path) = parse_destination_line(&line) {
                debug!(path = %path.display(), "destination reported");
                destination = Some(path);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::TransferError(format!("wait for yt-dlp: {}", e)))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(code = ?status.code(), "yt-dlp exited with error");
            return Err(DownloadError::TransferError(tail(&stderr_text)));
        }

        destination
            .ok_or_else(|| DownloadError::TransferError("yt-dlp reported no destination".to_string()))
    }
}

/// Downloaded byte count from a --progress-template line
fn parse_progress_line(line: &str) -> Option<u64> {
    PROGRESS_RE
        .captures(line.trim())
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
}

/// Written file path from yt-dlp's destination / already-downloaded lines
fn parse_destination_line(line: &str) -> Option<PathBuf> {
    if let Some(caps) = DEST_RE.captures(line) {
        return caps.get(1).map(|m| PathBuf::from(m.as_str().trim()));
    }
    if let Some(caps) = ALREADY_RE.captures(line) {
        return caps.get(1).map(|m| PathBuf::from(m.as_str().trim()));
    }
    None
}

/// Build MediaStreams out of a yt-dlp --dump-json manifest
fn parse_manifest(manifest: &serde_json::Value) -> Vec<MediaStream> {
    let formats = match manifest["formats"].as_array() {
        Some(formats) => formats,
        None => return Vec::new(),
    };

    let mut streams = Vec::new();
    for format in formats {
        let format_id = match format["format_id"].as_str() {
            Some(id) => id.to_string(),
            None => continue,
        };
        let has_video = codec_present(&format["vcodec"]);
        let has_audio = codec_present(&format["acodec"]);
        let kind = match (has_video, has_audio) {
            (true, true) => StreamKind::Progressive,
            (true, false) => StreamKind::VideoOnly,
            (false, true) => StreamKind::AudioOnly,
            // Storyboards and other non-media entries
            (false, false) => continue,
        };

        streams.push(MediaStream {
            format_id,
            container_ext: format["ext"].as_str().unwrap_or("").to_string(),
            kind,
            resolution: format["height"]
                .as_u64()
                .and_then(|h| ResolutionTier::from_height(h as u32)),
            abr_kbps: format["abr"].as_f64().map(|b| b as f32),
            filesize: format["filesize"]
                .as_u64()
                .or_else(|| format["filesize_approx"].as_u64()),
        });
    }
    streams
}

fn codec_present(value: &serde_json::Value) -> bool {
    match value.as_str() {
        Some(codec) => codec != "none" && !codec.is_empty(),
        None => false,
    }
}

/// Last few lines of tool output, enough for a dialog message
fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(3);
    let joined = lines[start..].join("\n");
    if joined.is_empty() {
        "no output".to_string()
    } else {
        joined
    }
}
