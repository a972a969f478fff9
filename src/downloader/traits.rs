// Collaborator seams between the orchestrator and external tools

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{DownloadOutcome, MediaStream, TransferProgress};

/// Raw byte-count callback fed by a resolver while a transfer runs.
/// The orchestrator wraps this into percentage-based progress.
pub type ChunkCallback<'a> = &'a (dyn Fn(u64) + Send + Sync);

/// Caller-supplied progress observer
pub type ProgressCallback = Box<dyn Fn(TransferProgress) + Send + Sync>;

/// Caller-supplied terminal observer, invoked exactly once per request
pub type OutcomeCallback = Box<dyn FnOnce(DownloadOutcome) + Send>;

/// Resolves a source URL into selectable streams and performs the transfer
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Name of the resolver (for logging)
    fn name(&self) -> &'static str;

    /// Enumerate the streams available for a source URL
    async fn resolve(&self, url: &str) -> Result<Vec<MediaStream>, DownloadError>;

    /// Blocking transfer of one stream into `dest_dir`, reporting received
    /// byte counts through `on_chunk`. Returns the written file's path.
    async fn transfer(
        &self,
        url: &str,
        stream: &MediaStream,
        dest_dir: &Path,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<PathBuf, DownloadError>;
}

/// Converts a downloaded file to an encoded audio format
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Name of the transcoder (for logging)
    fn name(&self) -> &'static str;

    /// Whether the backing executable is present on this host
    fn is_available(&self) -> bool;

    /// Convert `input` to MP3 at a path derived from the input path
    async fn convert(&self, input: &Path) -> Result<PathBuf, DownloadError>;
}
