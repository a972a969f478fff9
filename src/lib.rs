pub mod downloader;

pub use downloader::backends::{FfmpegTranscoder, ResolverConfig, YtDlpResolver};
pub use downloader::{
    Container, DownloadError, DownloadOutcome, DownloadRequest, DownloadWorker, FailureKind,
    MediaStream, Orchestrator, ResolutionSelector, ResolutionTier, StreamKind, TransferProgress,
    WorkerBusy,
};
