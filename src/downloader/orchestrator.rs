// Download orchestration workflow
//
// One request runs through: resolve -> select -> transfer -> (convert).
// Every stage error becomes a single Failure outcome; nothing is retried
// and nothing aborts the process.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::models::{Container, DownloadOutcome, DownloadRequest};
use super::progress::ProgressEmitter;
use super::selector::select_stream;
use super::traits::{AudioTranscoder, OutcomeCallback, ProgressCallback, StreamResolver};

pub struct Orchestrator {
    resolver: Box<dyn StreamResolver>,
    transcoder: Box<dyn AudioTranscoder>,
}

impl Orchestrator {
    pub fn new(resolver: Box<dyn StreamResolver>, transcoder: Box<dyn AudioTranscoder>) -> Self {
        Self {
            resolver,
            transcoder,
        }
    }

    /// Run one request to its terminal outcome. `on_progress` fires zero or
    /// more times, all before `on_outcome`, which fires exactly once.
    pub async fn execute(
        &self,
        request: DownloadRequest,
        on_progress: ProgressCallback,
        on_outcome: OutcomeCallback,
    ) {
        let outcome = match self.run(&request, on_progress).await {
            Ok(path) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                info!(file = %file_name, "download finished");
                DownloadOutcome::Success { file_name }
            }
            Err(err) => {
                warn!(error = %err, "download failed");
                DownloadOutcome::Failure {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        on_outcome(outcome);
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        on_progress: ProgressCallback,
    ) -> Result<PathBuf, DownloadError> {
        info!(url = %request.url, resolver = self.resolver.name(), "resolving source");
        let streams = self.resolver.resolve(&request.url).await?;
        debug!(count = streams.len(), "streams resolved");

        let stream = select_stream(&streams, request)?;

        // Gate the mp3 flow on the transcoder before any bytes move
        if request.container == Container::Mp3 && !self.transcoder.is_available() {
            return Err(DownloadError::MissingDependency(format!(
                "{} not found; install it to enable MP3 conversion",
                self.transcoder.name()
            )));
        }

        let emitter = ProgressEmitter::new(stream.filesize.unwrap_or(0), on_progress);
        let downloaded = self
            .resolver
            .transfer(&request.url, stream, &request.dest_dir, &|bytes| {
                emitter.on_chunk(bytes)
            })
            .await?;

        if request.container != Container::Mp3 {
            return Ok(downloaded);
        }

        info!(input = %downloaded.display(), "converting to mp3");
        let converted = self.transcoder.convert(&downloaded).await?;

        // Best-effort cleanup of the pre-conversion temp file
        if converted != downloaded {
            if let Err(err) = std::fs::remove_file(&downloaded) {
                debug!(error = %err, "temp file removal failed");
            }
        }

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::FailureKind;
    use crate::downloader::models::{
        MediaStream, ResolutionSelector, ResolutionTier, StreamKind, TransferProgress,
    };
    use crate::downloader::traits::ChunkCallback;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn progressive(id: &str, tier: ResolutionTier, size: u64) -> MediaStream {
        MediaStream {
            format_id: id.to_string(),
            container_ext: "mp4".to_string(),
            kind: StreamKind::Progressive,
            resolution: Some(tier),
            abr_kbps: None,
            filesize: Some(size),
        }
    }

    fn audio(id: &str, abr: f32, size: u64) -> MediaStream {
        MediaStream {
            format_id: id.to_string(),
            container_ext: "m4a".to_string(),
            kind: StreamKind::AudioOnly,
            resolution: None,
            abr_kbps: Some(abr),
            filesize: Some(size),
        }
    }

    struct FakeResolver {
        streams: Vec<MediaStream>,
        resolve_error: Option<String>,
        transfer_error: Option<String>,
        chunk_counts: Vec<u64>,
        file_name: String,
        transfers: Arc<AtomicUsize>,
    }

    impl FakeResolver {
        fn with_streams(streams: Vec<MediaStream>) -> Self {
            Self {
                streams,
                resolve_error: None,
                transfer_error: None,
                chunk_counts: Vec::new(),
                file_name: "clip.mp4".to_string(),
                transfers: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl StreamResolver for FakeResolver {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn resolve(&self, _url: &str) -> Result<Vec<MediaStream>, DownloadError> {
            match &self.resolve_error {
                Some(msg) => Err(DownloadError::ResolutionFailed(msg.clone())),
                None => Ok(self.streams.clone()),
            }
        }

        async fn transfer(
            &self,
            _url: &str,
            _stream: &MediaStream,
            dest_dir: &Path,
            on_chunk: ChunkCallback<'_>,
        ) -> Result<PathBuf, DownloadError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = &self.transfer_error {
                return Err(DownloadError::TransferError(msg.clone()));
            }
            for bytes in &self.chunk_counts {
                on_chunk(*bytes);
            }
            let path = dest_dir.join(&self.file_name);
            std::fs::write(&path, b"media").unwrap();
            Ok(path)
        }
    }

    struct FakeTranscoder {
        available: bool,
        conversions: Arc<AtomicUsize>,
    }

    impl FakeTranscoder {
        fn new(available: bool) -> Self {
            Self {
                available,
                conversions: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl AudioTranscoder for FakeTranscoder {
        fn name(&self) -> &'static str {
            "fake-ffmpeg"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn convert(&self, input: &Path) -> Result<PathBuf, DownloadError> {
            self.conversions.fetch_add(1, Ordering::SeqCst);
            let output = input.with_extension("mp3");
            std::fs::write(&output, b"mp3").unwrap();
            Ok(output)
        }
    }

    /// Ordered record of everything the caller observed
    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Progress(TransferProgress),
        Outcome(DownloadOutcome),
    }

    fn callbacks(
        log: &Arc<Mutex<Vec<Event>>>,
    ) -> (ProgressCallback, OutcomeCallback) {
        let progress_log = Arc::clone(log);
        let outcome_log = Arc::clone(log);
        (
            Box::new(move |p| progress_log.lock().unwrap().push(Event::Progress(p))),
            Box::new(move |o| outcome_log.lock().unwrap().push(Event::Outcome(o))),
        )
    }

    fn request(container: Container, resolution: ResolutionSelector, dir: &Path) -> DownloadRequest {
        DownloadRequest::new("https://example.com/v", container, resolution, dir)
    }

    #[tokio::test]
    async fn test_success_reports_single_outcome_after_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = FakeResolver::with_streams(vec![progressive(
            "22",
            ResolutionTier::P720,
            1000,
        )]);
        resolver.chunk_counts = vec![250, 500, 1000];
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(true)));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp4, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;

        let events = log.lock().unwrap();
        let outcomes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Outcome(_)))
            .collect();
        assert_eq!(outcomes.len(), 1);
        // Outcome is the last event observed
        assert!(matches!(events.last().unwrap(), Event::Outcome(_)));
        match events.last().unwrap() {
            Event::Outcome(DownloadOutcome::Success { file_name }) => {
                assert_eq!(file_name, "clip.mp4");
            }
            other => panic!("unexpected terminal event: {:?}", other),
        }
        // Final progress update hit exactly 100
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![25, 50, 100]);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = FakeResolver::with_streams(Vec::new());
        resolver.resolve_error = Some("video unavailable".to_string());
        let transfers = Arc::clone(&resolver.transfers);
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(true)));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp4, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Outcome(DownloadOutcome::Failure { kind, message }) => {
                assert_eq!(*kind, FailureKind::ResolutionFailed);
                assert!(message.contains("video unavailable"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_tier_yields_stream_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::with_streams(vec![
            progressive("18", ResolutionTier::P360, 500),
            progressive("135", ResolutionTier::P480, 800),
        ]);
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(true)));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(
                    Container::Mp4,
                    ResolutionSelector::Tier(ResolutionTier::P720),
                    dir.path(),
                ),
                on_progress,
                on_outcome,
            )
            .await;

        match log.lock().unwrap().last().unwrap() {
            Event::Outcome(DownloadOutcome::Failure { kind, .. }) => {
                assert_eq!(*kind, FailureKind::StreamUnavailable);
            }
            other => panic!("unexpected event: {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_mp3_without_transcoder_skips_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::with_streams(vec![audio("140", 128.0, 1000)]);
        let transfers = Arc::clone(&resolver.transfers);
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(false)));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp3, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;

        match log.lock().unwrap().last().unwrap() {
            Event::Outcome(DownloadOutcome::Failure { kind, .. }) => {
                assert_eq!(*kind, FailureKind::MissingDependency);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mp3_flow_converts_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = FakeResolver::with_streams(vec![
            audio("139", 48.0, 1000),
            audio("251", 160.0, 2000),
        ]);
        resolver.chunk_counts = vec![2000];
        resolver.file_name = "track.m4a".to_string();
        let transcoder = FakeTranscoder::new(true);
        let conversions = Arc::clone(&transcoder.conversions);
        let orchestrator = Orchestrator::new(Box::new(resolver), Box::new(transcoder));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp3, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;

        match log.lock().unwrap().last().unwrap() {
            Event::Outcome(DownloadOutcome::Success { file_name }) => {
                assert_eq!(file_name, "track.mp3");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(conversions.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("track.m4a").exists());
        assert!(dir.path().join("track.mp3").exists());
    }

    #[tokio::test]
    async fn test_transfer_error_maps_to_transfer_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver =
            FakeResolver::with_streams(vec![progressive("22", ResolutionTier::P720, 1000)]);
        resolver.transfer_error = Some("connection reset".to_string());
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(true)));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp4, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;

        match log.lock().unwrap().last().unwrap() {
            Event::Outcome(DownloadOutcome::Failure { kind, .. }) => {
                assert_eq!(*kind, FailureKind::TransferError);
            }
            other => panic!("unexpected event: {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_orchestrator_is_reusable_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let resolver =
            FakeResolver::with_streams(vec![progressive("22", ResolutionTier::P720, 1000)]);
        let orchestrator =
            Orchestrator::new(Box::new(resolver), Box::new(FakeTranscoder::new(true)));

        // First request asks for a tier that does not exist
        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(
                    Container::Mp4,
                    ResolutionSelector::Tier(ResolutionTier::P1080),
                    dir.path(),
                ),
                on_progress,
                on_outcome,
            )
            .await;
        assert!(matches!(
            log.lock().unwrap().last().unwrap(),
            Event::Outcome(DownloadOutcome::Failure { .. })
        ));

        // Second request succeeds on the same orchestrator
        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_progress, on_outcome) = callbacks(&log);
        orchestrator
            .execute(
                request(Container::Mp4, ResolutionSelector::Highest, dir.path()),
                on_progress,
                on_outcome,
            )
            .await;
        assert!(matches!(
            log.lock().unwrap().last().unwrap(),
            Event::Outcome(DownloadOutcome::Success { .. })
        ));
    }
}
