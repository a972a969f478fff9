// Download orchestration: models, selection policy, workflow, worker, backends

pub mod backends;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod selector;
pub mod tools;
pub mod traits;
pub mod worker;

pub use errors::{DownloadError, FailureKind};
pub use models::{
    Container, DownloadOutcome, DownloadRequest, MediaStream, ResolutionSelector, ResolutionTier,
    StreamKind, TransferProgress,
};
pub use orchestrator::Orchestrator;
pub use traits::{AudioTranscoder, StreamResolver};
pub use worker::{DownloadWorker, WorkerBusy};
