// Single-worker execution context
//
// Runs one request at a time off the caller's thread. The busy flag is
// visible to the caller (a UI disables its trigger control on it) and only
// clears after the outcome callback has returned, so overlapping requests
// are rejected rather than interleaved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::models::DownloadRequest;
use super::orchestrator::Orchestrator;
use super::traits::{OutcomeCallback, ProgressCallback};

#[derive(Debug, Error)]
#[error("a download is already in progress")]
pub struct WorkerBusy;

pub struct DownloadWorker {
    orchestrator: Arc<Orchestrator>,
    busy: Arc<AtomicBool>,
}

impl DownloadWorker {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Hand one request to the worker. Rejected while another request is
    /// in flight. Callbacks run on the worker's context; marshalling to a
    /// UI thread is the caller's concern.
    pub fn submit(
        &self,
        request: DownloadRequest,
        on_progress: ProgressCallback,
        on_outcome: OutcomeCallback,
    ) -> Result<(), WorkerBusy> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(WorkerBusy);
        }

        info!(url = %request.url, "request accepted");
        let orchestrator = Arc::clone(&self.orchestrator);
        let busy = Arc::clone(&self.busy);
        tokio::spawn(async move {
            let guarded: OutcomeCallback = Box::new(move |outcome| {
                on_outcome(outcome);
                busy.store(false, Ordering::SeqCst);
            });
            orchestrator.execute(request, on_progress, guarded).await;
        });
        Ok(())
    }
}
