// Progress computation and emission
//
// Invariants enforced here:
// - percent = floor(bytes_received / total_bytes * 100)
// - the emitted sequence is monotonically non-decreasing
// - 100 is only reached when every byte has arrived

use std::sync::atomic::{AtomicU8, Ordering};

use super::models::TransferProgress;
use super::traits::ProgressCallback;

/// Truncated completion percentage, clamped to 0..=100
pub fn percent_of(bytes_received: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    (bytes_received.min(total_bytes) * 100 / total_bytes) as u8
}

/// Wraps the caller's progress callback for one transfer,
/// recomputing the snapshot per received chunk.
pub struct ProgressEmitter {
    total_bytes: u64,
    last_percent: AtomicU8,
    callback: ProgressCallback,
}

impl ProgressEmitter {
    pub fn new(total_bytes: u64, callback: ProgressCallback) -> Self {
        Self {
            total_bytes,
            last_percent: AtomicU8::new(0),
            callback,
        }
    }

    /// Report a chunk. A late or reordered byte count never moves
    /// the percentage backwards.
    pub fn on_chunk(&self, bytes_received: u64) {
        let raw = percent_of(bytes_received, self.total_bytes);
        let previous = self.last_percent.fetch_max(raw, Ordering::SeqCst);
        (self.callback)(TransferProgress {
            bytes_received,
            total_bytes: self.total_bytes,
            percent: previous.max(raw),
        });
    }
}
