// Error taxonomy for the download workflow

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category attached to a failure outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Bad URL, network error, or video unavailable during resolution
    ResolutionFailed,
    /// No stream matches the requested filters
    StreamUnavailable,
    /// Required external transcoder is absent
    MissingDependency,
    /// Stream transfer failed mid-flight
    TransferError,
    /// Post-transfer audio conversion failed
    ConversionError,
}

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("failed to resolve source: {0}")]
    ResolutionFailed(String),

    #[error("requested stream not available: {0}")]
    StreamUnavailable(String),

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("transfer failed: {0}")]
    TransferError(String),

    #[error("conversion failed: {0}")]
    ConversionError(String),
}

impl DownloadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ResolutionFailed(_) => FailureKind::ResolutionFailed,
            Self::StreamUnavailable(_) => FailureKind::StreamUnavailable,
            Self::MissingDependency(_) => FailureKind::MissingDependency,
            Self::TransferError(_) => FailureKind::TransferError,
            Self::ConversionError(_) => FailureKind::ConversionError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = DownloadError::StreamUnavailable("720p".to_string());
        assert_eq!(err.kind(), FailureKind::StreamUnavailable);
        assert_eq!(err.to_string(), "requested stream not available: 720p");
    }
}
