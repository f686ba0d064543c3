use std::sync::Arc;

use thiserror::Error;

use crate::signature::ExtractError;

#[derive(Error, Debug)]
pub enum HlsGateError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Upstream rejected the request for video {0}")]
    InvalidRequest(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Expected exactly one stream with itag {itag}, found {found}")]
    FormatNotFound { itag: String, found: usize },

    #[error("Stream {0} has no segment index range")]
    MissingSegmentIndex(String),

    #[error("Signature program extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Signature decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid segment index: {0}")]
    SegmentIndex(#[from] hlsgate_sidx::SidxError),

    #[error("Stream resolution panicked: {0}")]
    ResolutionPanicked(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    /// An outcome observed by more than one waiter.
    #[error(transparent)]
    Shared(#[from] Arc<HlsGateError>),
}

pub type HlsGateResult<T> = Result<T, HlsGateError>;
