//! Pipeline error taxonomy.
//!
//! Every failure a caller can observe maps to one variant, and
//! [`PipelineError::is_retryable`] tells a UI whether retrying without user
//! intervention can help: embedding and generation failures are transient
//! backend conditions, everything else requires the user to fix their input.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The documents directory contains no ingestible files after filtering
    /// unsupported extensions.
    #[error("no documents found in {} (supported: .pdf, .txt)", dir.display())]
    NoDocuments { dir: PathBuf },

    /// Internal guard: an index build was attempted with zero chunks.
    /// Should not surface when `NoDocuments` is checked first.
    #[error("cannot build an index from an empty chunk set")]
    EmptyCorpus,

    /// Malformed configuration or a bad call argument (e.g. `k <= 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding provider was unreachable, exhausted its retries, or
    /// returned vectors with the wrong dimensionality.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// The answer-composition call failed. The retrieved chunks are still
    /// available to the caller for logging or retry.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// A recognized document could not be read or parsed.
    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

impl PipelineError {
    /// True for transient backend failures a caller may retry automatically;
    /// false for conditions the user must correct first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Embedding(_) | PipelineError::Generation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
