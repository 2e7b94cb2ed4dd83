//! Core data types that flow through the retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum characters of chunk text shown in a citation preview.
pub const PREVIEW_CHARS: usize = 300;

/// A loaded document: one `.txt` file, or one page of a `.pdf` file.
/// Immutable once produced by a loader.
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw text content.
    pub content: String,
    /// Source filename (no directory component).
    pub source: String,
    /// 1-based page number for paginated sources.
    pub page: Option<u32>,
}

/// A contiguous slice of a document's content, bounded by the configured
/// chunk size. Consecutive chunks from the same document share exactly
/// `chunk_overlap` characters; the final chunk may be shorter.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    /// Source filename inherited from the document, kept for citation.
    pub source: String,
    pub page: Option<u32>,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: usize,
}

/// A retrieved chunk paired with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Citation handed back to the caller alongside an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub name: String,
    /// First [`PREVIEW_CHARS`] characters of the grounding chunk.
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub score: f32,
}

impl SourceRef {
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        let preview: String = scored.chunk.text.chars().take(PREVIEW_CHARS).collect();
        SourceRef {
            name: scored.chunk.source.clone(),
            preview,
            page: scored.chunk.page,
            score: scored.score,
        }
    }
}

/// A composed answer paired with the exact ordered chunks that grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Descending-similarity order, matching what the composer saw.
    pub sources: Vec<SourceRef>,
}

/// One question/answer turn kept in the session history.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}
