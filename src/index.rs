//! In-memory vector index.
//!
//! Stores (embedding, chunk) entries and answers nearest-neighbor queries
//! by brute-force cosine similarity. The index is immutable after build;
//! re-indexing means building a fresh one and dropping the old handle.

use crate::embedding::{check_dims, cosine_similarity, embed_query, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug)]
struct IndexEntry {
    embedding: Vec<f32>,
    chunk: Chunk,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dims: usize,
}

impl VectorIndex {
    /// Embed every chunk (in `batch_size` batches) and build the index.
    ///
    /// Fails with `EmptyCorpus` for an empty chunk list and `Embedding` if
    /// the provider fails or returns vectors of the wrong dimensionality.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        let batch_size = batch_size.max(1);
        let dims = provider.dims();

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = provider.embed(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(PipelineError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            check_dims(&vectors, dims)?;
            embeddings.extend(vectors);
        }

        let entries = embeddings
            .into_iter()
            .zip(chunks)
            .map(|(embedding, chunk)| IndexEntry { embedding, chunk })
            .collect();

        Ok(Self { entries, dims })
    }

    /// Embed `text` with the same provider used at build time and return
    /// the `k` most similar chunks in descending similarity order. Returns
    /// fewer than `k` results when the index holds fewer entries.
    pub async fn query(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        k: i64,
    ) -> Result<Vec<ScoredChunk>> {
        if k <= 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "k must be >= 1, got {k}"
            )));
        }
        if provider.dims() != self.dims {
            return Err(PipelineError::Embedding(format!(
                "query provider dims {} do not match index dims {}",
                provider.dims(),
                self.dims
            )));
        }

        let query_vec = embed_query(provider, text).await?;
        check_dims(std::slice::from_ref(&query_vec), self.dims)?;

        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&query_vec, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k as usize);

        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
