//! Retrieval pipeline orchestration and change detection.
//!
//! The pipeline is a two-state machine. A session is STALE when it holds no
//! index or its recorded corpus fingerprint no longer matches the documents
//! directory, and READY otherwise. Every query first consults the
//! fingerprint gate: an unchanged corpus is served from the existing index
//! without re-embedding anything; a changed corpus triggers a full rebuild
//! (load → chunk → embed → index). Rebuilds are never incremental.
//!
//! The fingerprint hashes only the sorted set of active document filenames.
//! Editing a file in place without renaming it does not change the
//! fingerprint and will not trigger re-embedding; this coarse invalidation
//! policy is intentional.
//!
//! All cached state lives in a caller-owned [`Session`], passed by mutable
//! reference into every call. A failed rebuild returns the error without
//! touching the session, so a partially built index is never observable.

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::chunk::split_documents;
use crate::compose::AnswerComposer;
use crate::config::{validate, Config};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use crate::index::VectorIndex;
use crate::loader::{list_document_names, load_documents};
use crate::models::{Answer, Exchange, ScoredChunk, SourceRef};

/// SHA-256 hex digest over the sorted document names, concatenated.
pub fn corpus_fingerprint(names: &[String]) -> String {
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Caller-owned pipeline state: the fingerprint and index from the last
/// successful build, plus the accumulated chat history.
#[derive(Default)]
pub struct Session {
    pub fingerprint: Option<String>,
    pub index: Option<VectorIndex>,
    pub history: Vec<Exchange>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// READY means an index exists; whether it is current is decided by the
    /// pipeline's fingerprint comparison at query time.
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }
}

pub struct RetrievalPipeline {
    config: Config,
    provider: Box<dyn EmbeddingProvider>,
    rebuilds: u64,
}

impl RetrievalPipeline {
    /// Build a pipeline with the provider named in the configuration.
    pub fn new(config: Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    /// Build a pipeline around an externally supplied provider. Used by
    /// tests and by embedders not covered by the built-in providers.
    pub fn with_provider(config: Config, provider: Box<dyn EmbeddingProvider>) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            config,
            provider,
            rebuilds: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sorted names of the currently ingestible documents.
    pub fn document_names(&self) -> Result<Vec<String>> {
        list_document_names(&self.config.documents.dir)
    }

    /// Number of index builds performed over this pipeline's lifetime.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Transition the session to READY, rebuilding if the corpus changed.
    ///
    /// On any failure the session is left untouched: a stale session stays
    /// stale, and an existing index keeps serving its old fingerprint until
    /// a rebuild succeeds.
    pub async fn ensure_ready(&mut self, session: &mut Session) -> Result<()> {
        let dir = &self.config.documents.dir;
        let names = list_document_names(dir)?;
        if names.is_empty() {
            return Err(PipelineError::NoDocuments { dir: dir.clone() });
        }

        let fingerprint = corpus_fingerprint(&names);
        if session.index.is_some() && session.fingerprint.as_deref() == Some(&fingerprint) {
            tracing::debug!(%fingerprint, "corpus unchanged, serving existing index");
            return Ok(());
        }

        tracing::info!(%fingerprint, files = names.len(), "corpus changed, rebuilding index");

        let documents = load_documents(dir)?;
        let chunks = split_documents(
            &documents,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(PipelineError::NoDocuments { dir: dir.clone() });
        }

        let index =
            VectorIndex::build(self.provider.as_ref(), self.config.embedding.batch_size, chunks)
                .await?;

        tracing::info!(entries = index.len(), "index rebuilt");
        self.rebuilds += 1;
        session.index = Some(index);
        session.fingerprint = Some(fingerprint);
        Ok(())
    }

    /// Retrieve the `k` chunks most similar to `text`, rebuilding first if
    /// the corpus changed.
    pub async fn query(
        &mut self,
        session: &mut Session,
        text: &str,
        k: i64,
    ) -> Result<Vec<ScoredChunk>> {
        self.ensure_ready(session).await?;
        let index = session.index.as_ref().ok_or(PipelineError::EmptyCorpus)?;
        index.query(self.provider.as_ref(), text, k).await
    }

    /// Answer a question grounded in the `top_k` most relevant chunks.
    ///
    /// The returned [`Answer`] always carries the exact ordered sources the
    /// composer saw. A composition failure surfaces as `Generation` and
    /// leaves the session READY, so a retry skips straight to retrieval.
    pub async fn ask(
        &mut self,
        session: &mut Session,
        composer: &dyn AnswerComposer,
        question: &str,
    ) -> Result<Answer> {
        let top_k = self.config.retrieval.top_k;
        let retrieved = self.query(session, question, top_k).await?;

        let text = match composer.compose(question, &retrieved).await {
            Ok(text) => text,
            Err(e) => {
                for scored in &retrieved {
                    tracing::debug!(
                        source = %scored.chunk.source,
                        score = scored.score,
                        "retrieved chunk held for retry after generation failure"
                    );
                }
                return Err(e);
            }
        };

        let sources: Vec<SourceRef> = retrieved.iter().map(SourceRef::from_scored).collect();

        session.history.push(Exchange {
            question: question.to_string(),
            answer: text.clone(),
            asked_at: Utc::now(),
        });

        Ok(Answer { text, sources })
    }
}
