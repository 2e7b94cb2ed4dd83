use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_dir")]
    pub dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: default_documents_dir(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./documents")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> i64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_llm_timeout_secs() -> u64 {
    60
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidArgument(msg.into())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let config: Config =
        toml::from_str(&content).map_err(|e| invalid(format!("bad config file: {e}")))?;

    validate(&config)?;
    Ok(config)
}

/// Check a config (parsed or built in code) against the recognized ranges.
pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        return Err(invalid("chunking.chunk_size must be > 0"));
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(invalid(
            "chunking.chunk_overlap must be smaller than chunking.chunk_size",
        ));
    }
    if config.retrieval.top_k < 1 {
        return Err(invalid("retrieval.top_k must be >= 1"));
    }
    if !(0.0..=1.0).contains(&config.llm.temperature) {
        return Err(invalid("llm.temperature must be in [0.0, 1.0]"));
    }
    if config.llm.max_tokens == 0 {
        return Err(invalid("llm.max_tokens must be > 0"));
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            return Err(invalid(format!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            )));
        }
        if config.embedding.model.is_none() {
            return Err(invalid(format!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            )));
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => Ok(()),
        other => Err(invalid(format!(
            "unknown embedding provider: '{other}'. Must be disabled or openai."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognized_options() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.documents.dir, PathBuf::from("./documents"));
        validate(&config).unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let mut config: Config = toml::from_str("").unwrap();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn top_k_must_be_positive() {
        let config: Config = toml::from_str("[retrieval]\ntop_k = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn enabled_embedding_requires_model_and_dims() {
        let config: Config = toml::from_str("[embedding]\nprovider = \"openai\"\n").unwrap();
        assert!(validate(&config).is_err());

        let config: Config = toml::from_str(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        )
        .unwrap();
        validate(&config).unwrap();
    }

    #[test]
    fn unknown_provider_rejected() {
        let config: Config = toml::from_str(
            "[embedding]\nprovider = \"cohere\"\nmodel = \"x\"\ndims = 8\n",
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }
}
