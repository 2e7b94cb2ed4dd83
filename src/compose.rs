//! Answer composition: turn a question plus retrieved chunks into a
//! grounded natural-language answer.
//!
//! The pipeline treats the language model as an opaque collaborator behind
//! the [`AnswerComposer`] trait. The built-in implementation calls the
//! Anthropic Messages API with a stuff-style prompt: all retrieved chunks
//! are placed in the context verbatim, labeled with their source so the
//! model can cite them.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};
use crate::models::ScoredChunk;

#[async_trait]
pub trait AnswerComposer: Send + Sync {
    /// Produce an answer to `question` grounded in `context`, which is
    /// ordered by descending similarity. Failures map to
    /// [`PipelineError::Generation`].
    async fn compose(&self, question: &str, context: &[ScoredChunk]) -> Result<String>;
}

/// Render the retrieved chunks as labeled context blocks.
pub fn render_context(context: &[ScoredChunk]) -> String {
    let mut out = String::new();
    for scored in context {
        let label = match scored.chunk.page {
            Some(page) => format!("{} (page {page})", scored.chunk.source),
            None => scored.chunk.source.clone(),
        };
        out.push_str(&format!("[source: {label}]\n{}\n\n", scored.chunk.text));
    }
    out
}

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using only the \
provided context. If the context does not contain the answer, say you don't know. When you use \
information from a source, mention its name.";

/// Composer calling `POST /v1/messages` on the Anthropic API.
/// Requires the `ANTHROPIC_API_KEY` environment variable.
///
/// Rate-limit (429) and overloaded/server errors are retried with the same
/// backoff ladder as the embedding client before a `Generation` error is
/// surfaced to the caller.
pub struct AnthropicComposer {
    model: String,
    temperature: f64,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl AnthropicComposer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            return Err(PipelineError::Generation(
                "ANTHROPIC_API_KEY environment variable not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl AnswerComposer for AnthropicComposer {
    async fn compose(&self, question: &str, context: &[ScoredChunk]) -> Result<String> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| PipelineError::Generation("ANTHROPIC_API_KEY not set".to_string()))?;

        let user_message = format!(
            "Context:\n\n{}Question: {question}",
            render_context(context)
        );

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": user_message}],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| PipelineError::Generation(e.to_string()))?;
                        return parse_messages_response(&json);
                    }

                    // 529 is Anthropic's overloaded status.
                    if status.as_u16() == 429 || status.as_u16() == 529 || status.is_server_error()
                    {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(PipelineError::Generation(format!(
                            "Anthropic API error {status}: {body_text}"
                        )));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(PipelineError::Generation(format!(
                        "Anthropic API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(PipelineError::Generation(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| PipelineError::Generation("generation failed after retries".into())))
    }
}

/// Concatenate the text blocks of a Messages API response.
fn parse_messages_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| PipelineError::Generation("invalid response: missing content".into()))?;

    let text: String = content
        .iter()
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(PipelineError::Generation(
            "invalid response: no text blocks".into(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(text: &str, source: &str, page: Option<u32>) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                source: source.to_string(),
                page,
                chunk_index: 0,
            },
            score: 0.5,
        }
    }

    #[test]
    fn context_blocks_are_labeled_with_source_and_page() {
        let context = vec![
            scored("First passage.", "guide.pdf", Some(4)),
            scored("Second passage.", "notes.txt", None),
        ];
        let rendered = render_context(&context);
        assert!(rendered.contains("[source: guide.pdf (page 4)]\nFirst passage."));
        assert!(rendered.contains("[source: notes.txt]\nSecond passage."));
        // Order is preserved.
        assert!(rendered.find("First").unwrap() < rendered.find("Second").unwrap());
    }

    #[test]
    fn parse_response_joins_text_blocks() {
        let json = serde_json::json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "world."},
            ]
        });
        assert_eq!(parse_messages_response(&json).unwrap(), "Hello world.");
    }

    #[test]
    fn parse_response_rejects_missing_content() {
        let err = parse_messages_response(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }
}
