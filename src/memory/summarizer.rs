//! Summarization gateway.
//!
//! Condenses a transcript through the summary model. Never fails: when the
//! model errors out, refuses, or answers with nothing, the sanitized input
//! is truncated to the memory limit instead.

use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::llm::{GenerationOutcome, GenerationRequest, LlmProvider};
use crate::memory::{char_len, truncate_chars};
use crate::safety::Sanitizer;

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 200;

const SUMMARY_INSTRUCTION: &str = "\
You maintain the long-term memory of a chat assistant.
Condense the conversation below into a neutral, factual digest.
Keep the key facts about the user, their preferences and anything they asked to be remembered.
Leave out feelings and commentary.
Stay under 100 words.";

/// Summary-model wrapper with a deterministic fallback.
pub struct Summarizer {
    llm: Arc<dyn LlmProvider>,
    sanitizer: Arc<Sanitizer>,
    config: MemoryConfig,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmProvider>, sanitizer: Arc<Sanitizer>, config: MemoryConfig) -> Self {
        Self {
            llm,
            sanitizer,
            config,
        }
    }

    pub fn config(&self) -> MemoryConfig {
        self.config
    }

    fn prompt(cleaned: &str) -> String {
        format!("{SUMMARY_INSTRUCTION}\n\nConversation:\n{cleaned}")
    }

    /// Summarize `text`.
    ///
    /// Inputs shorter than `min_summarize_chars` (after trimming) come back
    /// trimmed and otherwise untouched. Every result is capped at
    /// `max_memory_chars`.
    pub async fn summarize(&self, text: &str) -> String {
        let trimmed = text.trim();
        if char_len(trimmed) < self.config.min_summarize_chars {
            return self.cap(trimmed);
        }

        let cleaned = self.sanitizer.sanitize(text);
        let request = GenerationRequest::new(Self::prompt(&cleaned))
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_output_tokens(SUMMARY_MAX_TOKENS);

        tracing::debug!(
            model = self.llm.model_name(),
            chars = char_len(&cleaned),
            "Summarizing memory"
        );

        match self.llm.generate(request).await {
            Ok(GenerationOutcome::Success { text }) => self.cap(text.trim()),
            Ok(GenerationOutcome::Blocked { reason }) => {
                tracing::warn!(%reason, "Summary blocked, truncating instead");
                self.fallback(&cleaned)
            }
            Ok(GenerationOutcome::Empty) => {
                tracing::warn!("Summary came back empty, truncating instead");
                self.fallback(&cleaned)
            }
            Err(e) => {
                tracing::warn!("Summary call failed, truncating instead: {e}");
                self.fallback(&cleaned)
            }
        }
    }

    fn fallback(&self, cleaned: &str) -> String {
        self.cap(cleaned)
    }

    fn cap(&self, text: &str) -> String {
        truncate_chars(text, self.config.max_memory_chars)
    }
}
