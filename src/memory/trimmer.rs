//! Append-then-bound memory update.

use crate::memory::{Summarizer, char_len, truncate_chars};

/// Appends turns to a memory string and keeps it under the limit.
pub struct MemoryTrimmer {
    summarizer: Summarizer,
}

impl MemoryTrimmer {
    pub fn new(summarizer: Summarizer) -> Self {
        Self { summarizer }
    }

    pub fn max_chars(&self) -> usize {
        self.summarizer.config().max_memory_chars
    }

    /// Append `new_pair` to `existing`.
    ///
    /// Under the limit the concatenation is returned as is. Over it, the
    /// whole text is summarized and the summary hard-capped, so the result
    /// never exceeds `max_memory_chars`.
    pub async fn append_and_trim(&self, existing: &str, new_pair: &str) -> String {
        let combined = if existing.is_empty() {
            new_pair.to_string()
        } else {
            format!("{existing}\n{new_pair}")
        };

        let max = self.max_chars();
        let len = char_len(&combined);
        if len <= max {
            return combined;
        }

        tracing::info!(chars = len, limit = max, "Memory over limit, summarizing");
        let summary = self.summarizer.summarize(&combined).await;
        truncate_chars(&summary, max)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::MemoryConfig;
    use crate::error::LlmError;
    use crate::llm::{GenerationOutcome, GenerationRequest, LlmProvider};
    use crate::safety::Sanitizer;

    /// Summary model answering with a fixed text, or failing when `None`.
    struct FixedLlm {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<GenerationOutcome, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(GenerationOutcome::Success { text: text.clone() }),
                None => Err(LlmError::RequestFailed {
                    provider: "fixed".into(),
                    reason: "down".into(),
                }),
            }
        }
    }

    fn trimmer(reply: Option<&str>, max: usize) -> (MemoryTrimmer, Arc<FixedLlm>) {
        let llm = Arc::new(FixedLlm {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let summarizer = Summarizer::new(
            llm.clone(),
            Arc::new(Sanitizer::new()),
            MemoryConfig {
                max_memory_chars: max,
                min_summarize_chars: 50,
            },
        );
        (MemoryTrimmer::new(summarizer), llm)
    }

    #[tokio::test]
    async fn first_turn_has_no_separator() {
        let (t, llm) = trimmer(Some("unused"), 3000);
        let out = t.append_and_trim("", "Alice: hi\nLISA: hello").await;
        assert_eq!(out, "Alice: hi\nLISA: hello");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn under_limit_is_pure_append() {
        let (t, llm) = trimmer(Some("unused"), 3000);
        let out = t
            .append_and_trim("Alice: hi\nLISA: hello", "Alice: bye\nLISA: see you")
            .await;
        assert_eq!(out, "Alice: hi\nLISA: hello\nAlice: bye\nLISA: see you");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exactly_at_limit_is_kept() {
        let (t, llm) = trimmer(Some("unused"), 11);
        let out = t.append_and_trim("hello", "world").await;
        assert_eq!(out, "hello\nworld");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn over_limit_uses_summary() {
        let (t, llm) = trimmer(Some("Alice likes tea."), 100);
        let existing = "x".repeat(90);
        let out = t.append_and_trim(&existing, "Alice: I like tea\nLISA: Noted").await;
        assert_eq!(out, "Alice likes tea.");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn verbose_summary_is_capped() {
        let verbose = "word ".repeat(100);
        let (t, _) = trimmer(Some(&verbose), 60);
        let out = t.append_and_trim(&"a".repeat(80), &"b".repeat(80)).await;
        assert!(out.chars().count() <= 60);
    }

    #[tokio::test]
    async fn failing_summarizer_still_bounded() {
        let (t, llm) = trimmer(None, 120);
        let existing = "Alice: tell me about violence in films\nLISA: sure\n".repeat(4);
        let out = t.append_and_trim(&existing, "Alice: more\nLISA: ok").await;
        assert_eq!(out.chars().count(), 120);
        assert!(out.contains("[redacted]"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_turns_never_exceed_limit() {
        let (t, _) = trimmer(None, 200);
        let mut memory = String::new();
        for i in 0..50 {
            memory = t
                .append_and_trim(&memory, &format!("Alice: message {i}\nLISA: reply {i}"))
                .await;
            assert!(memory.chars().count() <= 200);
        }
    }
}
