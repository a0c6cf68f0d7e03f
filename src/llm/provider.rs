//! Provider-agnostic text generation types.
//!
//! A raw provider response is adapted into a [`GenerationOutcome`] once, at
//! the edge, so callers match on three variants instead of probing optional
//! fields.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LlmError;

/// A single-prompt generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            max_output_tokens: 600,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// What came back from a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Usable, non-empty text.
    Success { text: String },
    /// The provider withheld output (safety filter, recitation, ...).
    Blocked { reason: String },
    /// The call succeeded but carried no text and no block reason.
    Empty,
}

/// Finish reasons that still count as a normal completion.
const SUCCESS_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

/// Raw response shape: an optional direct text field, or candidates made of
/// content parts plus a finish reason.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl Candidate {
    /// Concatenated text of all parts, trimmed.
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

impl RawResponse {
    /// Adapt the raw response into a [`GenerationOutcome`].
    ///
    /// Order: direct text field, then the first candidate whose parts yield
    /// non-empty text. With no text at all, a prompt block reason or a
    /// non-success finish reason makes the outcome `Blocked`.
    pub fn into_outcome(self) -> GenerationOutcome {
        if let Some(text) = self.text.as_deref().map(str::trim)
            && !text.is_empty()
        {
            return GenerationOutcome::Success {
                text: text.to_string(),
            };
        }

        if let Some(text) = self
            .candidates
            .iter()
            .map(Candidate::text)
            .find(|t| !t.is_empty())
        {
            return GenerationOutcome::Success { text };
        }

        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return GenerationOutcome::Blocked { reason };
        }

        if let Some(reason) = self
            .candidates
            .into_iter()
            .filter_map(|c| c.finish_reason)
            .find(|r| !SUCCESS_FINISH_REASONS.contains(&r.as_str()))
        {
            return GenerationOutcome::Blocked { reason };
        }

        GenerationOutcome::Empty
    }
}

/// A hosted text generation capability.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Generate text for a single prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, LlmError>;
}
