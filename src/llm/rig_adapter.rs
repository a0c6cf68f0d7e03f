//! Adapter from rig completion models to [`LlmProvider`].
//!
//! rig owns the transport (endpoint, auth, request encoding). The provider's
//! raw response is re-read through [`RawResponse`] so blocked and empty
//! generations surface as [`GenerationOutcome`] variants instead of being
//! flattened into rig's assistant content.

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use serde::Serialize;

use crate::error::LlmError;
use crate::llm::provider::{GenerationOutcome, GenerationRequest, LlmProvider, RawResponse};

/// Wraps any rig `CompletionModel`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: impl Into<String>, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
    M::Response: Serialize,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, LlmError> {
        let result = self
            .model
            .completion_request(request.prompt)
            .temperature(f64::from(request.temperature))
            .max_tokens(u64::from(request.max_output_tokens))
            .send()
            .await;

        let outcome = match result {
            Ok(response) => outcome_from_raw(self.provider, &response.raw_response)?,
            // rig refuses responses it cannot turn into content, which is
            // how a filtered or empty candidate list arrives.
            Err(CompletionError::ResponseError(reason)) => GenerationOutcome::Blocked { reason },
            Err(e) => return Err(map_completion_error(self.provider, e)),
        };

        tracing::debug!(
            model = %self.model_name,
            outcome = match &outcome {
                GenerationOutcome::Success { .. } => "success",
                GenerationOutcome::Blocked { .. } => "blocked",
                GenerationOutcome::Empty => "empty",
            },
            "Generation finished"
        );
        Ok(outcome)
    }
}

/// Re-read a provider's raw response as a [`RawResponse`].
fn outcome_from_raw<R: Serialize>(
    provider: &str,
    raw: &R,
) -> Result<GenerationOutcome, LlmError> {
    let invalid = |e: serde_json::Error| LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: e.to_string(),
    };
    let value = serde_json::to_value(raw).map_err(invalid)?;
    let raw: RawResponse = serde_json::from_value(value).map_err(invalid)?;
    Ok(raw.into_outcome())
}

/// Classify a rig error. Provider errors carry the API's error body.
fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ProviderError(body) => {
            if body.contains("RESOURCE_EXHAUSTED") || body.contains("429") {
                LlmError::RateLimited {
                    provider: provider.to_string(),
                    retry_after: None,
                }
            } else if body.contains("API_KEY_INVALID")
                || body.contains("PERMISSION_DENIED")
                || body.contains("UNAUTHENTICATED")
            {
                LlmError::AuthFailed {
                    provider: provider.to_string(),
                }
            } else {
                LlmError::RequestFailed {
                    provider: provider.to_string(),
                    reason: body,
                }
            }
        }
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: e.to_string(),
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}
