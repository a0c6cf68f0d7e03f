//! Chat orchestrator: one conversational turn for an onboarded user.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{GenerationOutcome, GenerationRequest, LlmProvider};
use crate::memory::{MemoryTrimmer, format_turn};
use crate::onboarding::model::{Profile, ProfileField};
use crate::onboarding::prompts::{build_system_prompt, build_user_message};
use crate::store::{InteractionRole, ProfileStore};

const CHAT_TEMPERATURE: f32 = 0.9;
const CHAT_MAX_TOKENS: u32 = 600;

/// Builds the prompt, calls the chat model, and folds the turn into memory.
pub struct ChatOrchestrator {
    llm: Arc<dyn LlmProvider>,
    profiles: ProfileStore,
    trimmer: MemoryTrimmer,
    /// Persona with the bot's name filled in.
    persona: String,
    bot_name: String,
}

impl ChatOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        profiles: ProfileStore,
        trimmer: MemoryTrimmer,
        persona: impl Into<String>,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            profiles,
            trimmer,
            persona: persona.into(),
            bot_name: bot_name.into(),
        }
    }

    fn prompt(&self, profile: &Profile, text: &str) -> String {
        let system = build_system_prompt(
            profile.display_name(),
            &profile.preferences,
            &profile.memory,
            &self.persona,
        );
        format!("{system}\n\n{}", build_user_message(text))
    }

    /// Log the user's message and ask the model for a reply.
    ///
    /// `None` when the model failed, refused, or returned nothing; the
    /// caller answers with an apology and the turn is dropped.
    pub async fn reply(&self, profile: &Profile, text: &str) -> Option<String> {
        let user_id = profile.user_id.as_str();
        self.profiles.log(user_id, InteractionRole::User, text).await;

        let request = GenerationRequest::new(self.prompt(profile, text))
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_output_tokens(CHAT_MAX_TOKENS);

        match self.llm.generate(request).await {
            Ok(GenerationOutcome::Success { text }) => {
                debug!(user_id = %user_id, chars = text.chars().count(), "Chat reply generated");
                Some(text)
            }
            Ok(GenerationOutcome::Blocked { reason }) => {
                warn!(user_id = %user_id, %reason, "Chat reply blocked");
                None
            }
            Ok(GenerationOutcome::Empty) => {
                warn!(user_id = %user_id, "Chat reply empty");
                None
            }
            Err(e) => {
                warn!(user_id = %user_id, model = self.llm.model_name(), "Chat call failed: {e}");
                None
            }
        }
    }

    /// Record a delivered reply: log it and fold the turn into memory.
    ///
    /// Returns the memory that was written.
    pub async fn remember(&self, profile: &Profile, text: &str, reply: &str) -> String {
        let user_id = profile.user_id.as_str();
        self.profiles
            .log(user_id, InteractionRole::Assistant, reply)
            .await;

        let pair = format_turn(profile.display_name(), text, &self.bot_name, reply);
        let memory = self.trimmer.append_and_trim(&profile.memory, &pair).await;
        self.profiles
            .update_field(user_id, ProfileField::Memory(memory.clone()))
            .await;
        memory
    }
}
