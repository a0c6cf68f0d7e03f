//! OnboardingManager: walks a user through the question sequence and
//! records each answer on their profile.

use tracing::{debug, info, warn};

use super::model::{BOUNDARIES_KEY, HOBBIES_KEY, Profile, ProfileUpdate, TONE_KEY};
use super::prompts;
use super::state::OnboardingStep;
use crate::store::ProfileStore;

/// Drives the onboarding conversation.
pub struct OnboardingManager {
    profiles: ProfileStore,
    bot_name: String,
}

impl OnboardingManager {
    pub fn new(profiles: ProfileStore, bot_name: impl Into<String>) -> Self {
        Self {
            profiles,
            bot_name: bot_name.into(),
        }
    }

    /// Handle `/start`.
    ///
    /// Onboarded users get a welcome back. Everyone else (new, or partway
    /// through) is sent to the first question.
    pub async fn start(&self, user_id: &str) -> String {
        let profile = match self.profiles.get(user_id).await {
            Some(p) if p.is_onboarded() => {
                return prompts::welcome_back(p.display_name(), &self.bot_name);
            }
            Some(p) => p,
            None => {
                self.profiles
                    .create(user_id, ProfileUpdate::new().step(OnboardingStep::NotStarted))
                    .await
            }
        };

        if profile.onboarding_step.is_in_flow() {
            info!(user_id = %user_id, step = %profile.onboarding_step, "Restarting onboarding");
        }
        self.profiles
            .upsert(user_id, ProfileUpdate::new().step(OnboardingStep::Name))
            .await;
        prompts::greeting(&self.bot_name)
    }

    /// Record an answer for the step `profile` is on and return the next
    /// prompt. `None` when the profile is not mid-onboarding.
    pub async fn handle_answer(&self, profile: &Profile, text: &str) -> Option<String> {
        let user_id = profile.user_id.as_str();
        let step = profile.onboarding_step;
        let answer = text.trim();

        let reply = match step {
            OnboardingStep::NotStarted | OnboardingStep::Complete => return None,
            OnboardingStep::Name => {
                self.save(user_id, step, OnboardingStep::Tone, ProfileUpdate::new().name(answer))
                    .await;
                prompts::ask_tone(answer)
            }
            OnboardingStep::Tone => {
                let mut prefs = profile.preferences.clone();
                prefs.set_text(TONE_KEY, answer.to_lowercase());
                self.save(user_id, step, OnboardingStep::Hobbies, ProfileUpdate::new().preferences(prefs))
                    .await;
                prompts::ask_hobbies()
            }
            OnboardingStep::Hobbies => {
                let mut prefs = profile.preferences.clone();
                prefs.set_list(HOBBIES_KEY, parse_list(answer));
                self.save(user_id, step, OnboardingStep::Boundaries, ProfileUpdate::new().preferences(prefs))
                    .await;
                prompts::ask_boundaries()
            }
            OnboardingStep::Boundaries => {
                let boundaries = if answer.eq_ignore_ascii_case("none") {
                    ""
                } else {
                    answer
                };
                let mut prefs = profile.preferences.clone();
                prefs.set_text(BOUNDARIES_KEY, boundaries);
                let name = profile.name.as_deref().unwrap_or("");
                let summary = prompts::confirmation_summary(name, &prefs);
                self.save(user_id, step, OnboardingStep::Confirm, ProfileUpdate::new().preferences(prefs))
                    .await;
                summary
            }
            OnboardingStep::Confirm => {
                if answer.to_lowercase().starts_with('y') {
                    self.save(user_id, step, OnboardingStep::Complete, ProfileUpdate::new())
                        .await;
                    info!(user_id = %user_id, "Onboarding complete");
                    prompts::onboarding_done(profile.display_name())
                } else {
                    self.save(user_id, step, OnboardingStep::Name, ProfileUpdate::new())
                        .await;
                    prompts::restart_onboarding()
                }
            }
        };

        Some(reply)
    }

    /// Persist `update` together with the move from `from` to `to`.
    async fn save(&self, user_id: &str, from: OnboardingStep, to: OnboardingStep, update: ProfileUpdate) {
        if !from.can_transition_to(to) {
            warn!(user_id = %user_id, %from, %to, "Unexpected onboarding transition");
        }
        debug!(user_id = %user_id, %from, %to, "Onboarding step");
        self.profiles.upsert(user_id, update.step(to)).await;
    }
}

/// Comma-separated answer to a list: trimmed, empties dropped.
fn parse_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
