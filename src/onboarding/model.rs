//! Profile data models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::onboarding::state::OnboardingStep;

pub const TONE_KEY: &str = "tone";
pub const HOBBIES_KEY: &str = "hobbies";
pub const BOUNDARIES_KEY: &str = "boundaries";

/// A single preference value.
///
/// Known keys hold text or a list of text; anything else stored under an
/// unknown key is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Text(String),
    List(Vec<String>),
    Other(serde_json::Value),
}

impl std::fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Preferences collected during onboarding, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, PreferenceValue>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.0.get(key)
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), PreferenceValue::Text(value.into()));
    }

    pub fn set_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), PreferenceValue::List(values));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PreferenceValue)> {
        self.0.iter()
    }

    fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(PreferenceValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn tone(&self) -> Option<&str> {
        self.text(TONE_KEY)
    }

    pub fn boundaries(&self) -> Option<&str> {
        self.text(BOUNDARIES_KEY)
    }

    /// Hobbies list; a lone string is treated as a single hobby.
    pub fn hobbies(&self) -> Vec<String> {
        match self.0.get(HOBBIES_KEY) {
            Some(PreferenceValue::List(items)) => items.clone(),
            Some(PreferenceValue::Text(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// A user's stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub onboarding_step: OnboardingStep,
    pub last_interaction: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile for a first contact.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            preferences: Preferences::new(),
            memory: String::new(),
            onboarding_step: OnboardingStep::NotStarted,
            last_interaction: Utc::now(),
        }
    }

    /// Name used as the speaker label in memory and prompts.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => "User",
        }
    }

    pub fn is_onboarded(&self) -> bool {
        self.onboarding_step.is_terminal()
    }
}

/// Partial profile write. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub preferences: Option<Preferences>,
    pub memory: Option<String>,
    pub onboarding_step: Option<OnboardingStep>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    pub fn step(mut self, step: OnboardingStep) -> Self {
        self.onboarding_step = Some(step);
        self
    }

    /// Apply the set fields onto `profile` and refresh its timestamp.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(preferences) = &self.preferences {
            profile.preferences = preferences.clone();
        }
        if let Some(memory) = &self.memory {
            profile.memory = memory.clone();
        }
        if let Some(step) = self.onboarding_step {
            profile.onboarding_step = step;
        }
        profile.last_interaction = Utc::now();
    }
}

/// A single-column profile write.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileField {
    Name(String),
    Preferences(Preferences),
    Memory(String),
    OnboardingStep(OnboardingStep),
}

impl ProfileField {
    /// Column this field is stored in.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Preferences(_) => "preferences",
            Self::Memory(_) => "memory",
            Self::OnboardingStep(_) => "onboarding_step",
        }
    }
}

impl From<ProfileField> for ProfileUpdate {
    fn from(field: ProfileField) -> Self {
        match field {
            ProfileField::Name(n) => ProfileUpdate::new().name(n),
            ProfileField::Preferences(p) => ProfileUpdate::new().preferences(p),
            ProfileField::Memory(m) => ProfileUpdate::new().memory(m),
            ProfileField::OnboardingStep(s) => ProfileUpdate::new().step(s),
        }
    }
}
