//! Onboarding state machine: which question the user is answering.

use serde::{Deserialize, Serialize};

/// Steps of the onboarding conversation, persisted by integer code.
///
/// Progresses linearly: NotStarted → Name → Tone → Hobbies → Boundaries →
/// Confirm → Complete. Declining at Confirm loops back to Name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum OnboardingStep {
    NotStarted,
    Name,
    Tone,
    Hobbies,
    Boundaries,
    Confirm,
    Complete,
}

impl OnboardingStep {
    /// Integer code stored in the database.
    pub fn code(&self) -> i64 {
        match self {
            Self::NotStarted => 0,
            Self::Name => 1,
            Self::Tone => 2,
            Self::Hobbies => 3,
            Self::Boundaries => 4,
            Self::Confirm => 5,
            Self::Complete => 99,
        }
    }

    /// Decode a stored code. Anything at or above 99 counts as complete.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NotStarted),
            1 => Some(Self::Name),
            2 => Some(Self::Tone),
            3 => Some(Self::Hobbies),
            4 => Some(Self::Boundaries),
            5 => Some(Self::Confirm),
            c if c >= 99 => Some(Self::Complete),
            _ => None,
        }
    }

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (NotStarted, Name)
                | (Name, Tone)
                | (Tone, Hobbies)
                | (Hobbies, Boundaries)
                | (Boundaries, Confirm)
                | (Confirm, Complete)
                | (Confirm, Name)
        )
    }

    /// Whether onboarding is done and chat is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether the user is partway through answering questions.
    pub fn is_in_flow(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            NotStarted => Some(Name),
            Name => Some(Tone),
            Tone => Some(Hobbies),
            Hobbies => Some(Boundaries),
            Boundaries => Some(Confirm),
            Confirm => Some(Complete),
            Complete => None,
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl From<OnboardingStep> for i64 {
    fn from(step: OnboardingStep) -> Self {
        step.code()
    }
}

impl TryFrom<i64> for OnboardingStep {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown onboarding step code {code}"))
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Name => "name",
            Self::Tone => "tone",
            Self::Hobbies => "hobbies",
            Self::Boundaries => "boundaries",
            Self::Confirm => "confirm",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}
