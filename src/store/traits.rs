//! Unified `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::model::{Profile, ProfileField, ProfileUpdate};

/// Who produced a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionRole {
    User,
    Assistant,
}

impl InteractionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for InteractionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logged message.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: String,
    pub role: InteractionRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering profiles and the interaction log.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Fetch a profile by user id.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError>;

    /// Insert a profile seeded with `defaults`.
    ///
    /// If the user already has a profile it is returned unchanged.
    async fn create_profile(
        &self,
        user_id: &str,
        defaults: ProfileUpdate,
    ) -> Result<Profile, DatabaseError>;

    /// Apply `update` to the stored profile, creating it if needed.
    async fn upsert_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<Profile, DatabaseError>;

    /// Overwrite a single column. Returns `None` when the user has no profile.
    async fn update_profile_field(
        &self,
        user_id: &str,
        field: ProfileField,
    ) -> Result<Option<Profile>, DatabaseError>;

    // ── Interaction log ─────────────────────────────────────────────

    /// Append a message to the interaction log.
    async fn log_interaction(
        &self,
        user_id: &str,
        role: InteractionRole,
        content: &str,
    ) -> Result<(), DatabaseError>;

    /// Most recent `limit` interactions for a user, oldest first.
    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Interaction>, DatabaseError>;
}
