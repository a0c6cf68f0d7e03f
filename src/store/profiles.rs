//! ProfileStore: the bot's view of persistence.
//!
//! Wraps a [`Database`] and never fails: reads degrade to "no profile" and
//! writes log a warning and hand back the payload they tried to store, so a
//! flaky database cannot take a conversation down with it.

use std::sync::Arc;

use tracing::warn;

use super::traits::{Database, InteractionRole};
use crate::onboarding::model::{Profile, ProfileField, ProfileUpdate};

/// Degrading facade over the profile table and interaction log.
#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<dyn Database>,
}

impl ProfileStore {
    /// Create a new ProfileStore wrapping the given database.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Fetch a profile; `None` when missing or when the read fails.
    pub async fn get(&self, user_id: &str) -> Option<Profile> {
        match self.db.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, "Profile read failed, treating as absent: {e}");
                None
            }
        }
    }

    /// Create a profile seeded with `defaults`.
    pub async fn create(&self, user_id: &str, defaults: ProfileUpdate) -> Profile {
        match self.db.create_profile(user_id, defaults.clone()).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, "Profile create failed: {e}");
                stand_in(user_id, &defaults)
            }
        }
    }

    /// Apply a partial update, creating the profile if needed.
    pub async fn upsert(&self, user_id: &str, update: ProfileUpdate) -> Profile {
        match self.db.upsert_profile(user_id, update.clone()).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, "Profile upsert failed: {e}");
                stand_in(user_id, &update)
            }
        }
    }

    /// Overwrite one column. `None` when there is no profile or the write
    /// fails.
    pub async fn update_field(&self, user_id: &str, field: ProfileField) -> Option<Profile> {
        let column = field.column();
        match self.db.update_profile_field(user_id, field).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(user_id = %user_id, column, "Profile field update found no profile");
                None
            }
            Err(e) => {
                warn!(user_id = %user_id, column, "Profile field update failed: {e}");
                None
            }
        }
    }

    /// Append to the interaction log. Failures are logged and dropped.
    pub async fn log(&self, user_id: &str, role: InteractionRole, content: &str) {
        if let Err(e) = self.db.log_interaction(user_id, role, content).await {
            warn!(user_id = %user_id, %role, "Interaction log write failed: {e}");
        }
    }
}

/// Best-effort profile built from the payload a failed write carried.
fn stand_in(user_id: &str, update: &ProfileUpdate) -> Profile {
    let mut profile = Profile::new(user_id);
    update.apply_to(&mut profile);
    profile
}
