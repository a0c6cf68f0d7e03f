//! libSQL backend: async `Database` trait implementation.
//!
//! Uses libsql's native async API. Supports local file and in-memory
//! databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::model::{Preferences, Profile, ProfileField, ProfileUpdate};
use crate::onboarding::state::OnboardingStep;
use crate::store::migrations;
use crate::store::traits::{Database, Interaction, InteractionRole};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    /// Keeps the database open for `conn`.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Write every column of `profile`, inserting or replacing the row.
    async fn write_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        let preferences = serde_json::to_string(&profile.preferences)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, name, preferences, memory, onboarding_step, last_interaction)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id) DO UPDATE SET
                    name = ?2, preferences = ?3, memory = ?4,
                    onboarding_step = ?5, last_interaction = ?6",
                params![
                    profile.user_id.as_str(),
                    opt_text(profile.name.as_deref()),
                    preferences,
                    profile.memory.as_str(),
                    profile.onboarding_step.code(),
                    format_datetime(&profile.last_interaction)
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("write_profile: {e}")))?;
        Ok(())
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format; fixed precision keeps text ordering chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const PROFILE_COLUMNS: &str =
    "user_id, name, preferences, memory, onboarding_step, last_interaction";

/// Map a libsql Row to a Profile.
fn row_to_profile(row: &libsql::Row) -> Result<Profile, libsql::Error> {
    let user_id: String = row.get(0)?;
    let preferences_str: String = row.get(2).unwrap_or_else(|_| "{}".to_string());
    let step_code: i64 = row.get(4).unwrap_or(0);
    let last_str: String = row.get(5).unwrap_or_default();

    let preferences: Preferences = serde_json::from_str(&preferences_str).unwrap_or_else(|e| {
        tracing::warn!(user_id = %user_id, "Unreadable preferences, using empty: {e}");
        Preferences::default()
    });
    let onboarding_step = OnboardingStep::from_code(step_code).unwrap_or_else(|| {
        tracing::warn!(user_id = %user_id, code = step_code, "Unknown onboarding step");
        OnboardingStep::NotStarted
    });

    Ok(Profile {
        name: row.get(1).ok(),
        preferences,
        memory: row.get(3).unwrap_or_default(),
        onboarding_step,
        last_interaction: parse_datetime(&last_str),
        user_id,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_profile(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_profile: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn create_profile(
        &self,
        user_id: &str,
        defaults: ProfileUpdate,
    ) -> Result<Profile, DatabaseError> {
        if let Some(existing) = self.get_profile(user_id).await? {
            return Ok(existing);
        }

        let mut profile = Profile::new(user_id);
        defaults.apply_to(&mut profile);
        self.write_profile(&profile).await?;
        info!(user_id = %user_id, "Profile created");
        Ok(profile)
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<Profile, DatabaseError> {
        let mut profile = self
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| Profile::new(user_id));
        update.apply_to(&mut profile);
        self.write_profile(&profile).await?;
        Ok(profile)
    }

    async fn update_profile_field(
        &self,
        user_id: &str,
        field: ProfileField,
    ) -> Result<Option<Profile>, DatabaseError> {
        let column = field.column();
        let value = match field {
            ProfileField::Name(name) => libsql::Value::Text(name),
            ProfileField::Preferences(prefs) => libsql::Value::Text(
                serde_json::to_string(&prefs)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
            ),
            ProfileField::Memory(memory) => libsql::Value::Text(memory),
            ProfileField::OnboardingStep(step) => libsql::Value::Integer(step.code()),
        };

        let count = self
            .conn()
            .execute(
                &format!(
                    "UPDATE profiles SET {column} = ?1, last_interaction = ?2 WHERE user_id = ?3"
                ),
                params![value, format_datetime(&Utc::now()), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_profile_field: {e}")))?;

        if count == 0 {
            return Ok(None);
        }
        self.get_profile(user_id).await
    }

    // ── Interaction log ─────────────────────────────────────────────

    async fn log_interaction(
        &self,
        user_id: &str,
        role: InteractionRole,
        content: &str,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO interaction_logs (id, user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    role.as_str(),
                    content,
                    format_datetime(&Utc::now())
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("log_interaction: {e}")))?;
        Ok(())
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Interaction>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, user_id, role, content, created_at FROM interaction_logs
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_interactions: {e}")))?;

        let mut interactions = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let id_str: String = row.get(0).unwrap_or_default();
            let role: String = row.get(2).unwrap_or_default();
            let created_str: String = row.get(4).unwrap_or_default();
            interactions.push(Interaction {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
                user_id: row.get(1).unwrap_or_default(),
                role: InteractionRole::parse(&role),
                content: row.get(3).unwrap_or_default(),
                created_at: parse_datetime(&created_str),
            });
        }
        interactions.reverse();
        Ok(interactions)
    }
}
