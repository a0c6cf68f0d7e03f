//! Schema versions for the profile database.
//!
//! Applied versions are recorded in `schema_versions`; on open, every
//! newer step runs once, oldest first.

use libsql::Connection;

use crate::error::DatabaseError;

struct SchemaStep {
    version: i64,
    label: &'static str,
    sql: &'static str,
}

/// Append only. Never edit a step that has shipped.
const SCHEMA: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "profiles",
        sql: "CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                name TEXT,
                preferences TEXT NOT NULL DEFAULT '{}',
                memory TEXT NOT NULL DEFAULT '',
                onboarding_step INTEGER NOT NULL DEFAULT 0,
                last_interaction TEXT NOT NULL
            );",
    },
    SchemaStep {
        version: 2,
        label: "interaction_logs",
        sql: "CREATE TABLE IF NOT EXISTS interaction_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_interaction_logs_user
                ON interaction_logs(user_id, created_at);",
    },
];

fn migration_err(context: &str, e: libsql::Error) -> DatabaseError {
    DatabaseError::Migration(format!("{context}: {e}"))
}

/// Bring the schema up to the latest version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        (),
    )
    .await
    .map_err(|e| migration_err("Failed to create schema_versions", e))?;

    let applied = schema_version(conn).await?;
    let pending = SCHEMA.iter().filter(|step| step.version > applied);

    for step in pending {
        tracing::info!(version = step.version, label = step.label, "Upgrading schema");
        conn.execute_batch(step.sql)
            .await
            .map_err(|e| migration_err(&format!("Schema step {} ({})", step.version, step.label), e))?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_versions (version, label) VALUES (?1, ?2)",
            libsql::params![step.version, step.label],
        )
        .await
        .map_err(|e| migration_err(&format!("Failed to record schema step {}", step.version), e))?;
    }

    Ok(())
}

/// Latest applied schema version; 0 on a fresh database.
pub async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_versions", ())
        .await
        .map_err(|e| migration_err("Failed to read schema version", e))?;

    match rows
        .next()
        .await
        .map_err(|e| migration_err("Failed to read schema version", e))?
    {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| migration_err("Bad schema version", e)),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        let conn = db.connect().unwrap();
        run_migrations(&conn).await.unwrap();
        conn
    }

    async fn scalar(conn: &Connection, sql: &str) -> String {
        let mut rows = conn.query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get::<String>(0).unwrap()
    }

    #[tokio::test]
    async fn tables_exist_after_upgrade() {
        let conn = fresh().await;
        let tables = scalar(
            &conn,
            "SELECT group_concat(name, ',') FROM (
                SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name
            )",
        )
        .await;
        for name in ["interaction_logs", "profiles", "schema_versions"] {
            assert!(tables.split(',').any(|t| t == name), "missing {name} in {tables}");
        }
    }

    #[tokio::test]
    async fn rerun_is_a_no_op() {
        let conn = fresh().await;
        run_migrations(&conn).await.unwrap();
        assert_eq!(schema_version(&conn).await.unwrap(), SCHEMA.len() as i64);
        assert_eq!(
            scalar(&conn, "SELECT group_concat(label, ',') FROM schema_versions").await,
            "profiles,interaction_logs"
        );
    }

    #[tokio::test]
    async fn new_profile_row_gets_defaults() {
        let conn = fresh().await;
        conn.execute(
            "INSERT INTO profiles (user_id, last_interaction) VALUES ('7', '2026-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();

        assert_eq!(
            scalar(
                &conn,
                "SELECT preferences || '|' || memory || '|' || onboarding_step FROM profiles"
            )
            .await,
            "{}||0"
        );
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let conn = fresh().await;
        let result = conn
            .execute(
                "INSERT INTO interaction_logs (id, user_id, role, content, created_at)
                 VALUES ('a', '7', 'system', 'x', '2026-01-01T00:00:00Z')",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
