//! Metadata store trait and the SQLite implementation.

use crate::error::MetadataResult;
use crate::models::{NewUploadAudit, UploadAuditRow};
use crate::repos::UploadAuditRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: UploadAuditRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite store at `path` and migrate it.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // Audit writes are spawned concurrently; one connection keeps SQLite
        // from returning "database is locked".
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::info!(path = %path.display(), "Opened SQLite metadata store");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in schema_statements(SCHEMA_SQL) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadAuditRepo for SqliteStore {
    async fn record_upload(&self, audit: &NewUploadAudit) -> MetadataResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO file_uploads (
                user_id, filename, file_size, total_rows, valid_rows,
                processed_rows, status, created_at, processed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(audit.user_id)
        .bind(&audit.filename)
        .bind(audit.file_size)
        .bind(audit.total_rows)
        .bind(audit.valid_rows)
        .bind(audit.processed_rows)
        .bind(audit.status.as_str())
        .bind(audit.created_at)
        .bind(audit.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_uploads(&self, user_id: i64, limit: u32) -> MetadataResult<Vec<UploadAuditRow>> {
        let rows = sqlx::query_as::<_, UploadAuditRow>(
            "SELECT * FROM file_uploads WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_uploads(&self, user_id: i64) -> MetadataResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_uploads WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

/// Split a schema file into executable statements.
///
/// Leading `--` comment lines are dropped from each statement and
/// comment-only chunks are skipped.
pub(crate) fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let mut rest = statement.trim();
            while rest.starts_with("--") {
                rest = match rest.split_once('\n') {
                    Some((_, tail)) => tail.trim_start(),
                    None => "",
                };
            }
            (!rest.is_empty()).then_some(rest)
        })
        .collect()
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- One summary row per processed batch upload
CREATE TABLE IF NOT EXISTS file_uploads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    total_rows INTEGER NOT NULL DEFAULT 0,
    valid_rows INTEGER NOT NULL DEFAULT 0,
    processed_rows INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    processed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_file_uploads_user_created
    ON file_uploads (user_id, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("metadata.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_schema_statements_skip_comments() {
        let statements = schema_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS file_uploads"));
    }

    #[test]
    fn test_schema_statements_drop_leading_comment_lines() {
        let schema = r#"
            -- comment only
            ;
            -- describes foo
            -- over two lines
            CREATE TABLE foo (id int);
            CREATE TABLE bar (
                -- inline note stays
                id int
            );
        "#;

        let statements = schema_statements(schema);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE foo"));
        assert!(statements[1].starts_with("CREATE TABLE bar"));
        assert!(statements[1].contains("inline note stays"));
    }

    #[tokio::test]
    async fn test_record_and_list_uploads() {
        let (store, _dir) = open_store().await;

        let first = store
            .record_upload(&NewUploadAudit::completed(1, "a.csv", 100, 5, 4, 5))
            .await
            .unwrap();
        let second = store
            .record_upload(&NewUploadAudit::completed(1, "b.xlsx", 200, 7, 7, 7))
            .await
            .unwrap();
        store
            .record_upload(&NewUploadAudit::completed(2, "other.csv", 10, 1, 1, 1))
            .await
            .unwrap();
        assert!(second > first);

        let rows = store.list_uploads(1, 50).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "b.xlsx");
        assert_eq!(rows[0].status, "completed");
        assert_eq!(rows[1].valid_rows, 4);
        assert_eq!(store.count_uploads(1).await.unwrap(), 2);
        assert_eq!(store.count_uploads(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let (store, _dir) = open_store().await;
        for i in 0..5 {
            store
                .record_upload(&NewUploadAudit::completed(9, format!("f{i}.csv"), 1, 1, 1, 1))
                .await
                .unwrap();
        }
        assert_eq!(store.list_uploads(9, 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let (store, _dir) = open_store().await;
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    }
}
