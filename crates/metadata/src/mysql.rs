//! MySQL-based metadata store implementation.

use crate::error::MetadataResult;
use crate::models::{NewUploadAudit, UploadAuditRow};
use crate::repos::UploadAuditRepo;
use crate::store::{MetadataStore, schema_statements};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool};
use std::str::FromStr;
use std::time::Duration;

/// MySQL schema (embedded).
const MYSQL_SCHEMA: &str = include_str!("mysql_schema.sql");

/// Pool sizing for [`MySqlStore`].
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// MySQL-based metadata store.
pub struct MySqlStore {
    pool: Pool<MySql>,
}

impl MySqlStore {
    /// Create a new MySQL store from a connection URL.
    pub async fn from_url(url: &str, pool: PoolSettings) -> MetadataResult<Self> {
        let opts = MySqlConnectOptions::from_str(url)?;
        Self::connect(opts, pool).await
    }

    /// Create a new MySQL store from individual connection parameters.
    ///
    /// Lets the password come from its own environment variable instead of
    /// being embedded in a URL.
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        pool: PoolSettings,
    ) -> MetadataResult<Self> {
        let mut opts = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            "Connecting to MySQL with individual parameters"
        );

        Self::connect(opts, pool).await
    }

    async fn connect(opts: MySqlConnectOptions, settings: PoolSettings) -> MetadataResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for MySqlStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements cannot hold more than one statement.
        for statement in schema_statements(MYSQL_SCHEMA) {
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
impl UploadAuditRepo for MySqlStore {
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
        Ok(i64::try_from(result.last_insert_id()).unwrap_or(i64::MAX))
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
