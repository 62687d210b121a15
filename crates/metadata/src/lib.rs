//! Relational audit store for the OptiPredict gateway.
//!
//! Holds the `file_uploads` table: one summary row per batch upload the ML
//! service processed successfully. SQLite serves tests and single-node
//! deployments; MySQL serves production.

pub mod error;
pub mod models;
pub mod mysql;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{NewUploadAudit, UploadAuditRow, UploadStatus};
pub use mysql::{MySqlStore, PoolSettings};
pub use store::{MetadataStore, SqliteStore};

use optipredict_core::config::MetadataConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Mysql {
            url,
            host,
            port,
            username,
            password,
            database,
            max_connections,
            acquire_timeout_secs,
        } => {
            let pool = PoolSettings {
                max_connections: *max_connections,
                acquire_timeout: Duration::from_secs(*acquire_timeout_secs),
            };
            let store = if let Some(url) = url {
                tracing::info!("Connecting to MySQL using connection URL");
                MySqlStore::from_url(url, pool).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                MySqlStore::from_params(
                    host,
                    port.unwrap_or(3306),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    pool,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "mysql config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
