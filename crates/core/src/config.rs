//! Configuration types shared across crates.

use crate::timeout::TimeoutPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body for file uploads, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, restrict this endpoint to the scraper at the
    /// network level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> u64 {
    500 * crate::BYTES_PER_MB
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Upload body limit as a `usize` for the HTTP layer.
    pub fn max_upload_bytes_usize(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

/// External ML prediction service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MlServiceConfig {
    /// Base URL of the ML service (e.g., "http://localhost:5001").
    #[serde(default = "default_ml_base_url")]
    pub base_url: String,
    /// Maximum size of a relayed file and of the ML service response body, in bytes.
    #[serde(default = "default_max_relay_bytes")]
    pub max_relay_bytes: u64,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Timeout for manual (single row) predictions in seconds.
    #[serde(default = "default_predict_timeout_secs")]
    pub predict_timeout_secs: u64,
    /// Timeout for history, count, delete and health calls in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_ml_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_max_relay_bytes() -> u64 {
    1000 * crate::BYTES_PER_MB
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_predict_timeout_secs() -> u64 {
    60
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_ml_base_url(),
            max_relay_bytes: default_max_relay_bytes(),
            connect_timeout_secs: default_connect_timeout_secs(),
            predict_timeout_secs: default_predict_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl MlServiceConfig {
    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Manual prediction timeout as a Duration.
    pub fn predict_timeout(&self) -> Duration {
        Duration::from_secs(self.predict_timeout_secs)
    }

    /// History/health query timeout as a Duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Validate ML service configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "ml_service.base_url must start with http:// or https://, got {}",
                self.base_url
            ));
        }
        if self.max_relay_bytes == 0 {
            return Err("ml_service.max_relay_bytes cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Scratch storage for uploads in flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Directory holding uploaded files between receipt and relay.
    #[serde(default = "default_scratch_path")]
    pub path: PathBuf,
}

fn default_scratch_path() -> PathBuf {
    PathBuf::from("./data/uploads")
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            path: default_scratch_path(),
        }
    }
}

/// Timeout tier durations.
///
/// The size thresholds (50 MB, 100 MB) are fixed; only the durations are tunable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for every route except the batch upload, in seconds (default: 10 minutes).
    #[serde(default = "default_standard_secs")]
    pub standard_secs: u64,
    /// Uploads up to and including 50 MB (default: 1 hour).
    #[serde(default = "default_upload_small_secs")]
    pub upload_small_secs: u64,
    /// Uploads above 50 MB up to and including 100 MB (default: 2 hours).
    #[serde(default = "default_upload_medium_secs")]
    pub upload_medium_secs: u64,
    /// Uploads above 100 MB (default: 4 hours).
    #[serde(default = "default_upload_large_secs")]
    pub upload_large_secs: u64,
    /// Extra time the inbound batch-upload timeout allows beyond its tier, so
    /// the relay timeout fires first (default: 60 seconds).
    #[serde(default = "default_inbound_grace_secs")]
    pub inbound_grace_secs: u64,
}

fn default_standard_secs() -> u64 {
    600
}

fn default_upload_small_secs() -> u64 {
    3600
}

fn default_upload_medium_secs() -> u64 {
    7200
}

fn default_upload_large_secs() -> u64 {
    14400
}

fn default_inbound_grace_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            standard_secs: default_standard_secs(),
            upload_small_secs: default_upload_small_secs(),
            upload_medium_secs: default_upload_medium_secs(),
            upload_large_secs: default_upload_large_secs(),
            inbound_grace_secs: default_inbound_grace_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Build the timeout policy from the configured tier durations.
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            standard: Duration::from_secs(self.standard_secs),
            upload_small: Duration::from_secs(self.upload_small_secs),
            upload_medium: Duration::from_secs(self.upload_medium_secs),
            upload_large: Duration::from_secs(self.upload_large_secs),
            inbound_grace: Duration::from_secs(self.inbound_grace_secs),
        }
    }

    /// Validate timeout configuration.
    ///
    /// Zero durations are rejected, and upload tiers must not shrink as the
    /// file grows.
    pub fn validate(&self) -> Result<(), String> {
        let tiers = [
            ("timeouts.standard_secs", self.standard_secs),
            ("timeouts.upload_small_secs", self.upload_small_secs),
            ("timeouts.upload_medium_secs", self.upload_medium_secs),
            ("timeouts.upload_large_secs", self.upload_large_secs),
            ("timeouts.inbound_grace_secs", self.inbound_grace_secs),
        ];
        for (name, secs) in tiers {
            if secs == 0 {
                return Err(format!("{name} cannot be 0"));
            }
        }
        if self.upload_small_secs > self.upload_medium_secs
            || self.upload_medium_secs > self.upload_large_secs
        {
            return Err(format!(
                "upload timeout tiers must be non-decreasing, got {}s / {}s / {}s",
                self.upload_small_secs, self.upload_medium_secs, self.upload_large_secs
            ));
        }
        Ok(())
    }
}

/// Token verification configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the service that issues login tokens.
    /// WARNING: Prefer OPTIPREDICT_AUTH__JWT_SECRET over storing it in a file.
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Create a test configuration with a fixed secret.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            jwt_secret: "optipredict-test-secret".to_string(),
        }
    }

    /// Validate auth configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.trim().is_empty() {
            return Err("auth.jwt_secret cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and single-node deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// MySQL database.
    Mysql {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 3306).
        #[serde(default = "default_mysql_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer OPTIPREDICT_METADATA__PASSWORD over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Seconds to wait for a free pooled connection.
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
    },
}

fn default_mysql_port() -> Option<u16> {
    Some(3306)
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Mysql {
                url,
                host,
                database,
                max_connections,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("mysql max_connections cannot be 0".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "mysql config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "mysql config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// ML service configuration.
    #[serde(default)]
    pub ml_service: MlServiceConfig,
    /// Scratch storage configuration.
    #[serde(default)]
    pub scratch: ScratchConfig,
    /// Timeout tiers.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Token verification (required).
    pub auth: AuthConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and a fixed JWT secret.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            ml_service: MlServiceConfig::default(),
            scratch: ScratchConfig::default(),
            timeouts: TimeoutConfig::default(),
            auth: AuthConfig::for_testing(),
            metadata: MetadataConfig::default(),
        }
    }

    /// Validate every section, returning the first error.
    pub fn validate(&self) -> crate::Result<()> {
        self.ml_service
            .validate()
            .and_then(|()| self.timeouts.validate())
            .and_then(|()| self.auth.validate())
            .and_then(|()| self.metadata.validate())
            .map_err(crate::Error::Config)
    }
}
