//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use optipredict_core::config::{AppConfig, MetadataConfig, MlServiceConfig, ScratchConfig};
use optipredict_metadata::{MetadataStore, SqliteStore, UploadAuditRow};
use optipredict_metadata::repos::UploadAuditRepo;
use optipredict_server::{AppState, ScratchStore, create_router};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server pointed at the given ML service.
    pub async fn new(ml_base_url: &str) -> Self {
        Self::with_config(ml_base_url, |_| {}).await
    }

    /// Create a test server with a modified configuration.
    pub async fn with_config(ml_base_url: &str, modify: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("metadata.db");
        let scratch_path = temp_dir.path().join("scratch");

        let mut config = AppConfig {
            ml_service: MlServiceConfig {
                base_url: ml_base_url.to_string(),
                ..Default::default()
            },
            scratch: ScratchConfig {
                path: scratch_path.clone(),
            },
            metadata: MetadataConfig::Sqlite {
                path: db_path.clone(),
            },
            ..AppConfig::for_testing()
        };
        modify(&mut config);

        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );
        let scratch = ScratchStore::open(&scratch_path)
            .await
            .expect("Failed to open scratch directory");

        let state = AppState::new(config, metadata, scratch).expect("Failed to build state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get the metadata store.
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.state.metadata
    }

    /// Scratch directory root.
    pub fn scratch_dir(&self) -> PathBuf {
        self.state.scratch.root().to_path_buf()
    }

    /// Number of files currently in the scratch directory.
    pub fn scratch_file_count(&self) -> usize {
        std::fs::read_dir(self.scratch_dir())
            .expect("Failed to read scratch directory")
            .count()
    }

    /// Send a request and decode the JSON response.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Wait for the background audit writer to produce `expected` rows.
    pub async fn wait_for_uploads(&self, user_id: i64, expected: usize) -> Vec<UploadAuditRow> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let rows = self.metadata().list_uploads(user_id, 100).await.unwrap();
            if rows.len() >= expected {
                return rows;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("expected {expected} audit rows, found {}", rows.len());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
