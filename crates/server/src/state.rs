//! Application state shared across handlers.

use crate::auth::TokenVerifier;
use crate::scratch::ScratchStore;
use crate::upstream::{MlClient, UpstreamError};
use optipredict_core::TimeoutPolicy;
use optipredict_core::config::AppConfig;
use optipredict_metadata::MetadataStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Audit store.
    pub metadata: Arc<dyn MetadataStore>,
    /// ML service client.
    pub ml: Arc<MlClient>,
    /// Scratch storage for uploads in flight.
    pub scratch: Arc<ScratchStore>,
    /// Timeout tiers.
    pub timeouts: TimeoutPolicy,
    /// JWT verifier.
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The configuration is expected to have passed `AppConfig::validate`.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        scratch: ScratchStore,
    ) -> Result<Self, UpstreamError> {
        let ml = MlClient::new(&config.ml_service)?;
        let timeouts = config.timeouts.policy();
        let tokens = TokenVerifier::new(&config.auth.jwt_secret);

        Ok(Self {
            config: Arc::new(config),
            metadata,
            ml: Arc::new(ml),
            scratch: Arc::new(scratch),
            timeouts,
            tokens: Arc::new(tokens),
        })
    }
}
