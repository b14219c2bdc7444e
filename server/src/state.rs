//! Shared handler state

use std::sync::Arc;

use aura_audit::{AuditClient, AuditOrchestrator, GeminiEndpoint};
use aura_store::MarketStore;

use crate::config::AuraConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuraConfig>,
    pub store: Arc<dyn MarketStore>,
    pub orchestrator: AuditOrchestrator,
    /// Same endpoint the orchestrator calls; used for the model probe
    pub models: Arc<GeminiEndpoint>,
}

impl AppState {
    /// State with a Gemini endpoint built from `config`, key read from the environment.
    pub fn new(config: AuraConfig, store: Arc<dyn MarketStore>) -> Self {
        let endpoint = GeminiEndpoint::new(config.gemini_config());
        Self::with_endpoint(config, store, endpoint)
    }

    pub fn with_endpoint(
        config: AuraConfig,
        store: Arc<dyn MarketStore>,
        endpoint: GeminiEndpoint,
    ) -> Self {
        let models = Arc::new(endpoint);
        let orchestrator = AuditOrchestrator::new(
            Arc::clone(&store),
            AuditClient::new(models.clone()).with_timeout(models.config().timeout),
            config.normalize_limits(),
        );

        Self {
            config: Arc::new(config),
            store,
            orchestrator,
            models,
        }
    }
}
