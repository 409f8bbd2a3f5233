use anyhow::{Context, Result};
use std::sync::Arc;

use crate::api::{HttpClient, Transport};
use crate::app::Config;
use crate::health::HealthMonitor;
use crate::orchestrator::RequestOrchestrator;

/// Resolved configuration plus the one transport every component shares
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// How the analysis service is reached
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// Build state talking HTTP to `config.api_url`
    pub fn new(config: Config) -> Result<Self> {
        let client = HttpClient::new(&config.api_url, config.requests.timeout())
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;

        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Build state over any transport (tests, alternative clients)
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// A fresh orchestrator; one per view so guards don't interfere
    pub fn orchestrator(&self) -> RequestOrchestrator {
        RequestOrchestrator::new(Arc::clone(&self.transport), self.config.requests.clone())
    }

    /// A stopped health monitor using the configured timing
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(Arc::clone(&self.transport), &self.config.health)
    }
}
