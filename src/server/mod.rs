//! Churn prediction server
//!
//! REST API that serves the promoted model behind the `production` alias.
//! The feature schema is baked into the server so requests are encoded
//! without consulting the preprocessing artifacts.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServeError;
pub use state::{AppState, PromotedModel};

use crate::registry::ModelRegistry;
use crate::training::PRODUCTION_ALIAS;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub registry_dir: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5001),
            registry_dir: std::env::var("REGISTRY_DIR")
                .unwrap_or_else(|_| "./registry".to_string())
                .into(),
        }
    }
}

/// Resolve the production model, or none if the alias is missing or broken.
///
/// The server always starts; without a model every /predict returns 503
/// until a model is promoted and the server restarted.
fn load_promoted_model(registry_dir: &PathBuf) -> Option<PromotedModel> {
    let registry = match ModelRegistry::new(registry_dir) {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "failed to open model registry, serving degraded");
            return None;
        }
    };
    match registry.pull_alias(PRODUCTION_ALIAS) {
        Ok(Some((model, meta))) => {
            info!(
                model = %meta.name,
                model_id = %meta.model_id,
                "loaded production model"
            );
            Some(PromotedModel { model, meta })
        }
        Ok(None) => {
            warn!(alias = PRODUCTION_ALIAS, "no promoted model, serving degraded");
            None
        }
        Err(e) => {
            warn!(error = %e, "failed to load production model, serving degraded");
            None
        }
    }
}

/// Start the server with the given configuration.
pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let model = load_promoted_model(&config.registry_dir);

    let state = Arc::new(AppState::new(config.clone(), model));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        registry_dir = %config.registry_dir.display(),
        started_at = %start_time.to_rfc3339(),
        "Churn prediction server starting"
    );
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C handler");
            return;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServeConfig::default();
        assert_eq!(config.port, 5001);
    }

    #[test]
    fn test_missing_registry_yields_no_model() {
        let dir = tempfile::TempDir::new().unwrap();
        // Empty registry: alias file does not exist
        assert!(load_promoted_model(&dir.path().to_path_buf()).is_none());
    }
}
