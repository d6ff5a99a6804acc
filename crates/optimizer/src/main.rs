//! Cost Optimizer - usage report analysis service
//!
//! Loads the classifier once at start-up and serves analysis requests until
//! interrupted.

use anyhow::{Context, Result};
use cost_optimizer::{api, config::ServerConfig};
use optimizer_lib::{
    classifier::{Classifier, OnnxClassifier, PolicyClassifier},
    ServiceMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn load_classifier(config: &ServerConfig, logger: &StructuredLogger) -> Result<Arc<dyn Classifier>> {
    let Some(model_path) = config.model_path.as_ref() else {
        warn!("No model_path configured, serving predictions from the labeling policy");
        return Ok(Arc::new(PolicyClassifier::new()));
    };

    let manifest_path = config
        .resolved_manifest_path()
        .context("Manifest path could not be derived from model path")?;
    let classifier = OnnxClassifier::load(model_path, &manifest_path)?;
    logger.log_model_loaded(
        &model_path.display().to_string(),
        &classifier.model_version(),
        classifier.manifest().classes.len(),
    );
    Ok(Arc::new(classifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cost-optimizer");

    let config = ServerConfig::load()?;
    info!(instance = %config.instance_name, addr = %config.listen_addr(), "Service configured");

    let logger = StructuredLogger::new(&config.instance_name);
    let metrics = ServiceMetrics::new();

    let classifier = load_classifier(&config, &logger)?;
    logger.log_startup(SERVICE_VERSION, &classifier.model_version(), &classifier.kind().to_string());

    let app_state = Arc::new(api::AppState::new(
        classifier,
        metrics,
        logger.clone(),
        config.max_upload_bytes,
    ));
    app_state.set_ready(true);

    let addr = config.listen_addr();
    let server = tokio::spawn(async move { api::serve(&addr, app_state).await });

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("server exited"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
