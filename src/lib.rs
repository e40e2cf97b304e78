pub mod api; // HTTP surface
pub mod backend; // Persistence collaborator
pub mod config;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::backend::{BackendClient, BackendError};
use crate::config::{AppConfig, ConfigError, COLLABORATOR_TIMEOUT_SECS};
use crate::pipeline::triage::{
    EscalationPolicy, OllamaClient, RemoteClassifier, TriageEngine, TriageError,
    UnavailableClassifier, UrgencyClassifier,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Triage collaborator setup failed: {0}")]
    Triage(#[from] TriageError),

    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire the engine from configuration. Blocking HTTP clients are created
/// here, so this must run outside the async runtime.
pub fn build_engine(cfg: &AppConfig) -> Result<TriageEngine, StartupError> {
    let llm = OllamaClient::new(&cfg.ollama_base_url, cfg.ollama_timeout_secs)?;

    let classifier: Box<dyn UrgencyClassifier> = match &cfg.ml_service_url {
        Some(url) => Box::new(RemoteClassifier::new(url, COLLABORATOR_TIMEOUT_SECS)?),
        None => {
            tracing::warn!("ML_SERVICE_URL not set, classifier predictions degrade to routine");
            Box::new(UnavailableClassifier)
        }
    };

    let mut engine = TriageEngine::new(Box::new(llm), &cfg.model_name, classifier).with_policy(
        EscalationPolicy {
            literal_red_match: cfg.literal_red_match,
        },
    );

    match &cfg.backend {
        Some(b) => {
            let client =
                BackendClient::new(&b.base_url, &b.username, &b.password, COLLABORATOR_TIMEOUT_SECS)?;
            engine = engine.with_backend(Arc::new(client));
        }
        None => tracing::warn!("BACKEND_BASE_URL not set, triage cases will not be persisted"),
    }

    Ok(engine)
}

pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let cfg = AppConfig::from_env()?;
    let engine = build_engine(&cfg)?;

    match engine.llm().is_model_available(engine.model_name()) {
        Ok(true) => tracing::info!(model = engine.model_name(), "Generation model available"),
        Ok(false) => tracing::warn!(
            model = engine.model_name(),
            "Generation model not found, requests will use the fallback narrative"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not reach Ollama at startup"),
    }

    // Held until the runtime is gone so the engine's blocking clients are
    // dropped outside async context.
    let ctx = ApiContext::new(engine);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut server = api::start_server(ctx.clone(), &cfg.allowed_origins, cfg.bind_addr).await?;
        tracing::info!(addr = %server.session.server_addr, "Listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok::<(), StartupError>(())
    })?;

    drop(runtime);
    drop(ctx);
    Ok(())
}
