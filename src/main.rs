mod agents;
mod analysis;
mod api;
mod auth;
mod cache;
mod config;
mod error;
mod metrics;
mod model;
mod store;
mod upstream;

use std::sync::Arc;

use analysis::AnalysisService;
use api::AppState;
use cache::ResultCache;
use config::AppConfig;
use metrics::Metrics;
use store::{MemoryStore, Store};
use tracing_subscriber::EnvFilter;
use upstream::{ChatClient, ChatCompletion, SummaryClient, Summarize};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    let metrics = Metrics::new()?;
    let cache = ResultCache::new(cfg.cache_ttl);

    let cleaning_provider: Option<Arc<dyn ChatCompletion>> = match &cfg.cleaning {
        Some(provider_cfg) => Some(Arc::new(ChatClient::try_new(provider_cfg)?)),
        None => {
            tracing::warn!("cleaning provider not configured; stage will serve fallbacks");
            None
        }
    };
    let classifier_provider: Option<Arc<dyn ChatCompletion>> = match &cfg.classifier {
        Some(provider_cfg) => Some(Arc::new(ChatClient::try_new(provider_cfg)?)),
        None => {
            tracing::warn!("classifier provider not configured; stage will serve fallbacks");
            None
        }
    };
    let summary_provider: Option<Arc<dyn Summarize>> = match &cfg.summarizer {
        Some(provider_cfg) => Some(Arc::new(SummaryClient::try_new(provider_cfg)?)),
        None => {
            tracing::warn!("summary provider not configured; stage will serve fallbacks");
            None
        }
    };

    let orchestrator = agents::orchestrator::Orchestrator::new(
        cleaning_provider,
        classifier_provider,
        summary_provider,
        cache.clone(),
        metrics.clone(),
    );
    let analysis = AnalysisService::new(orchestrator, cache, metrics.clone());

    let state = AppState {
        analysis,
        store: Store::new(MemoryStore::new()),
        auth: cfg.auth.clone(),
        metrics,
    };

    let app = api::router(state);

    let listen_addr = cfg.listen_addr;
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    tracing::info!(%listen_addr, "starting veriline analysis service");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("veriline exited cleanly");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term_signal) => term_signal.recv().await,
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                None
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
