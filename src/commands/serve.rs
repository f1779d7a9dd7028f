//! HTTP server command implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use parley::booking::{BookingEngine, MemoryBookingStore};
use parley::config::Config;
use parley::conversation::{
    AnswerGenerator, IntentClassifier, Orchestrator, OrchestratorSettings,
};
use parley::llm::{LlmProvider, OpenAiCompatibleProvider};
use parley::retrieval::{HttpRetriever, Retriever};
use parley::server::{self, AppState};
use parley::session::MemorySessionStore;

pub async fn run(
    config_path: &str,
    host_override: Option<IpAddr>,
    port_override: Option<u16>,
) -> Result<()> {
    let mut config = Config::load(config_path).await?;

    // CLI overrides config
    if let Some(host) = host_override {
        config.server.host = host.to_string();
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let client = reqwest::Client::new();
    let llm_timeout = Duration::from_secs(config.llm.request_timeout_seconds);

    let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(
        client.clone(),
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
    ));
    if config.llm.api_key.is_none() {
        warn!("no llm api key configured; provider calls may be rejected");
    }

    let classifier = IntentClassifier::new(provider.clone(), config.llm.model.clone(), llm_timeout);
    let generator = AnswerGenerator::new(
        provider,
        config.llm.model.clone(),
        config.llm.temperature,
        config.llm.max_tokens,
        llm_timeout,
    );

    let retriever: Option<Arc<dyn Retriever>> = match config.retrieval.base_url.clone() {
        Some(base_url) => {
            info!(%base_url, "using external retrieval service");
            Some(Arc::new(HttpRetriever::new(client, base_url)))
        }
        None => {
            warn!("no retrieval service configured; answering without document context");
            None
        }
    };

    let booking = BookingEngine::new(
        Arc::new(MemoryBookingStore::new()),
        config.booking.clone(),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(MemorySessionStore::new()),
        retriever,
        classifier,
        generator,
        booking,
        OrchestratorSettings {
            session_ttl: Duration::from_secs(config.session.ttl_seconds),
            history_window: config.session.history_window,
            top_k: config.retrieval.top_k,
            retrieval_timeout: Duration::from_secs(config.retrieval.request_timeout_seconds),
        },
    ));
    orchestrator.spawn_lock_cleanup();

    let app = server::build_app(
        AppState { orchestrator },
        config.server.request_timeout_seconds,
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, version = parley::build_info::VERSION, "parley listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
