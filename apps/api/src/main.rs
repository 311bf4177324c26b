mod config;
mod errors;
mod llm_client;
mod render;
mod resume;
mod routes;
mod state;
mod tailoring;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::render::PdfLatexCompiler;
use crate::resume::sections::SectionMatcher;
use crate::resume::template_store::TemplateStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::tailoring::session::{spawn_idle_sweeper, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!(
        "LLM client initialized (model: {}, temperature: {})",
        llm_client::MODEL,
        llm_client::TEMPERATURE
    );

    // Initialize document compiler
    let compiler = PdfLatexCompiler::new(
        config.latex_command.clone(),
        config.output_dir.clone(),
        config.compile_timeout_secs,
    );
    info!(
        "Document compiler: {} → {}",
        config.latex_command,
        config.output_dir.display()
    );

    let templates = TemplateStore::new(config.template_path.clone());
    if !templates.path().exists() {
        // Not fatal: the template is re-read on every analysis.
        tracing::warn!("Resume template {} does not exist yet", templates.path().display());
    }

    let sessions = SessionStore::default();
    spawn_idle_sweeper(
        sessions.clone(),
        Duration::from_secs(config.session_idle_ttl_secs),
        Duration::from_secs(config.session_sweep_interval_secs),
    );
    info!(
        "Idle sessions expire after {}s (checked every {}s)",
        config.session_idle_ttl_secs, config.session_sweep_interval_secs
    );

    // Build app state
    let state = AppState {
        generator: Arc::new(llm),
        compiler: Arc::new(compiler),
        templates,
        sessions,
        matcher: SectionMatcher::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the UI origin once it is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
