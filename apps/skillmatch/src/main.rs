mod config;
mod errors;
mod llm_client;
mod routes;
mod skills;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::skills::{DisabledMatcher, ExternalMatcher, LlmSkillMatcher, SkillReconciler, SkillTables};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparsable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting skillmatch v{}", env!("CARGO_PKG_VERSION"));

    // Static skill tables, shared read-only by every request
    let tables = Arc::new(SkillTables::builtin());
    info!("Skill tables loaded (version {})", tables.version());

    // External matcher (DisabledMatcher unless a key is configured and enabled)
    let matcher: Arc<dyn ExternalMatcher> = match config.external_matcher_key() {
        Some(key) => {
            let llm = LlmClient::new(key.to_string()).context("Failed to build LLM client")?;
            info!(
                "External matcher enabled (model: {}, timeout: {}s)",
                llm_client::MODEL,
                config.matcher_timeout.as_secs()
            );
            Arc::new(LlmSkillMatcher::new(llm, config.matcher_timeout))
        }
        None => {
            warn!("External matcher disabled, reconciling with the cascade only");
            Arc::new(DisabledMatcher)
        }
    };

    let reconciler = SkillReconciler::new(tables, matcher, config.max_skills_per_category);
    info!(
        "Reconciler ready (matcher: {}, max skills per category: {})",
        reconciler.matcher_backend(),
        config.max_skills_per_category
    );

    // Build app state
    let state = AppState {
        reconciler: Arc::new(reconciler),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
