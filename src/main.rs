//! Document ingestion server: multipart upload in, SSE extraction results out.

use doc_ingest::config::ServerConfig;
use doc_ingest::llm::OpenRouterClient;
use doc_ingest::server::{router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ingest=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let model = OpenRouterClient::new(config.api_key.clone(), config.model.clone());
    info!("OpenRouter client initialized (model={})", config.model);

    let state = AppState::new(Arc::new(model), config.max_files);
    let app = router(state, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        "Server listening on http://{} (max {} files per upload)",
        config.bind_addr, config.max_files
    );
    axum::serve(listener, app).await?;

    Ok(())
}
