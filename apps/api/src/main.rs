use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_api::config::Config;
use resume_api::generation::engine::ChromiumEngine;
use resume_api::generation::generator::DocumentGenerator;
use resume_api::routes::build_router;
use resume_api::state::AppState;
use resume_api::uploads::UploadStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Upload directory
    let uploads = UploadStore::open(&config.upload_dir)
        .await
        .with_context(|| format!("Cannot create upload directory {}", config.upload_dir.display()))?;
    info!("Upload store ready at {}", uploads.dir().display());

    // Rendering engine (one browser per request, nothing launched here)
    let engine_config = config.engine_config();
    info!(
        "PDF engine: executable={} sandbox={} idle_timeout={:?}",
        engine_config
            .executable
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "auto-detect".to_string()),
        engine_config.sandbox,
        engine_config.idle_timeout
    );
    let generator = DocumentGenerator::new(
        &config.templates_dir,
        Arc::new(ChromiumEngine::new(engine_config)),
    );

    // Build app state
    let state = AppState {
        generator: Arc::new(generator),
        uploads: Arc::new(uploads),
        public_url: config.public_url_policy(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
