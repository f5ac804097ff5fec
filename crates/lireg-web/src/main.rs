use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lireg_core::Pipeline;
use lireg_core::config_file;
use lireg_pdf_mupdf::MupdfBackend;
use lireg_web::{AppState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let file = config_file::load_config();
    let config = config_file::resolve_config(&file);
    let port = config_file::resolve_port(&file, |name| std::env::var(name).ok());
    let pipeline = Pipeline::live(config, Arc::new(MupdfBackend::new()));
    info!(config = ?pipeline.config(), "pipeline configuration");
    let state = Arc::new(AppState::new(pipeline));

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
