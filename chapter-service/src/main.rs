use chapter_service::config::ChapterConfig;
use chapter_service::services::init_metrics;
use chapter_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ChapterConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "chapter-service",
        config.common.log_level(),
        config.common.otlp_endpoint.as_deref(),
    );

    // Must run before any metrics are recorded
    init_metrics()?;

    let application = Application::build(config).await?;
    tracing::info!(
        port = application.port(),
        firestore_connected = application.is_store_connected(),
        "Starting chapter-service"
    );

    let result = application.run_until_stopped().await;
    shutdown_tracing();

    result.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })
}
