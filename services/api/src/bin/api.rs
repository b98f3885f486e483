//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        FileCacheStore, MemoryCacheStore, WebhookCalendarAdapter, WebhookClient,
        WebhookGenerationAdapter, WebhookTranscriptionAdapter,
    },
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use post_planner_core::{CacheStore, Planner, TranscriptionService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build the HTTP client: {}", e)))?;

    let generation = Arc::new(WebhookGenerationAdapter::new(WebhookClient::new(
        http.clone(),
        config.generation_webhook_url.clone(),
    )));
    let calendar = Arc::new(WebhookCalendarAdapter::new(WebhookClient::new(
        http.clone(),
        config.calendar_webhook_url.clone(),
    )));
    let transcription = config.transcription_webhook_url.clone().map(|url| {
        Arc::new(WebhookTranscriptionAdapter::new(WebhookClient::new(
            http.clone(),
            url,
        ))) as Arc<dyn TranscriptionService>
    });
    if transcription.is_none() {
        info!("TRANSCRIPTION_WEBHOOK_URL is not set; dictation is disabled.");
    }
    let cache_store: Arc<dyn CacheStore> = match &config.cache_path {
        Some(path) => {
            info!("Caching generated content in {}", path.display());
            Arc::new(FileCacheStore::new(path.clone()))
        }
        None => Arc::new(MemoryCacheStore::default()),
    };

    // --- 3. Restore the Previous Session ---
    let planner = Arc::new(Planner::new(generation, calendar, cache_store, transcription));
    planner.restore().await;
    if let Err(e) = planner.refresh_calendar().await {
        warn!("Initial calendar load failed: {}", e);
    }

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        planner,
        config: config.clone(),
    });
    let app = router(app_state)?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
