// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use aceinbase::config::{Config, EVICTION_INTERVAL};
use aceinbase::quiz::session::SharedModel;
use aceinbase::routes;
use aceinbase::services::gemini::GeminiClient;
use aceinbase::services::progress::{ProgressStore, SqliteStore};
use aceinbase::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Open the progress database (runs migrations) with retry
    let mut retry_count = 0;
    let store = loop {
        match SqliteStore::connect(&config.database_url).await {
            Ok(store) => break store,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open progress database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Progress database ready.");

    // A missing API key is reported once here; quizzes then fail to start
    // while the dashboard keeps working.
    let model: Option<SharedModel> = match GeminiClient::from_config(&config) {
        Ok(client) => {
            tracing::info!(
                chat_model = %config.chat_model,
                review_model = %config.review_model,
                "Gemini client initialized"
            );
            Some(Arc::new(client) as SharedModel)
        }
        Err(e) => {
            tracing::error!("Failed to initialize Gemini client: {}", e);
            None
        }
    };

    let state = AppState::new(config.clone(), model, ProgressStore::new(Arc::new(store)));
    state.spawn_eviction(EVICTION_INTERVAL);

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
