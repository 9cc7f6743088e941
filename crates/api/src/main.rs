use std::net::SocketAddr;
use std::sync::Arc;

use storyme_core::script::MAX_SCENES;
use storyme_core::subject::KeywordTables;
use storyme_pipeline::orchestrator::GenerationPipeline;
use storyme_pipeline::storage::LocalImageStore;
use storyme_providers::registry::ProviderRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyme_api::config::ServerConfig;
use storyme_api::router::build_app_router;
use storyme_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    // Production emits JSON records; development keeps the readable format.
    let production = config.log_mode.is_production();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "storyme_api=debug,storyme_pipeline=debug,storyme_providers=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(production.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!production).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_mode = ?config.log_mode,
        "Loaded server configuration",
    );
    if !config.batch_budget_covers_max_scenes() {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            scene_timeout_secs = config.scene_timeout_secs,
            max_scenes = MAX_SCENES,
            "Batch budget is shorter than max scenes times the scene timeout; \
             long batches may end with scenes failed for lack of time",
        );
    }

    // --- Subject keywords ---
    let keyword_tables = match &config.subject_keywords_path {
        Some(path) => {
            let tables = KeywordTables::from_json_file(path)
                .expect("Failed to load SUBJECT_KEYWORDS_PATH");
            tracing::info!(path = %path.display(), "Loaded subject keyword tables");
            tables
        }
        None => KeywordTables::default(),
    };

    // --- Providers ---
    let registry = Arc::new(ProviderRegistry::from_config(&config.providers));
    for status in registry.availability() {
        tracing::info!(
            provider = %status.kind,
            available = status.available,
            is_default = status.is_default,
            "Image provider",
        );
    }
    if !registry.any_available() {
        tracing::warn!("No image provider is configured; generation requests will fail with 503");
    }

    // --- Storage ---
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .expect("Failed to create STORAGE_DIR");
    let store = Arc::new(LocalImageStore::new(
        config.storage_dir.clone(),
        config.public_base_url.clone(),
    ));
    tracing::info!(dir = %config.storage_dir.display(), "Image storage ready");

    // --- Pipeline ---
    let pipeline = Arc::new(GenerationPipeline::new(
        registry,
        store,
        config.pipeline_config(keyword_tables),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        pipeline,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). In-flight batches
/// finish before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
