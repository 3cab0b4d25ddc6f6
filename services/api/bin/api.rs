//! Main Entrypoint for the Lyceum API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Connecting the roster (Postgres, or the in-memory demo classroom).
//! 3. Building the text-completion backend and the simulation service.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use lyceum_api::{
    config::{Config, Provider},
    db::Db,
    router::create_router,
    state::AppState,
};
use lyceum_core::{
    SimulationService,
    bus::RealtimeBus,
    curriculum::{CurriculumService, LlmCurriculumService, StaticCurriculumService},
    llm_client::{MockCompletion, OpenAiCompatibleCompletion, TextCompletion},
    roster::{InMemoryRoster, RosterRepository},
    store::SessionStore,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn completion_backend(config: &Config) -> anyhow::Result<Arc<dyn TextCompletion>> {
    let (api_key, api_base, provider) = match config.provider {
        Provider::Mock => {
            info!("Using deterministic mock completions.");
            return Ok(Arc::new(MockCompletion));
        }
        Provider::OpenAI => (
            config.openai_api_key.as_ref().context("OPENAI_API_KEY is not set")?,
            "https://api.openai.com/v1/",
            "openai",
        ),
        Provider::Gemini => (
            config.gemini_api_key.as_ref().context("GEMINI_API_KEY is not set")?,
            "https://generativelanguage.googleapis.com/v1beta/openai",
            "gemini",
        ),
    };
    info!(provider, "Using OpenAI-compatible completions.");
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    Ok(Arc::new(OpenAiCompatibleCompletion::new(
        openai_config,
        config.chat_model.clone(),
        provider,
    )))
}

async fn roster(config: &Config) -> anyhow::Result<Arc<dyn RosterRepository>> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to database")?;
            let db = Db::new(pool);
            db.run_migrations().await?;
            info!("Database connection established and migrations are up-to-date.");
            Ok(Arc::new(db))
        }
        None => {
            warn!("DATABASE_URL not set; serving the in-memory demo classroom.");
            Ok(Arc::new(InMemoryRoster::demo()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Roster ---
    let roster = roster(&config).await?;

    // --- 4. Initialize Shared Services ---
    let completion = completion_backend(&config)?;
    let curriculum: Arc<dyn CurriculumService> = match config.provider {
        Provider::Mock => Arc::new(StaticCurriculumService),
        Provider::OpenAI | Provider::Gemini => {
            Arc::new(LlmCurriculumService::new(completion.clone()))
        }
    };
    let service = SimulationService::new(
        Arc::new(SessionStore::new()),
        RealtimeBus::new(),
        roster,
        curriculum,
        completion,
    );
    let app_state = Arc::new(AppState::new(service, config.event_bus_capacity));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state.clone()).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    app_state.gateway.detach();
    info!("Server has shut down.");
    Ok(())
}
