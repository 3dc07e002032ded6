mod config;
mod db;
mod errors;
mod import;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod tailoring;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::session::SessionConfig;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::file::FileStore;
use crate::store::postgres::PgStore;
use crate::store::workspace::ResumeWorkspace;
use crate::store::ResumeStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumeCrafter API v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    info!("Resume store: {}", store.describe());

    let workspace = ResumeWorkspace::open(store).await?;

    // AI settings start empty; the client configures them per session
    let session = SessionConfig::new(config.llm_timeout);

    let state = AppState {
        workspace: Arc::new(Mutex::new(workspace)),
        session,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Postgres when `DATABASE_URL` is set, otherwise a JSON file under `DATA_DIR`.
async fn open_store(config: &Config) -> Result<Arc<dyn ResumeStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            Ok(Arc::new(PgStore::new(pool).await?))
        }
        None => Ok(Arc::new(FileStore::new(&config.data_dir))),
    }
}
