mod catalog;
mod config;
mod cv;
mod engine;
mod errors;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::default_catalog;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{DocumentStore, InMemoryStore, RedisStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{crate_target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ozgecmis API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the session store (REDIS_URL=memory runs without Redis for local dev)
    let store: Arc<dyn DocumentStore> = if config.redis_url == "memory" {
        info!("Using in-memory session store");
        Arc::new(InMemoryStore::default())
    } else {
        let redis = redis::Client::open(config.redis_url.clone())?;
        info!("Redis session store initialized");
        Arc::new(RedisStore::new(redis))
    };

    // Build the field catalog once; handlers pass it into every engine call
    let catalog = Arc::new(default_catalog());
    info!("Field catalog loaded ({} fields)", catalog.fields().len());

    let state = AppState {
        store,
        catalog,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
