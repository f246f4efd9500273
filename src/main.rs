//! Trivia Board Back binary entrypoint wiring REST, WebSocket and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_board_back::{
    config::AppConfig,
    dao::session_store::{MemorySessionStore, SessionStore},
    routes,
    state::{AppState, SharedState},
};

/// Storage backends selectable through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreBackend {
    Mongo,
    Memory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    match store_backend()? {
        StoreBackend::Memory => {
            info!("using in-memory session store");
            let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
            app_state.set_session_store(store).await;
        }
        StoreBackend::Mongo => spawn_mongo_supervisor(app_state.clone())?,
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.live().shutdown();
    Ok(())
}

/// Pick the storage backend from `STORE_BACKEND`, defaulting to MongoDB when compiled in.
fn store_backend() -> anyhow::Result<StoreBackend> {
    let Ok(value) = env::var("STORE_BACKEND") else {
        return Ok(if cfg!(feature = "mongo-store") {
            StoreBackend::Mongo
        } else {
            StoreBackend::Memory
        });
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
        other => anyhow::bail!("unknown STORE_BACKEND `{other}` (expected `mongo` or `memory`)"),
    }
}

/// Keep a MongoDB-backed store installed, reconnecting in the background.
#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) -> anyhow::Result<()> {
    use trivia_board_back::{
        dao::{
            session_store::mongodb::{MongoConfig, MongoSessionStore},
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();
    let max_attempts = env::var("MONGO_CONNECT_ATTEMPTS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok());

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let mut config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            if let Some(max_attempts) = max_attempts {
                config = config.with_max_attempts(max_attempts);
            }
            let store = MongoSessionStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SessionStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("STORE_BACKEND=mongo requires the `mongo-store` feature")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
