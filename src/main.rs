use std::sync::Arc;

use anyhow::{Context, anyhow};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use song_catalog::config::Settings;
use song_catalog::db::{self, Database};
use song_catalog::seed::load_seed;
use song_catalog::store::SongStore;
use song_catalog::{AppState, build_router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    info!("The value of DATABASE_SERVICE is: {}", settings.database_service);

    let seed = load_seed(&settings.seed_path)?;

    info!("Connecting to URL: {}", settings.redacted_database_url());
    let database = match Database::connect(&settings.database_url()).await {
        Ok(database) => database,
        Err(e) if db::is_auth_failure(&e) => return Err(anyhow!("Authentication error: {}", e)),
        Err(e) => return Err(e).context("failed to connect to database"),
    };
    info!("📊 Connected to PostgreSQL database {}", settings.database_name);

    let seeded = database
        .reset(seed)
        .await
        .context("failed to seed the songs collection")?;
    info!("📊 Seeded {} songs", seeded);

    let app = build_router(AppState::new(Arc::new(database)));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.http_port))
        .await
        .with_context(|| format!("failed to bind port {}", settings.http_port))?;
    info!("🎧 Song catalog listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
