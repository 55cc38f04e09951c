use mimalloc::MiMalloc;
use nawth::config::CONFIG;
use nawth::db::{ConnectionManager, MIGRATIONS, MigrationRunner};
use nawth::server::{AppState, app_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        backend = cfg.database.backend.as_str(),
        database_url = %cfg.database.url,
        document_path = ?cfg.database.document_path,
        max_connections = cfg.database.max_connections,
        run_migrations = cfg.database.run_migrations,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        "effective config"
    );

    let db = Arc::new(ConnectionManager::from_config(&cfg.database));

    if cfg.database.run_migrations {
        match db.handle().await {
            Ok(backend) => {
                let report = MigrationRunner::new(backend.as_ref()).run(MIGRATIONS).await;
                if !report.is_clean() {
                    warn!(failed = ?report.failed, "some migrations failed; continuing");
                }
            }
            Err(e) => {
                // Startup continues; `/ready` keeps retrying the connection.
                warn!(error = %e, "database unavailable at startup, migrations skipped");
            }
        }
    }

    let state = AppState::new(db.clone());
    let app = app_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.disconnect().await;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
