use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use ouzi_backend::config::Config;
use ouzi_backend::db::config::DbConfig;
use ouzi_backend::db::Database;
use ouzi_backend::logging::{init_tracing, LogSettings};
use ouzi_backend::state::AppState;
use ouzi_backend::storage::LocalObjectStore;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));

    let db = match Database::connect_and_migrate(&DbConfig::from_env()).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "database initialization failed");
            return ExitCode::FAILURE;
        }
    };

    let object_store = match LocalObjectStore::new(&config.media).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, dir = %config.media.dir.display(), "media store initialization failed");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_addr();
    let state = AppState::new(config, db.clone(), object_store);
    let app = ouzi_backend::build_app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "ouzi backend listening");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(err) = server.await {
        tracing::error!(error = %err, "server error");
    }

    tracing::info!("HTTP server stopped, closing database pool");
    db.close().await;
    tracing::info!("graceful shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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
