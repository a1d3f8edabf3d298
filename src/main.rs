use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

use strokecare_backend::build_app;
use strokecare_backend::config::Config;
use strokecare_backend::state::AppState;
use strokecare_backend::utils::logger::init_logger;

/// First config file that exists, or the built-in defaults
fn load_config() -> Result<(Config, Option<String>)> {
    for path in Config::candidate_paths() {
        if !Path::new(&path).exists() {
            continue;
        }
        let config = Config::load(&path).with_context(|| format!("Failed to load config from {}", path))?;
        return Ok((config, Some(path)));
    }
    Ok((Config::default(), None))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
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

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (mut config, loaded_path) = load_config()?;
    config.apply_env_overrides();
    init_logger(&config.logging);

    match &loaded_path {
        Some(path) => info!("Loaded configuration from: {}", path),
        None => info!("No configuration file found, using defaults"),
    }

    let app_state = AppState::new(config.clone()).await?;
    if config.speech.warmup {
        app_state.speech.warmup();
    }

    let app = build_app(app_state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let purged = app_state.speech.purge_cloned_voices().await;
    info!("Shutdown complete, {} cloned voice(s) purged", purged);

    Ok(())
}
