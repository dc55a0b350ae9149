use std::process::ExitCode;
use std::sync::Arc;

use ratbot::commands::Dispatcher;
use ratbot::config::Config;
use ratbot::db::Database;
use ratbot::error::BootstrapError;
use ratbot::{api, discord, keepalive, logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ratbot: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(config.log_format, config.log_file.as_deref()) {
        eprintln!("ratbot: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), BootstrapError> {
    metrics::register_metrics();

    let db = Arc::new(Database::new(&config.database_url).await?);

    // Spawn background keep-alive so the backend connection never idles out
    let keepalive = keepalive::spawn_keepalive(db.clone(), config.keepalive_interval);

    let ops_server = match config.http_port {
        Some(port) => {
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            let db = db.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = api::serve(listener, db).await {
                    tracing::error!("Ops server stopped: {e}");
                }
            }))
        }
        None => None,
    };

    let dispatcher = Arc::new(Dispatcher::new(db.clone(), config.prefix.clone()));

    let result = tokio::select! {
        result = discord::run_bot(&config.discord_token, dispatcher) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            Ok(())
        }
    };

    keepalive.abort();
    if let Some(handle) = ops_server {
        handle.abort();
    }
    db.close().await;
    tracing::info!("Ratbot stopped");
    result
}
