//! listshare server entry point.
//!
//! # Responsibility
//! - Read configuration, start logging, open the list store and serve the
//!   HTTP routes until the process is stopped.

mod config;

use config::ServerConfig;
use listshare_core::db::open_db;
use listshare_core::init_logging;
use listshare_http::{router, AppState, JwtAuthGate};
use log::{error, info};
use std::process::ExitCode;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=cli status=error error={err}");
            eprintln!("listshare: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = ServerConfig::from_env().map_err(|err| err.to_string())?;
    init_logging(&config.log_level, &config.log_dir.to_string_lossy())?;

    let conn = open_db(&config.db_path).map_err(|err| {
        format!(
            "failed to open list store `{}`: {err}",
            config.db_path.display()
        )
    })?;
    let state = AppState::new(conn, JwtAuthGate::new(&config.jwt_secret), config.visibility);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| format!("failed to bind {}: {err}", config.bind_addr))?;
    info!(
        "event=server_start module=cli status=ok version={} bind_addr={} db_path={} visibility={}",
        listshare_core::core_version(),
        config.bind_addr,
        config.db_path.display(),
        config.visibility.as_str()
    );

    axum::serve(listener, router(state))
        .await
        .map_err(|err| format!("server error: {err}"))
}
