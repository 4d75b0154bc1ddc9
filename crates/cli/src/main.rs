// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point: no arguments, no subcommands. Loads `jobConfig.json`,
//! starts every enabled job, serves the dashboard API, and shuts down
//! cleanly on SIGINT.

use std::process::ExitCode;
use std::sync::Arc;

use rooster_core::SystemClock;
use rooster_daemon::Manager;
use rooster_storage::ConfigStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let store = Arc::new(ConfigStore::discover());
    let manager = Arc::new(Manager::new(SystemClock, store));
    manager.start().await;

    let (listener, port) = match rooster_http::bind_with_port_walk(manager.dashboard_port()).await {
        Ok(bound) => bound,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind the dashboard port");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(port, "dashboard listening");

    let app = rooster_http::router(manager.clone());
    let shutdown_manager = manager.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_manager.stop_all().await;
    });

    if let Err(err) = server.await {
        tracing::error!(error = %err, "http server exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
