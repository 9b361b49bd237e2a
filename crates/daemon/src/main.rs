// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xoblasd`: binds the per-user session orchestrator onto HTTP/WebSocket.
//! Grounded on `groblegark-oddjobs`'s daemon `main.rs`: `#[tokio::main]`,
//! a `setup_logging` helper returning the `tracing_appender::non_blocking`
//! `WorkerGuard` that must outlive the whole run, and config loaded once
//! up front.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing::{error, info};

use xoblas_daemon::config::Config;
use xoblas_daemon::editor_registry::EditorRegistry;
use xoblas_daemon::fs_registry::FsMirrorRegistry;
use xoblas_daemon::persistence::PostgresStore;
use xoblas_daemon::{build_router, AppState};
use xoblas_lsp::LspRegistry;
use xoblas_sandbox::docker::DockerSandboxDriver;
use xoblas_sandbox::SandboxDriver;
use xoblas_session::SessionRegistry;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _guard = setup_logging();
    info!(bind_addr = %config.bind_addr, env = %config.env, "starting xoblasd");

    let state = match build_state(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to initialize daemon state");
            std::process::exit(1);
        }
    };

    let cors = build_cors(&config);
    let router = build_router(state, cors);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(addr = %config.bind_addr, "xoblasd listening");
    if let Err(e) = axum::serve(listener, router).await {
        error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}

async fn build_state(config: Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let driver: Arc<dyn SandboxDriver> = Arc::new(DockerSandboxDriver::new(config.image_tag.clone()));
    driver.build_image().await?;

    let store: Option<Arc<dyn xoblas_daemon::state::CombinedStore>> = match &config.postgres_connection_string {
        Some(connection_string) => {
            let store = PostgresStore::connect(connection_string).await?;
            store.migrate().await?;
            Some(Arc::new(store))
        }
        None => {
            tracing::warn!("POSTGRES_CONNECTION_STRING unset; /execute's should_save path will fail");
            None
        }
    };

    Ok(AppState {
        config: Arc::new(config),
        sessions: Arc::new(SessionRegistry::new(driver.clone())),
        editors: Arc::new(EditorRegistry::new()),
        fs_mirrors: Arc::new(FsMirrorRegistry::new()),
        lsp: Arc::new(LspRegistry::new()),
        driver,
        store,
    })
}

fn build_cors(config: &Config) -> CorsLayer {
    // Development allows any origin; production rejects cross-origin
    // requests outright rather than guessing at an allowlist no one has
    // named.
    if config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    }
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    guard
}
