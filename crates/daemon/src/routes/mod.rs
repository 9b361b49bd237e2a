// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route assembly: one `axum::Router` wiring the daemon's five endpoints
//! onto `AppState`.

pub mod execute;
pub mod filesystem;
pub mod lsp;
pub mod terminal;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Name of the header every HTTP route reads the calling user's id from.
/// Used for both `/execute` and `/get_outputs`.
pub const USER_HEADER: &str = "X-User";

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/execute", post(execute::execute))
        .route("/get_outputs", post(execute::get_outputs))
        .route("/ws/terminal/:user_id", get(terminal::upgrade))
        .route("/ws/filesystem/:user_id", get(filesystem::upgrade))
        .route("/ws/lsp/:user_id", get(lsp::upgrade))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}
