// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps internal errors onto HTTP status codes and WS `error` frames.
//! Kept as one module so the status-code policy lives in exactly one
//! place instead of being re-derived per route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use xoblas_editor::EditorError;
use xoblas_execute::ExecuteError;
use xoblas_fsmirror::FsMirrorError;
use xoblas_lsp::LspError;
use xoblas_pty::PtyError;
use xoblas_sandbox::SandboxError;
use xoblas_session::SessionError;

use crate::fs_registry::FsRegistryError;
use crate::persistence::PersistenceBackendError;

/// Top-level error a route handler can return, converted to an HTTP
/// response by `IntoResponse` for the plain HTTP routes (`/execute`,
/// `/get_outputs`, `/ping`). WebSocket routes match on the same variants,
/// via `closes_connection`, to decide between an `error` frame and
/// closing the connection.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error(transparent)]
    FsMirror(#[from] FsMirrorError),
    #[error(transparent)]
    FsRegistry(#[from] FsRegistryError),
    #[error(transparent)]
    Lsp(#[from] LspError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error(transparent)]
    Persistence(#[from] PersistenceBackendError),
    #[error("persistence backend is not configured")]
    PersistenceUnconfigured,
    #[error("failed to save execution: {0}")]
    SaveFailed(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("failed to fetch outputs: {0}")]
    GetOutputsFailed(String),
}

impl DaemonError {
    /// Status code for the HTTP routes. `/execute`'s own 200/201/400
    /// success-path split lives in `routes::execute`; this only covers
    /// the failure paths shared across every route.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DaemonError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DaemonError::Session(SessionError::Stopping(_)) => StatusCode::SERVICE_UNAVAILABLE,
            DaemonError::Session(_) | DaemonError::Sandbox(_) => StatusCode::BAD_GATEWAY,
            DaemonError::Persistence(_) | DaemonError::PersistenceUnconfigured | DaemonError::SaveFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            DaemonError::Pty(_)
            | DaemonError::FsMirror(_)
            | DaemonError::FsRegistry(_)
            | DaemonError::Lsp(_)
            | DaemonError::Editor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DaemonError::Execute(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DaemonError::GetOutputsFailed(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Text sent in a WS `error` message, shared by all three sockets.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether an error on a WebSocket route should end the connection
    /// rather than just emit an `error` frame and keep reading: a dead
    /// PTY or a draining session can't usefully serve any further
    /// `command`/`input` on that connection, but other failures (a
    /// malformed message, a transient mirror/LSP hiccup) shouldn't take
    /// the whole socket down.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            DaemonError::Pty(_)
                | DaemonError::Editor(EditorError::Pty(_))
                | DaemonError::Session(SessionError::Stopping(_))
        )
    }
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = %status, "request failed");
        let body = json!({ "error": self.message() });
        (status, axum::Json(body)).into_response()
    }
}
