// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/lsp/{user_id}`. The proxy speaks raw JSON-RPC in both directions:
//! inbound WS text frames are forwarded verbatim onto the LSP server's
//! stdin, and everything the server writes is forwarded verbatim back,
//! framed by `xoblas-lsp`'s Content-Length codec internally. Language is
//! taken from a `?language=` query parameter, defaulting to `python` —
//! the only language the proxy currently knows how to start.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use xoblas_core::{sanitize_user_id, ConnectionId};
use xoblas_lsp::LspProxy;

use crate::error::DaemonError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LspQuery {
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "python".to_string()
}

pub async fn upgrade(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(query): Query<LspQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, query.language, state))
}

async fn handle_socket(socket: WebSocket, raw_user_id: String, language: String, state: AppState) {
    let user_id = sanitize_user_id(&raw_user_id);
    let connection_id = ConnectionId::new(uuid::Uuid::new_v4().to_string());
    let (mut sink, mut stream) = socket.split();

    let session = match state.sessions.acquire(&user_id, connection_id.clone()).await {
        Ok(session) => session,
        Err(e) => {
            let _ = sink.send(error_message(&e.to_string())).await;
            return;
        }
    };
    let Some(instance) = session.instance_id() else {
        let _ = sink.send(error_message("session has no sandbox instance")).await;
        state.sessions.release(&user_id, &connection_id);
        return;
    };

    let proxy = match state.lsp.get_or_create(state.driver.as_ref(), &instance, &user_id, &language).await {
        Ok(proxy) => proxy,
        Err(e) => {
            let _ = sink.send(error_message(&e.to_string())).await;
            state.sessions.release(&user_id, &connection_id);
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let reader_task = spawn_server_reader(proxy.clone(), tx);

    let writer_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let text = String::from_utf8_lossy(&payload).into_owned();
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let raw = match frame {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        if let Err(e) = proxy.forward_client_message(&raw).await {
            let daemon_err = DaemonError::from(e);
            tracing::warn!(user = %user_id, language, error = %daemon_err, "failed to forward message to lsp server");
            if daemon_err.closes_connection() {
                break;
            }
        }
    }

    reader_task.abort();
    writer_task.abort();
    state.sessions.release(&user_id, &connection_id);
}

fn spawn_server_reader(proxy: Arc<LspProxy>, tx: mpsc::UnboundedSender<Vec<u8>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match proxy.next_server_message().await {
                Ok(payload) => {
                    if tx.send(payload).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "lsp server stream ended");
                    break;
                }
            }
        }
    })
}

fn error_message(text: &str) -> Message {
    let body = serde_json::json!({"type": "error", "message": text});
    Message::Text(body.to_string())
}

#[cfg(test)]
#[path = "lsp_tests.rs"]
mod tests;
