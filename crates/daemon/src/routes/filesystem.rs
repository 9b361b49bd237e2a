// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/filesystem/{user_id}`. Grounded on `filesystem_socket.py`'s
//! `ws_filesystem`: connect starts the watcher and sends
//! `filesystem_connected`, then an initial-sync snapshot; inbound
//! `file_operation` batches apply through `xoblas-fsmirror` and echo a
//! `file_operation_result`; `start_watching`/`stop_watching` are a status
//! query/explicit-stop pair rather than gating the watcher's actual
//! lifetime, which tracks the session instead.
//!
//! One daemon-wide mirror per user is shared across every connection via
//! `FsMirrorRegistry`'s broadcast channel. Both the broadcast forwarder
//! and the client read loop feed a single `mpsc` channel drained by one
//! dedicated writer task, the same multiplexing shape
//! `saltyskip-cthulu`'s terminal handler uses for its own sink.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use xoblas_core::{sanitize_user_id, ConnectionId};
use xoblas_fsmirror::{apply_batch, ChangeEvent};
use xoblas_wire::filesystem::{FilesystemClientMessage, FilesystemServerMessage};

use crate::state::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, Path(user_id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(socket: WebSocket, raw_user_id: String, state: AppState) {
    let user_id = sanitize_user_id(&raw_user_id);
    let connection_id = ConnectionId::new(uuid::Uuid::new_v4().to_string());
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<FilesystemServerMessage>();

    let session = match state.sessions.acquire(&user_id, connection_id.clone()).await {
        Ok(session) => session,
        Err(e) => {
            let _ = sink.send(to_message(&FilesystemServerMessage::Error { message: e.to_string() })).await;
            return;
        }
    };
    let Some(instance) = session.instance_id() else {
        let _ = sink
            .send(to_message(&FilesystemServerMessage::Error { message: "session has no sandbox instance".to_string() }))
            .await;
        state.sessions.release(&user_id, &connection_id);
        return;
    };

    let handle = match state
        .fs_mirrors
        .get_or_start(state.driver.clone(), &user_id, &instance, &state.config.sandbox_root)
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            let _ = sink.send(to_message(&FilesystemServerMessage::Error { message: e.to_string() })).await;
            state.sessions.release(&user_id, &connection_id);
            return;
        }
    };

    let _ = tx.send(FilesystemServerMessage::FilesystemConnected);
    let initial = handle.initial_sync();
    let _ = tx.send(FilesystemServerMessage::FilesystemInitialSync {
        files: initial.files,
        watch_path: state.config.sandbox_root.clone(),
        timestamp: now_secs(),
        source: "container".to_string(),
    });

    let mut events = handle.subscribe();
    let change_tx = tx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if change_tx.send(change_message(event)).is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(to_message(&message)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let raw = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let message: FilesystemClientMessage = match serde_json::from_str(&raw) {
            Ok(message) => message,
            Err(e) => {
                let _ = tx.send(FilesystemServerMessage::Error { message: format!("malformed message: {e}") });
                continue;
            }
        };

        match message {
            FilesystemClientMessage::FileOperation { data } => {
                let outcome = apply_batch(state.driver.as_ref(), &instance, handle.mirror().pending(), &data).await;
                let _ = tx.send(FilesystemServerMessage::FileOperationResult {
                    operation: data.operation,
                    success: outcome.success,
                    files: data.files,
                    timestamp: now_secs(),
                });
            }
            FilesystemClientMessage::StartWatching => {
                let _ = tx.send(FilesystemServerMessage::WatchingStatus {
                    watching: handle.mirror().is_running(),
                    message: "Filesystem watching is active".to_string(),
                });
            }
            FilesystemClientMessage::StopWatching => {
                if let Err(e) = handle.mirror().stop_watching(state.driver.as_ref()).await {
                    tracing::warn!(user = %user_id, error = %e, "failed to stop filesystem watcher");
                }
                let _ = tx.send(FilesystemServerMessage::WatchingStatus {
                    watching: false,
                    message: "Filesystem watching stopped".to_string(),
                });
            }
        }
    }

    forward_task.abort();
    drop(tx);
    let _ = writer_task.await;
    state.sessions.release(&user_id, &connection_id);
}

fn change_message(event: ChangeEvent) -> FilesystemServerMessage {
    FilesystemServerMessage::FilesystemChangeFromContainer {
        operation: event.operation,
        files: vec![event.file],
        timestamp: event.timestamp,
        source: "container".to_string(),
    }
}

fn to_message(message: &FilesystemServerMessage) -> Message {
    Message::Text(serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string()))
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
