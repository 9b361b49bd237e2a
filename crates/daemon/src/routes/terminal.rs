// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/terminal/{user_id}`. Grounded on the upgrade/split/read-loop shape
//! in `saltyskip-cthulu`'s terminal WS handler: one task owns the socket
//! end to end, dispatching inbound frames onto `WorkspaceEditor` and
//! writing its replies back as they're produced.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use xoblas_core::{sanitize_user_id, ConnectionId, UserId};
use xoblas_editor::EditorError;
use xoblas_lsp::LspRegistry;
use xoblas_wire::terminal::{TerminalClientMessage, TerminalServerMessage};

use crate::error::DaemonError;
use crate::state::AppState;

const DEFAULT_ROWS: u16 = 24;
const DEFAULT_COLS: u16 = 80;

/// Language a written file is synced to the LSP server under, matching
/// `routes::lsp`'s own default — the only language either side supports.
const DEFAULT_LSP_LANGUAGE: &str = "python";

pub async fn upgrade(ws: WebSocketUpgrade, Path(user_id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(mut socket: WebSocket, raw_user_id: String, state: AppState) {
    let user_id = sanitize_user_id(&raw_user_id);
    let connection_id = ConnectionId::new(uuid::Uuid::new_v4().to_string());

    let session = match state.sessions.acquire(&user_id, connection_id.clone()).await {
        Ok(session) => session,
        Err(e) => {
            let _ = send(&mut socket, &TerminalServerMessage::Error { message: e.to_string() }).await;
            return;
        }
    };
    let Some(instance) = session.instance_id() else {
        let _ = send(&mut socket, &TerminalServerMessage::Error { message: "session has no sandbox instance".to_string() }).await;
        state.sessions.release(&user_id, &connection_id);
        return;
    };

    let editor = match state
        .editors
        .get_or_attach(state.driver.clone(), &user_id, &instance, DEFAULT_ROWS, DEFAULT_COLS)
        .await
    {
        Ok(editor) => editor,
        Err(e) => {
            let _ = send(&mut socket, &TerminalServerMessage::Error { message: e.to_string() }).await;
            state.sessions.release(&user_id, &connection_id);
            return;
        }
    };

    let mut editor = editor.lock().await;
    let initial_file = editor.open_file_record().await;
    if send(&mut socket, &initial_file).await.is_err() {
        drop(editor);
        state.sessions.release(&user_id, &connection_id);
        return;
    }

    loop {
        let raw = match socket.recv().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(user = %user_id, error = %e, "terminal websocket read error");
                break;
            }
        };

        let message: TerminalClientMessage = match serde_json::from_str(&raw) {
            Ok(message) => message,
            Err(e) => {
                let _ = send(&mut socket, &TerminalServerMessage::Error { message: format!("malformed message: {e}") }).await;
                continue;
            }
        };

        let result = dispatch(&mut editor, message, &state.lsp, &user_id).await;
        match result {
            Ok(replies) => {
                for reply in &replies {
                    if send(&mut socket, reply).await.is_err() {
                        drop(editor);
                        state.sessions.release(&user_id, &connection_id);
                        return;
                    }
                }
            }
            Err(e) => {
                let daemon_err = DaemonError::from(e);
                tracing::warn!(user = %user_id, error = %daemon_err, "terminal editor operation failed");
                let _ = send(&mut socket, &TerminalServerMessage::Error { message: daemon_err.message() }).await;
                if daemon_err.closes_connection() {
                    break;
                }
            }
        }
    }

    drop(editor);
    state.sessions.release(&user_id, &connection_id);
}

async fn dispatch(
    editor: &mut xoblas_editor::WorkspaceEditor,
    message: TerminalClientMessage,
    lsp: &LspRegistry,
    user_id: &UserId,
) -> Result<Vec<TerminalServerMessage>, EditorError> {
    match message {
        TerminalClientMessage::Command { command } => editor.handle_command(&command).await,
        TerminalClientMessage::Input { data } => editor.handle_input(&data).await,
        TerminalClientMessage::WriteFile { content } => {
            editor.write_file(&content).await?;
            sync_open_file_to_lsp(editor, lsp, user_id, &content).await;
            Ok(vec![editor.open_file_record().await])
        }
        TerminalClientMessage::Resize { cols, rows } => Ok(editor.resize(rows, cols).await?.into_iter().collect()),
    }
}

/// Keeps the user's LSP server (if one is already running for them) in
/// sync with the file the terminal just wrote: `didOpen` the first time a
/// path is seen, `didChange` after. Best-effort — a user who never opened
/// `/ws/lsp` has no running proxy and `write_file` shouldn't fail over it.
async fn sync_open_file_to_lsp(editor: &xoblas_editor::WorkspaceEditor, lsp: &LspRegistry, user_id: &UserId, content: &str) {
    let Some(proxy) = lsp.peek(user_id, DEFAULT_LSP_LANGUAGE).await else {
        return;
    };
    let path = editor.open_file_path();
    let result = if proxy.is_open(path) { proxy.did_change(path, content).await } else { proxy.did_open(path, content).await };
    if let Err(e) = result {
        tracing::warn!(user = %user_id, path, error = %e, "failed to sync written file to lsp server");
    }
}

async fn send(socket: &mut WebSocket, message: &TerminalServerMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text)).await
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
