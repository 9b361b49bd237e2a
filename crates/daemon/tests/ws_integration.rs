// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket round-trip test for `/ws/filesystem`, grounded on the
//! connect → `filesystem_connected` → `filesystem_initial_sync` sequence
//! `filesystem_socket.py` always runs through on a successful connect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tower_http::cors::CorsLayer;

use xoblas_daemon::config::Config;
use xoblas_daemon::editor_registry::EditorRegistry;
use xoblas_daemon::fs_registry::FsMirrorRegistry;
use xoblas_daemon::{build_router, AppState};
use xoblas_lsp::LspRegistry;
use xoblas_sandbox::test_support::MockSandboxDriver;
use xoblas_sandbox::{ExecOutput, SandboxDriver};
use xoblas_session::SessionRegistry;

fn ok(stdout: &str) -> ExecOutput {
    ExecOutput { stdout: stdout.as_bytes().to_vec(), stderr: Vec::new(), exit_code: 0 }
}

async fn spawn_test_server(mock: Arc<MockSandboxDriver>) -> String {
    let driver: Arc<dyn SandboxDriver> = mock;
    let config = Config {
        postgres_connection_string: None,
        env: "development".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        image_tag: "test".to_string(),
        sandbox_root: "/home/termuser/root".to_string(),
    };
    let state = AppState {
        config: Arc::new(config),
        sessions: Arc::new(SessionRegistry::new(driver.clone())),
        editors: Arc::new(EditorRegistry::new()),
        fs_mirrors: Arc::new(FsMirrorRegistry::new()),
        lsp: Arc::new(LspRegistry::new()),
        driver,
        store: None,
    };

    let router = build_router(state, CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server");
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn filesystem_socket_sends_connected_then_initial_sync() {
    let mock = Arc::new(MockSandboxDriver::new());
    // start_watching: mkdir, chmod, nohup launch, find (empty tree).
    for _ in 0..4 {
        mock.push_exec_output(ok(""));
    }
    let base = spawn_test_server(mock).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{base}/ws/filesystem/alice")).await.expect("connect");

    let connected = ws.next().await.expect("frame").expect("ok frame");
    let connected_text = connected.into_text().expect("text frame");
    assert!(connected_text.contains("filesystem_connected"));

    let initial = ws.next().await.expect("frame").expect("ok frame");
    let initial_text = initial.into_text().expect("text frame");
    assert!(initial_text.contains("filesystem_initial_sync"));

    let _ = ws.send(Message::Close(None)).await;
}
