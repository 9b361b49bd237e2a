// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end HTTP tests against a real bound `axum::serve` instance,
//! grounded on the pack's convention of driving integration tests through
//! an actual listener rather than calling handlers in-process.

use std::sync::Arc;

use tower_http::cors::CorsLayer;

use xoblas_daemon::config::Config;
use xoblas_daemon::editor_registry::EditorRegistry;
use xoblas_daemon::fs_registry::FsMirrorRegistry;
use xoblas_daemon::{build_router, AppState};
use xoblas_lsp::LspRegistry;
use xoblas_sandbox::test_support::MockSandboxDriver;
use xoblas_sandbox::SandboxDriver;
use xoblas_session::SessionRegistry;

async fn spawn_test_server() -> String {
    let driver: Arc<dyn SandboxDriver> = Arc::new(MockSandboxDriver::new());
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
    format!("http://{addr}")
}

#[tokio::test]
async fn ping_responds_with_pong() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/ping")).send().await.expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "pong");
}

#[tokio::test]
async fn execute_without_user_header_is_rejected() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/execute"))
        .json(&serde_json::json!({"code": "print(1)", "should_save": false}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn execute_runs_code_and_returns_its_stdout() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/execute"))
        .header("X-User", "alice")
        .json(&serde_json::json!({"code": "print('integration-ok')", "should_save": false}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(body["code_output"].as_str().expect("code_output").contains("integration-ok"));
}

#[tokio::test]
async fn execute_with_save_but_no_store_returns_401() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/execute"))
        .header("X-User", "alice")
        .json(&serde_json::json!({"code": "print(1)", "should_save": true}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_outputs_without_a_store_returns_401() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/get_outputs"))
        .header("X-User", "alice")
        .json(&serde_json::json!({"quantity": 5}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}
