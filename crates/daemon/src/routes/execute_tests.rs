use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use parking_lot::Mutex;

use xoblas_core::UserId;
use xoblas_execute::persistence::{ExecutionRecord, PersistError, PersistedExecutionStore};
use xoblas_sandbox::test_support::MockSandboxDriver;
use xoblas_session::SessionRegistry;
use xoblas_wire::execute::{ExecuteRequest, GetOutputsRequest, OutputRow};

use super::*;
use crate::editor_registry::EditorRegistry;
use crate::fs_registry::FsMirrorRegistry;
use crate::persistence::{OutputsStore, PersistenceBackendError};

#[derive(Default)]
struct FakeStore {
    saved: Mutex<Vec<ExecutionRecord>>,
}

#[async_trait]
impl PersistedExecutionStore for FakeStore {
    async fn save(&self, record: ExecutionRecord) -> Result<(), PersistError> {
        self.saved.lock().push(record);
        Ok(())
    }
}

#[async_trait]
impl OutputsStore for FakeStore {
    async fn recent_outputs(&self, user_id: &UserId, quantity: u32) -> Result<Vec<OutputRow>, PersistenceBackendError> {
        let saved = self.saved.lock();
        Ok(saved
            .iter()
            .rev()
            .filter(|r| &r.user_id == user_id)
            .take(quantity as usize)
            .map(|r| OutputRow { executable_id: "id".to_string(), output: r.output.clone(), timestamp: "now".to_string() })
            .collect())
    }
}

fn test_state(store: Option<Arc<dyn crate::state::CombinedStore>>) -> AppState {
    let driver = Arc::new(MockSandboxDriver::new());
    AppState {
        config: Arc::new(crate::config::Config {
            postgres_connection_string: None,
            env: "development".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            image_tag: "test".to_string(),
            sandbox_root: "/home/termuser/root".to_string(),
        }),
        driver: driver.clone(),
        sessions: Arc::new(SessionRegistry::new(driver)),
        editors: Arc::new(EditorRegistry::new()),
        fs_mirrors: Arc::new(FsMirrorRegistry::new()),
        lsp: Arc::new(xoblas_lsp::LspRegistry::new()),
        store,
    }
}

fn user_header() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_HEADER, "alice".parse().unwrap());
    headers
}

#[tokio::test]
async fn execute_returns_200_for_a_clean_run_without_save() {
    let state = test_state(None);
    let request = ExecuteRequest { code: "print('hi')".to_string(), should_save: false };

    let response = execute(State(state), user_header(), Json(request)).await.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn execute_returns_400_with_stderr_on_a_failing_run() {
    let state = test_state(None);
    let request = ExecuteRequest { code: "raise ValueError('boom')".to_string(), should_save: false };

    let response = execute(State(state), user_header(), Json(request)).await.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn execute_returns_401_when_save_requested_without_a_store() {
    let state = test_state(None);
    let request = ExecuteRequest { code: "print('hi')".to_string(), should_save: true };

    let response = execute(State(state), user_header(), Json(request)).await.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn execute_returns_201_and_persists_when_save_succeeds() {
    let fake: Arc<dyn crate::state::CombinedStore> = Arc::new(FakeStore::default());
    let state = test_state(Some(fake));
    let request = ExecuteRequest { code: "print('hi')".to_string(), should_save: true };

    let response = execute(State(state.clone()), user_header(), Json(request)).await.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let outputs = state.store.as_ref().unwrap().recent_outputs(&UserId::new("alice"), 10).await.unwrap();
    assert_eq!(outputs.len(), 1);
}

#[tokio::test]
async fn get_outputs_returns_saved_runs_newest_first() {
    let fake = Arc::new(FakeStore::default());
    fake.saved.lock().push(ExecutionRecord { user_id: UserId::new("alice"), code: "1".into(), output: "one".into() });
    fake.saved.lock().push(ExecutionRecord { user_id: UserId::new("alice"), code: "2".into(), output: "two".into() });
    let store: Arc<dyn crate::state::CombinedStore> = fake;
    let state = test_state(Some(store));

    let response =
        get_outputs(State(state), user_header(), Json(GetOutputsRequest { quantity: 10 })).await.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
