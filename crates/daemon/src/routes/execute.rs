// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /execute` and `POST /get_outputs`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use xoblas_core::sanitize_user_id;
use xoblas_execute::persistence::ExecutionRecord;
use xoblas_execute::ExecuteJob;
use xoblas_wire::execute::{ExecuteRequest, ExecuteResponse, GetOutputsRequest, GetOutputsResponse};

use crate::error::DaemonError;
use crate::routes::USER_HEADER;
use crate::state::AppState;

fn user_from_headers(headers: &HeaderMap) -> Result<xoblas_core::UserId, DaemonError> {
    let raw = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DaemonError::BadRequest(format!("missing {USER_HEADER} header")))?;
    Ok(sanitize_user_id(raw))
}

/// Runs `code` under `ExecuteJob`'s capped interpreter subprocess and,
/// when `should_save` is set, persists `(code, stdout)`. Status code
/// policy: 200 ran clean and nothing to save, 201 ran clean and saved,
/// 400 the interpreter exited non-zero (`stderr` in the body), 401 the
/// save itself failed.
pub async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    match run_execute(state, headers, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn run_execute(state: AppState, headers: HeaderMap, request: ExecuteRequest) -> Result<Response, DaemonError> {
    let user_id = user_from_headers(&headers)?;
    let job = ExecuteJob::default();
    let outcome = job.run(&request.code).await?;

    if !outcome.success {
        let body = ExecuteResponse {
            message: None,
            code_output: None,
            error: Some(outcome.stderr),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    if !request.should_save {
        let body = ExecuteResponse {
            message: Some("executed".to_string()),
            code_output: Some(outcome.stdout),
            error: None,
        };
        return Ok((StatusCode::OK, Json(body)).into_response());
    }

    let store = state.store.as_ref().ok_or(DaemonError::PersistenceUnconfigured)?;
    store
        .save(ExecutionRecord {
            user_id,
            code: request.code,
            output: outcome.stdout.clone(),
        })
        .await
        .map_err(|e| DaemonError::SaveFailed(e.to_string()))?;

    let body = ExecuteResponse {
        message: Some("executed and saved".to_string()),
        code_output: Some(outcome.stdout),
        error: None,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Returns the `quantity` most recently saved `(code, stdout)` runs for
/// the calling user, newest first. Unlike `/execute`, a persistence
/// failure here maps to 400, matching `get_outputs.py`'s own
/// `HTTPException(status_code=400, ...)`.
pub async fn get_outputs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GetOutputsRequest>,
) -> Response {
    match run_get_outputs(state, headers, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn run_get_outputs(
    state: AppState,
    headers: HeaderMap,
    request: GetOutputsRequest,
) -> Result<Response, DaemonError> {
    let user_id = user_from_headers(&headers)?;
    let store = state
        .store
        .as_ref()
        .ok_or_else(|| DaemonError::GetOutputsFailed("persistence backend is not configured".to_string()))?;
    let outputs = store
        .recent_outputs(&user_id, request.quantity)
        .await
        .map_err(|e| DaemonError::GetOutputsFailed(e.to_string()))?;
    Ok(Json(GetOutputsResponse { outputs }).into_response())
}

#[cfg(test)]
#[path = "execute_tests.rs"]
mod tests;
