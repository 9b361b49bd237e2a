// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PersistedExecution`: an external store interface only. The
//! `/execute` route invokes this trait; a concrete `sqlx`-backed
//! implementation against `POSTGRES_CONNECTION_STRING` lives in
//! `xoblas-daemon`, not here — this crate only names the shape the store
//! must satisfy, the same split `xoblas_wire::execute::ExecuteResponse`
//! draws around HTTP status-code policy.

use async_trait::async_trait;
use thiserror::Error;

use xoblas_core::UserId;

#[derive(Debug, Error)]
#[error("persistence error: {0}")]
pub struct PersistError(pub String);

/// One saved `(code, stdout)` pair, keyed by the user who ran it. Maps to
/// the `executable` row `{executable_id, user_id, code}` plus its one
/// `output_code` row `{output_id, executable_id, output, timestamp}`; the
/// store is responsible for generating both ids and the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub user_id: UserId,
    pub code: String,
    pub output: String,
}

/// External execution-history store. `xoblas-execute` only ever appends
/// through this trait from the one-shot `/execute` path; reads for
/// `/get_outputs` are served directly by `xoblas-daemon` against the same
/// backing store.
#[async_trait]
pub trait PersistedExecutionStore: Send + Sync {
    async fn save(&self, record: ExecutionRecord) -> Result<(), PersistError>;
}
