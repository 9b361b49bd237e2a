// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete execution-history store behind `POSTGRES_CONNECTION_STRING`.
//! `xoblas_execute::PersistedExecutionStore` only names the append side;
//! `OutputsStore` here adds the read side `/get_outputs` needs, since
//! that route lives entirely in the daemon.

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use xoblas_core::UserId;
use xoblas_wire::execute::OutputRow;

pub use postgres::PostgresStore;

#[derive(Debug, Error)]
#[error("persistence backend error: {0}")]
pub struct PersistenceBackendError(pub String);

/// Read side of the execution-history store, serving `/get_outputs`: the
/// most recent `quantity` saved runs for a user, newest first.
#[async_trait]
pub trait OutputsStore: Send + Sync {
    async fn recent_outputs(&self, user_id: &UserId, quantity: u32) -> Result<Vec<OutputRow>, PersistenceBackendError>;
}
