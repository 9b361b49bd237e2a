// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqlx`-backed store against `POSTGRES_CONNECTION_STRING`. Uses runtime
//! `sqlx::query`/`query_as` rather than the compile-time-checked `query!`
//! macros, which need either a live database connection or a committed
//! `.sqlx` offline cache at build time — neither exists here.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use xoblas_core::UserId;
use xoblas_execute::persistence::{ExecutionRecord, PersistError, PersistedExecutionStore};
use xoblas_wire::execute::OutputRow;

use super::{OutputsStore, PersistenceBackendError};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(connection_string: &str) -> Result<Self, PersistenceBackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| PersistenceBackendError(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Applies `migrations/` against the connected database. Only touches
    /// files on disk at build time (`sqlx::migrate!` embeds them as a
    /// byte array); no live connection is needed until `run` is actually
    /// called.
    pub async fn migrate(&self) -> Result<(), PersistenceBackendError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PersistenceBackendError(e.to_string()))
    }
}

#[async_trait]
impl PersistedExecutionStore for PostgresStore {
    async fn save(&self, record: ExecutionRecord) -> Result<(), PersistError> {
        let executable_id = uuid::Uuid::new_v4().to_string();
        let output_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now();

        let mut tx = self.pool.begin().await.map_err(|e| PersistError(e.to_string()))?;

        sqlx::query("INSERT INTO executable (executable_id, user_id, code) VALUES ($1, $2, $3)")
            .bind(&executable_id)
            .bind(record.user_id.as_str())
            .bind(&record.code)
            .execute(&mut *tx)
            .await
            .map_err(|e| PersistError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO output_code (output_id, executable_id, output, timestamp) VALUES ($1, $2, $3, $4)",
        )
        .bind(&output_id)
        .bind(&executable_id)
        .bind(&record.output)
        .bind(timestamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| PersistError(e.to_string()))?;

        tx.commit().await.map_err(|e| PersistError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl OutputsStore for PostgresStore {
    async fn recent_outputs(&self, user_id: &UserId, quantity: u32) -> Result<Vec<OutputRow>, PersistenceBackendError> {
        let rows = sqlx::query(
            "SELECT e.executable_id, o.output, o.timestamp \
             FROM output_code o JOIN executable e ON e.executable_id = o.executable_id \
             WHERE e.user_id = $1 ORDER BY o.timestamp DESC LIMIT $2",
        )
        .bind(user_id.as_str())
        .bind(i64::from(quantity))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceBackendError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let timestamp: chrono::DateTime<chrono::Utc> =
                    row.try_get("timestamp").map_err(|e| PersistenceBackendError(e.to_string()))?;
                Ok(OutputRow {
                    executable_id: row.try_get("executable_id").map_err(|e| PersistenceBackendError(e.to_string()))?,
                    output: row.try_get("output").map_err(|e| PersistenceBackendError(e.to_string()))?,
                    timestamp: timestamp.to_rfc3339(),
                })
            })
            .collect()
    }
}
