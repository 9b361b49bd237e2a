// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applies a client-originated `file_operation` batch to the sandbox.
//!
//! Grounded on `filemanager/index.py`'s `handle_file_operations` /
//! `_handle_create` / `_handle_delete` / `_handle_change` /
//! `_handle_rename`, rewritten to exec argv arrays instead of interpolating
//! paths into a shell string.
//!
//! Every entry is marked pending *before* it's applied, so the watcher
//! event it provokes is recognized as self-initiated.

use std::path::Path;
use thiserror::Error;

use xoblas_core::InstanceId;
use xoblas_sandbox::{SandboxDriver, SandboxError};
use xoblas_wire::filesystem::{ClientFileOp, ClientOperation, FileOperationBatch};

use crate::pending::PendingOperations;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("sandbox exec failed: {0}")]
    Exec(#[from] SandboxError),
    #[error("rename entry is missing its oldPath")]
    RenameMissingOldPath,
}

/// Outcome of applying one batch: whether every entry succeeded, echoed
/// back verbatim in a `file_operation_result` message by the caller.
pub struct ApplyOutcome {
    pub success: bool,
}

pub async fn apply_batch(
    driver: &dyn SandboxDriver,
    instance: &InstanceId,
    pending: &PendingOperations,
    batch: &FileOperationBatch,
) -> ApplyOutcome {
    let mut success = true;
    for file in &batch.files {
        let result = apply_one(driver, instance, pending, batch.operation, file).await;
        if result.is_err() {
            success = false;
        }
    }
    ApplyOutcome { success }
}

async fn apply_one(
    driver: &dyn SandboxDriver,
    instance: &InstanceId,
    pending: &PendingOperations,
    operation: ClientOperation,
    file: &ClientFileOp,
) -> Result<(), ApplyError> {
    match operation {
        ClientOperation::Create => {
            pending.mark(ClientOperation::Create, &file.path);
            if file.is_directory {
                exec(driver, instance, &["mkdir", "-p", &file.path]).await?;
            } else {
                if let Some(parent) = Path::new(&file.path).parent().and_then(|p| p.to_str()) {
                    if !parent.is_empty() {
                        exec(driver, instance, &["mkdir", "-p", parent]).await?;
                    }
                }
                exec(driver, instance, &["touch", &file.path]).await?;
            }
            Ok(())
        }
        ClientOperation::Delete => {
            pending.mark(ClientOperation::Delete, &file.path);
            if file.is_directory {
                exec(driver, instance, &["rm", "-rf", &file.path]).await?;
            } else {
                exec(driver, instance, &["rm", "-f", &file.path]).await?;
            }
            Ok(())
        }
        ClientOperation::Change => {
            // No mutation: a save that only updates content on disk still
            // needs a pending marker so the watcher's `modified` event
            // isn't echoed back, but there's nothing for the mirror to
            // exec beyond a liveness probe.
            pending.mark(ClientOperation::Change, &file.path);
            exec(driver, instance, &["test", "-e", &file.path]).await?;
            Ok(())
        }
        ClientOperation::Rename => {
            let old_path = file.old_path.as_deref().ok_or(ApplyError::RenameMissingOldPath)?;
            pending.mark_rename(old_path, &file.path);
            exec(driver, instance, &["mv", old_path, &file.path]).await?;
            Ok(())
        }
    }
}

async fn exec(driver: &dyn SandboxDriver, instance: &InstanceId, argv: &[&str]) -> Result<(), SandboxError> {
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    driver.exec(instance, &argv).await?;
    Ok(())
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
