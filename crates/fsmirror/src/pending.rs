// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-echo suppression: a client-originated file operation is marked
//! pending before it's applied, so the watcher
//! event it provokes a moment later can be recognized as our own and
//! dropped instead of being echoed back to the client as a remote change.
//!
//! Grounded on `filesystem_watcher.py`'s `mark_operation_pending` /
//! `_is_self_initiated` / `_remove_pending_operation`: the original spawns
//! an `asyncio.sleep(2.0)` task per entry to expire it; here expiry is
//! checked lazily against a stored timestamp instead of needing a
//! background task per mark.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

use xoblas_core::constants::PENDING_OP_TTL;
use xoblas_wire::filesystem::ClientOperation;

#[derive(Debug, Default)]
pub struct PendingOperations {
    entries: Mutex<HashMap<(ClientOperation, String), Instant>>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `operation` on `path` was just issued by the client.
    pub fn mark(&self, operation: ClientOperation, path: &str) {
        self.entries.lock().insert((operation, path.to_string()), Instant::now());
    }

    /// Marks a rename's three implied pending entries: the rename itself
    /// (new path), and the delete/create it decomposes into on the
    /// watcher side (`filemanager/index.py`'s `_handle_rename` marks all
    /// three before calling `mv`).
    pub fn mark_rename(&self, old_path: &str, new_path: &str) {
        self.mark(ClientOperation::Rename, new_path);
        self.mark(ClientOperation::Delete, old_path);
        self.mark(ClientOperation::Create, new_path);
    }

    /// If `(operation, path)` is pending and not yet expired, consumes it
    /// (so a second identical watcher event isn't also suppressed) and
    /// returns `true` — the caller should drop this watcher event as
    /// self-initiated.
    pub fn take_if_pending(&self, operation: ClientOperation, path: &str) -> bool {
        let mut entries = self.entries.lock();
        let key = (operation, path.to_string());
        match entries.get(&key) {
            Some(marked_at) if marked_at.elapsed() < PENDING_OP_TTL => {
                entries.remove(&key);
                true
            }
            Some(_) => {
                entries.remove(&key);
                false
            }
            None => false,
        }
    }

    /// Drops every entry whose TTL has elapsed. Callers run this
    /// periodically (once per poll tick) rather than per-entry on a timer.
    pub fn sweep_expired(&self) {
        self.entries.lock().retain(|_, marked_at| marked_at.elapsed() < PENDING_OP_TTL);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
