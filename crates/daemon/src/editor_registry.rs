// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EditorRegistry`: daemon-local `user_id -> WorkspaceEditor` table,
//! mirroring `web_socket.py`'s `active_terminals` dict (one PTY per user,
//! not per connection — a second `/ws/terminal` connection for the same
//! user takes over the existing editor rather than spawning a second
//! shell). Structured the same way as `FsMirrorRegistry`: tracks the
//! bound `InstanceId` so a session reacquire after teardown gets a fresh
//! `WorkspaceEditor` instead of one attached to a dead sandbox.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use xoblas_core::{InstanceId, UserId};
use xoblas_editor::{EditorError, WorkspaceEditor};
use xoblas_sandbox::SandboxDriver;

struct Entry {
    instance: InstanceId,
    editor: Arc<AsyncMutex<WorkspaceEditor>>,
}

#[derive(Default)]
pub struct EditorRegistry {
    entries: AsyncMutex<HashMap<UserId, Entry>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's current editor, attaching a fresh one if none
    /// exists yet or the existing one is bound to a stale instance.
    pub async fn get_or_attach(
        &self,
        driver: Arc<dyn SandboxDriver>,
        user_id: &UserId,
        instance: &InstanceId,
        rows: u16,
        cols: u16,
    ) -> Result<Arc<AsyncMutex<WorkspaceEditor>>, EditorError> {
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(user_id) {
            if &existing.instance == instance {
                return Ok(existing.editor.clone());
            }
            tracing::info!(user = %user_id, "sandbox instance changed, reattaching terminal editor");
        }

        let editor = WorkspaceEditor::attach(driver, instance.clone(), rows, cols).await?;
        let editor = Arc::new(AsyncMutex::new(editor));
        entries.insert(user_id.clone(), Entry { instance: instance.clone(), editor: editor.clone() });
        Ok(editor)
    }

    /// Forgets `user_id`'s editor; session teardown tears its terminal
    /// down too. The PTY's child process dies with the sandbox instance
    /// itself; this just drops our handle to it.
    pub async fn remove(&self, user_id: &UserId) {
        self.entries.lock().await.remove(user_id);
    }
}
