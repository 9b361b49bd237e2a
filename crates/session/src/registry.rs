// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SessionRegistry`: process-wide `user_id -> Session` map with a per-user
//! startup mutex and reference-counted sandbox lifecycle.
//!
//! Grounded on `docker_manager.py`'s `DockerManager.get_or_create` /
//! `ensure_container_running` / `register_connection` /
//! `unregister_connection` / `_delayed_cleanup`, replacing its
//! `container_startup_locks` dict plus busy-poll `_startup_in_progress`
//! fallback with a single `tokio::sync::Mutex` held across the whole
//! build-image/start-instance critical section — a held lock has no
//! polling window to race in.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use xoblas_core::constants::GRACE_PERIOD;
use xoblas_core::{ConnectionId, UserId};
use xoblas_sandbox::{SandboxDriver, SandboxError};

use crate::session::Session;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("sandbox unavailable for user {user}: {reason}")]
    Unavailable { user: UserId, reason: String },
    #[error("session for user {0} is stopping; retry later")]
    Stopping(UserId),
}

impl From<(UserId, SandboxError)> for SessionError {
    fn from((user, err): (UserId, SandboxError)) -> Self {
        SessionError::Unavailable { user, reason: err.to_string() }
    }
}

pub struct SessionRegistry {
    driver: Arc<dyn SandboxDriver>,
    sessions: SyncMutex<HashMap<UserId, Arc<Session>>>,
    startup_locks: SyncMutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl SessionRegistry {
    pub fn new(driver: Arc<dyn SandboxDriver>) -> Self {
        Self {
            driver,
            sessions: SyncMutex::new(HashMap::new()),
            startup_locks: SyncMutex::new(HashMap::new()),
        }
    }

    /// Number of sessions currently tracked (alive or mid-teardown). For
    /// diagnostics/tests only.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether `user_id` currently has a tracked session. Used by
    /// `xoblas-daemon` to decide when a user's process-wide `LspRegistry`
    /// entries can be torn down alongside the sandbox, without
    /// `SessionRegistry` itself needing to know about `LspRegistry`.
    pub fn has_session(&self, user_id: &UserId) -> bool {
        self.sessions.lock().contains_key(user_id)
    }

    /// The session's current `instance_id`, if any. Used by
    /// `xoblas-daemon` to detect whether a reconnecting filesystem/LSP
    /// channel is still talking to the same sandbox instance.
    pub fn instance_id_for(&self, user_id: &UserId) -> Option<xoblas_core::InstanceId> {
        self.sessions.lock().get(user_id).and_then(|s| s.instance_id())
    }

    fn startup_lock_for(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
        self.startup_locks.lock().entry(user_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    fn session_for(&self, user_id: &UserId) -> Arc<Session> {
        self.sessions
            .lock()
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Session::new(user_id.clone())))
            .clone()
    }

    /// Ensures the sandbox is running for `user_id`, registers
    /// `connection_id`, and returns the session.
    pub async fn acquire(&self, user_id: &UserId, connection_id: ConnectionId) -> Result<Arc<Session>, SessionError> {
        let session = self.session_for(user_id);
        if session.is_stopping() {
            return Err(SessionError::Stopping(user_id.clone()));
        }

        let startup_lock = self.startup_lock_for(user_id);
        let _guard = startup_lock.lock().await;

        let needs_start = match session.instance_id() {
            Some(instance) => !self.driver.is_alive(&instance).await,
            None => true,
        };

        if needs_start {
            self.driver.build_image().await.map_err(|e| (user_id.clone(), e))?;
            let instance = self.driver.start_instance(user_id).await.map_err(|e| (user_id.clone(), e))?;
            session.set_instance_id(instance);
        }

        session.add_connection(connection_id);
        Ok(session)
    }

    /// Deregisters `connection_id`; if no connections remain, schedules
    /// delayed teardown after `GRACE_PERIOD`.
    pub fn release(self: &Arc<Self>, user_id: &UserId, connection_id: &ConnectionId) {
        let session = {
            let sessions = self.sessions.lock();
            match sessions.get(user_id) {
                Some(session) => session.clone(),
                None => return,
            }
        };

        if !session.remove_connection(connection_id) {
            return;
        }

        let registry = self.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(GRACE_PERIOD).await;
            registry.teardown_if_still_empty(&user_id, &session).await;
        });
    }

    async fn teardown_if_still_empty(&self, user_id: &UserId, session: &Arc<Session>) {
        if !session.is_empty() {
            return;
        }
        if !session.begin_teardown() {
            return;
        }

        session.mark_stopping();
        if let Some(instance) = session.instance_id() {
            if let Err(e) = self.driver.stop_instance(&instance).await {
                tracing::warn!(user = %user_id, error = %e, "error stopping sandbox instance during teardown");
            }
        }

        self.sessions.lock().remove(user_id);
        self.startup_locks.lock().remove(user_id);
    }

    /// Flags `user_id`'s session as draining; further `acquire`s fail fast
    /// until the session is recreated.
    pub fn mark_stopping(&self, user_id: &UserId) {
        if let Some(session) = self.sessions.lock().get(user_id) {
            session.mark_stopping();
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
