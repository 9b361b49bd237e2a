// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `LspRegistry`: process-wide `(user_id, language) -> LspProxy` table,
//! grounded on `manager.py`'s `LSPManager` (a module-level singleton in
//! the original; here one `Arc<LspRegistry>` is held by `xoblas-daemon`
//! instead).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use xoblas_core::{InstanceId, UserId};
use xoblas_sandbox::SandboxDriver;

use crate::proxy::{LspError, LspProxy};

const SUPPORTED_LANGUAGES: &[&str] = &["python"];

#[derive(Default)]
pub struct LspRegistry {
    active: Mutex<HashMap<(UserId, String), Arc<LspProxy>>>,
}

impl LspRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supported_languages(&self) -> &'static [&'static str] {
        SUPPORTED_LANGUAGES
    }

    /// Returns the existing proxy for `(user_id, language)`, starting a
    /// new one against `instance` if none exists yet.
    pub async fn get_or_create(
        &self,
        driver: &dyn SandboxDriver,
        instance: &InstanceId,
        user_id: &UserId,
        language: &str,
    ) -> Result<Arc<LspProxy>, LspError> {
        let key = (user_id.clone(), language.to_string());
        let mut active = self.active.lock().await;
        if let Some(existing) = active.get(&key) {
            return Ok(existing.clone());
        }

        let proxy = Arc::new(LspProxy::start(driver, instance, language).await?);
        active.insert(key, proxy.clone());
        Ok(proxy)
    }

    /// Returns the `(user_id, language)` proxy if one is already running,
    /// without starting one — for call sites that should only notify an
    /// LSP session that's already open rather than spin one up on its
    /// behalf.
    pub async fn peek(&self, user_id: &UserId, language: &str) -> Option<Arc<LspProxy>> {
        let key = (user_id.clone(), language.to_string());
        self.active.lock().await.get(&key).cloned()
    }

    /// Shuts down and forgets the `(user_id, language)` proxy, if any.
    pub async fn close(&self, user_id: &UserId, language: &str) {
        let key = (user_id.clone(), language.to_string());
        let removed = self.active.lock().await.remove(&key);
        if let Some(proxy) = removed {
            if let Err(e) = proxy.shutdown().await {
                tracing::warn!(user = %user_id, language, error = %e, "error shutting down lsp server");
            }
        }
    }

    /// Shuts down every proxy belonging to `user_id`, across all
    /// languages. Called on session teardown so a user's LSP servers
    /// don't outlive their sandbox instance.
    pub async fn close_all_for_user(&self, user_id: &UserId) {
        let mut active = self.active.lock().await;
        let keys: Vec<(UserId, String)> = active
            .keys()
            .filter(|(user, _)| user == user_id)
            .cloned()
            .collect();

        for key in keys {
            if let Some(proxy) = active.remove(&key) {
                if let Err(e) = proxy.shutdown().await {
                    tracing::warn!(user = %user_id, language = %key.1, error = %e, "error shutting down lsp server");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
