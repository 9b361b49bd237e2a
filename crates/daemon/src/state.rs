// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AppState`: the one `Arc`-shared handle every axum route extracts,
//! grounded on `alfredjeanlab-oddjobs`'s daemon-wide state bundles — a
//! flat struct of already-`Arc`-wrapped subsystems rather than a god
//! object with internal locking of its own.

use std::sync::Arc;

use xoblas_execute::PersistedExecutionStore;
use xoblas_lsp::LspRegistry;
use xoblas_sandbox::SandboxDriver;
use xoblas_session::SessionRegistry;

use crate::config::Config;
use crate::editor_registry::EditorRegistry;
use crate::fs_registry::FsMirrorRegistry;
use crate::persistence::OutputsStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub driver: Arc<dyn SandboxDriver>,
    pub sessions: Arc<SessionRegistry>,
    pub editors: Arc<EditorRegistry>,
    pub fs_mirrors: Arc<FsMirrorRegistry>,
    pub lsp: Arc<LspRegistry>,
    /// `None` when `POSTGRES_CONNECTION_STRING` is unset; `/execute`
    /// requests with `should_save: true` then fail with a persistence
    /// error instead of silently discarding the save.
    pub store: Option<Arc<dyn CombinedStore>>,
}

/// `/execute` only ever appends (`PersistedExecutionStore`); `/get_outputs`
/// only ever reads (`OutputsStore`). One concrete backend implements both;
/// this marker trait lets `AppState` hold a single `Arc<dyn _>` for it.
pub trait CombinedStore: PersistedExecutionStore + OutputsStore {}
impl<T: PersistedExecutionStore + OutputsStore> CombinedStore for T {}
