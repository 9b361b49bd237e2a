// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Session`: per-user sandbox lifecycle state. Grounded on
//! `docker_manager.py`'s module-level `docker_sessions`/`active_connections`
//! entries, collapsed into one struct per user rather than two parallel
//! dicts keyed by the same id.
//!
//! Deliberately does *not* embed `PtyController`/`FilesystemMirror`/
//! `LspProxy` handles: the original keeps those in their own per-router
//! dicts (`active_terminals` in `web_socket.py`, `active_filesystem_sessions`
//! in `filesystem_socket.py`, `LSPManager`'s own map), not inside
//! `DockerManager`. `xoblas-editor` and `xoblas-lsp::LspRegistry` own those
//! slots instead, keyed off `UserId`, matching that separation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use xoblas_core::{ConnectionId, InstanceId, UserId};

/// Per-user sandbox lifecycle state. Cheap to clone via `Arc` — every
/// field is internally synchronized so multiple connections/tasks can hold
/// a reference concurrently.
pub struct Session {
    user_id: UserId,
    instance_id: Mutex<Option<InstanceId>>,
    connections: Mutex<HashSet<ConnectionId>>,
    /// Set once `mark_stopping` is called or teardown has run; further
    /// `acquire`s for this user fail fast.
    stopping: AtomicBool,
    /// CAS guard ensuring exactly one grace-period task actually performs
    /// teardown, even if several are scheduled back-to-back by repeated
    /// empty-connections transitions.
    torn_down: AtomicBool,
}

impl Session {
    pub(crate) fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            instance_id: Mutex::new(None),
            connections: Mutex::new(HashSet::new()),
            stopping: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id.lock().clone()
    }

    pub(crate) fn set_instance_id(&self, instance: InstanceId) {
        *self.instance_id.lock() = Some(instance);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_stopping(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub(crate) fn add_connection(&self, connection_id: ConnectionId) {
        self.connections.lock().insert(connection_id);
    }

    /// Removes `connection_id`, returning `true` iff this removal emptied
    /// the connection set (the caller should schedule grace-period
    /// teardown).
    pub(crate) fn remove_connection(&self, connection_id: &ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        connections.remove(connection_id);
        connections.is_empty()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Attempts to claim teardown for this session; returns `true` exactly
    /// once across however many grace-period tasks were scheduled.
    pub(crate) fn begin_teardown(&self) -> bool {
        self.torn_down.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }
}
