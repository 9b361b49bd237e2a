// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FsMirrorRegistry`: daemon-local `user_id -> FilesystemMirror` table
//! that fans one in-sandbox watcher out to every `/ws/filesystem`
//! connection for that user via a `tokio::sync::broadcast` channel.
//!
//! `xoblas_session::Session` deliberately doesn't embed a
//! `FilesystemMirror`, so this registry lives beside `SessionRegistry` in
//! `AppState` instead, keyed the same way but additionally tracking which
//! `InstanceId` the running mirror is bound to — a session
//! teardown-and-reacquire gets a fresh sandbox instance, and a mirror
//! watching the old one is just dead weight.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex as AsyncMutex};

use xoblas_core::constants::FS_POLL_INTERVAL;
use xoblas_core::{InstanceId, UserId};
use xoblas_fsmirror::{ChangeEvent, FilesystemMirror, FsMirrorError, InitialSync};
use xoblas_sandbox::SandboxDriver;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum FsRegistryError {
    #[error("filesystem mirror error: {0}")]
    Mirror(#[from] FsMirrorError),
}

/// One running mirror plus the fanout channel every subscribed connection
/// reads from.
pub struct FsMirrorHandle {
    instance: InstanceId,
    mirror: Arc<FilesystemMirror>,
    events: broadcast::Sender<ChangeEvent>,
    initial_sync: parking_lot::Mutex<InitialSync>,
    poll_task: tokio::task::JoinHandle<()>,
}

impl FsMirrorHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Snapshot to replay to a newly-joining connection that arrives
    /// after the initial sync already ran: every connection gets a
    /// `filesystem_initial_sync` message on connect.
    pub fn initial_sync(&self) -> InitialSync {
        self.initial_sync.lock().clone()
    }

    pub fn mirror(&self) -> &FilesystemMirror {
        &self.mirror
    }
}

impl Drop for FsMirrorHandle {
    fn drop(&mut self) {
        self.poll_task.abort();
    }
}

#[derive(Default)]
pub struct FsMirrorRegistry {
    handles: AsyncMutex<HashMap<UserId, Arc<FsMirrorHandle>>>,
}

impl FsMirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the running mirror for `(user_id, instance)`, starting a
    /// fresh one if none is running or the running one is bound to a
    /// stale instance.
    pub async fn get_or_start(
        &self,
        driver: Arc<dyn SandboxDriver>,
        user_id: &UserId,
        instance: &InstanceId,
        watch_path: &str,
    ) -> Result<Arc<FsMirrorHandle>, FsRegistryError> {
        let mut handles = self.handles.lock().await;

        if let Some(existing) = handles.get(user_id) {
            if &existing.instance == instance {
                return Ok(existing.clone());
            }
            tracing::info!(user = %user_id, "sandbox instance changed, restarting filesystem mirror");
        }

        let mirror = Arc::new(FilesystemMirror::new(instance.clone(), watch_path.to_string()));
        let initial = mirror.start_watching(driver.as_ref()).await?;
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);

        let poll_task = spawn_poll_loop(driver, mirror.clone(), tx.clone());
        let handle = Arc::new(FsMirrorHandle {
            instance: instance.clone(),
            mirror,
            events: tx,
            initial_sync: parking_lot::Mutex::new(initial),
            poll_task,
        });

        handles.insert(user_id.clone(), handle.clone());
        Ok(handle)
    }

    /// Stops and forgets `user_id`'s mirror, if any; session teardown
    /// tears its filesystem mirror down too.
    pub async fn stop(&self, driver: &dyn SandboxDriver, user_id: &UserId) {
        let removed = self.handles.lock().await.remove(user_id);
        if let Some(handle) = removed {
            if let Err(e) = handle.mirror.stop_watching(driver).await {
                tracing::warn!(user = %user_id, error = %e, "error stopping filesystem watcher during teardown");
            }
        }
    }
}

fn spawn_poll_loop(
    driver: Arc<dyn SandboxDriver>,
    mirror: Arc<FilesystemMirror>,
    tx: broadcast::Sender<ChangeEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(FS_POLL_INTERVAL).await;
            if !mirror.is_running() {
                break;
            }
            match mirror.poll_once(driver.as_ref()).await {
                Ok(events) => {
                    for event in events {
                        // No receivers is the common case between polls;
                        // a dropped channel just means every connection
                        // has gone away, which is not an error.
                        let _ = tx.send(event);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "filesystem poll tick failed");
                    tokio::time::sleep(xoblas_core::constants::FS_ERROR_BACKOFF).await;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "fs_registry_tests.rs"]
mod tests;
