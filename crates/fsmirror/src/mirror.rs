// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FilesystemMirror`: bidirectional bridge between the browser's
//! `file_operation` messages and the in-sandbox watcher's event log.
//! Grounded on `filesystem_watcher.py`'s `FilesystemWatcher`, with the
//! watcher script embedded at compile time rather than read off disk at
//! request time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

use xoblas_core::constants::{INITIAL_SYNC_CAP, MAX_FILE_INLINE};
use xoblas_core::InstanceId;
use xoblas_sandbox::{SandboxDriver, SandboxError};
use xoblas_wire::filesystem::{ClientOperation, FileInfo, FilesystemContent, FilesystemEvent, TranslatedFileChange};

use crate::pending::PendingOperations;
use crate::translate::{echo_key, translate_event};

const EVENTS_FILE: &str = "/tmp/fs_events.jsonl";
const SCRIPT_PATH: &str = "/tmp/fs_monitor.py";
const MONITOR_SCRIPT: &str = include_str!("../assets/fs_monitor.py");

#[derive(Debug, Error)]
pub enum FsMirrorError {
    #[error("sandbox exec failed: {0}")]
    Exec(#[from] SandboxError),
    #[error("watcher is already running")]
    AlreadyRunning,
}

/// One change surfaced by a poll tick, ready to be framed into a
/// `FilesystemServerMessage::FilesystemChangeFromContainer` — one message
/// per event, matching `_process_events`'s per-line dispatch. `Clone` so
/// `xoblas-daemon` can fan one event out to every `broadcast` subscriber
/// watching the same user's mirror.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub operation: ClientOperation,
    pub file: TranslatedFileChange,
    pub timestamp: f64,
}

/// Result of `perform_initial_sync`: every file/directory under
/// `watch_path`, each reported as a synthetic `create` so a freshly
/// connected client can materialize the tree. `Clone` so a late-joining
/// connection
/// that reuses an already-running mirror can replay the same snapshot.
#[derive(Debug, Clone)]
pub struct InitialSync {
    pub files: Vec<TranslatedFileChange>,
    pub truncated: bool,
}

pub struct FilesystemMirror {
    instance: InstanceId,
    watch_path: String,
    pending: PendingOperations,
    offset: AtomicU64,
    running: AtomicBool,
}

impl FilesystemMirror {
    pub fn new(instance: InstanceId, watch_path: impl Into<String>) -> Self {
        Self {
            instance,
            watch_path: watch_path.into(),
            pending: PendingOperations::new(),
            offset: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn pending(&self) -> &PendingOperations {
        &self.pending
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Writes the watcher script into the sandbox and launches it
    /// detached, then performs the initial tree sync.
    pub async fn start_watching(&self, driver: &dyn SandboxDriver) -> Result<InitialSync, FsMirrorError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FsMirrorError::AlreadyRunning);
        }

        if let Err(e) = self.install_and_launch(driver).await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.offset.store(0, Ordering::SeqCst);
        self.perform_initial_sync(driver).await
    }

    async fn install_and_launch(&self, driver: &dyn SandboxDriver) -> Result<(), FsMirrorError> {
        exec(driver, &self.instance, &["mkdir", "-p", &self.watch_path]).await?;

        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, MONITOR_SCRIPT.as_bytes());
        let write_script = format!("base64 -d > {SCRIPT_PATH}");
        exec_with_stdin(driver, &self.instance, &write_script, encoded.as_bytes()).await?;
        exec(driver, &self.instance, &["chmod", "+x", SCRIPT_PATH]).await?;

        // `$1` carries the watch path so it never appears interpolated
        // into the shell script text itself.
        let launch = format!("nohup python3 {SCRIPT_PATH} \"$1\" > /tmp/fs_monitor.log 2>&1 &");
        exec(
            driver,
            &self.instance,
            &["sh", "-c", &launch, "sh", &self.watch_path],
        )
        .await?;
        Ok(())
    }

    /// Kills the in-sandbox watcher process. A no-op if it isn't running.
    pub async fn stop_watching(&self, driver: &dyn SandboxDriver) -> Result<(), FsMirrorError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        exec(driver, &self.instance, &["pkill", "-f", "python3.*fs_monitor.py"]).await?;
        Ok(())
    }

    async fn perform_initial_sync(&self, driver: &dyn SandboxDriver) -> Result<InitialSync, FsMirrorError> {
        let find_expr = [
            "find",
            &self.watch_path,
            "(",
            "-path",
            "*/.git",
            "-o",
            "-path",
            "*/__pycache__",
            "-o",
            "-path",
            "*/node_modules",
            "-o",
            "-path",
            "*/.vscode",
            ")",
            "-prune",
            "-o",
            "-type",
            "f",
            "-print",
            "-o",
            "-type",
            "d",
            "-print",
        ];
        let out = exec(driver, &self.instance, &find_expr).await?;
        let all_paths: Vec<&str> = std::str::from_utf8(&out)
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let truncated = all_paths.len() > INITIAL_SYNC_CAP;
        let mut files = Vec::new();
        for path in all_paths.into_iter().take(INITIAL_SYNC_CAP) {
            if let Some(entry) = self.sync_one(driver, path).await {
                files.push(entry);
            }
        }
        Ok(InitialSync { files, truncated })
    }

    async fn sync_one(&self, driver: &dyn SandboxDriver, path: &str) -> Option<TranslatedFileChange> {
        let stat = exec(driver, &self.instance, &["stat", "-c", "%F|%s|%Y|%a", path]).await.ok()?;
        let stat = std::str::from_utf8(&stat).ok()?.trim();
        let parts: Vec<&str> = stat.split('|').collect();
        if parts.len() != 4 {
            return None;
        }
        let is_directory = parts[0].contains("directory");
        let size: u64 = parts[1].parse().ok()?;
        let mtime: f64 = parts[2].parse().ok()?;
        let permissions = parts[3].to_string();
        let name = path.rsplit('/').next().unwrap_or(path).to_string();

        let file_info = FileInfo { size, mtime, permissions, name };
        let (content, content_type) = if is_directory {
            (None, None)
        } else {
            match self.read_file(driver, path, size).await {
                Some(c) => split_content(c),
                None => (None, None),
            }
        };

        Some(TranslatedFileChange {
            operation: ClientOperation::Create,
            path: path.to_string(),
            is_directory,
            content,
            content_type,
            file_info: Some(file_info),
            old_path: None,
        })
    }

    async fn read_file(&self, driver: &dyn SandboxDriver, path: &str, size: u64) -> Option<FilesystemContent> {
        if size > MAX_FILE_INLINE {
            return Some(FilesystemContent::FileTooLarge);
        }
        if size == 0 {
            return Some(FilesystemContent::Text { content: String::new() });
        }
        let bytes = exec(driver, &self.instance, &["cat", path]).await.ok()?;
        match String::from_utf8(bytes.clone()) {
            Ok(text) => Some(FilesystemContent::Text { content: text }),
            Err(_) => {
                let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes);
                Some(FilesystemContent::Binary { content: encoded })
            }
        }
    }

    /// Reads whatever new bytes have been appended to the event log since
    /// the last tick, translates them, and drops any that match a pending
    /// client-initiated operation.
    pub async fn poll_once(&self, driver: &dyn SandboxDriver) -> Result<Vec<ChangeEvent>, FsMirrorError> {
        self.pending.sweep_expired();

        let size_out = exec(
            driver,
            &self.instance,
            &["sh", "-c", &format!("test -f {EVENTS_FILE} && wc -c < {EVENTS_FILE} || echo 0")],
        )
        .await?;
        let current_size: u64 = std::str::from_utf8(&size_out)
            .unwrap_or("0")
            .trim()
            .parse()
            .unwrap_or(0);

        let last_offset = self.offset.load(Ordering::SeqCst);
        if current_size <= last_offset {
            return Ok(Vec::new());
        }

        let tail_script = format!("tail -c \"+$1\" {EVENTS_FILE}");
        let offset_arg = (last_offset + 1).to_string();
        let tail_out = exec(
            driver,
            &self.instance,
            &["sh", "-c", &tail_script, "sh", &offset_arg],
        )
        .await?;
        self.offset.store(current_size, Ordering::SeqCst);

        Ok(parse_event_lines(&tail_out)
            .into_iter()
            .filter_map(|event| self.apply_echo_filter(event))
            .collect())
    }

    fn apply_echo_filter(&self, event: FilesystemEvent) -> Option<ChangeEvent> {
        let (operation, path) = echo_key(&event);
        if self.pending.take_if_pending(operation, &path) {
            tracing::debug!(operation = ?operation, path, "dropping self-initiated filesystem event");
            return None;
        }
        let timestamp = event.timestamp;
        let file = translate_event(&event);
        Some(ChangeEvent { operation, file, timestamp })
    }
}

fn parse_event_lines(bytes: &[u8]) -> Vec<FilesystemEvent> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<FilesystemEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed filesystem event line");
                None
            }
        })
        .collect()
}

fn split_content(content: FilesystemContent) -> (Option<String>, Option<String>) {
    match content {
        FilesystemContent::Text { content } => (Some(content), Some("text".to_string())),
        FilesystemContent::Binary { content } => (Some(content), Some("binary".to_string())),
        FilesystemContent::FileTooLarge => (None, Some("file_too_large".to_string())),
        FilesystemContent::NotFile => (None, Some("not_file".to_string())),
        FilesystemContent::ReadError { message } => (Some(message), Some("read_error".to_string())),
    }
}

async fn exec(driver: &dyn SandboxDriver, instance: &InstanceId, argv: &[&str]) -> Result<Vec<u8>, SandboxError> {
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    let out = driver.exec(instance, &argv).await?;
    Ok(out.stdout)
}

/// Pipes `stdin_bytes` into `sh -c script` — used only for writing the
/// watcher script itself (a fixed command, never an interpolated path or
/// content value) via `spawn_piped`.
async fn exec_with_stdin(
    driver: &dyn SandboxDriver,
    instance: &InstanceId,
    script: &str,
    stdin_bytes: &[u8],
) -> Result<(), SandboxError> {
    use tokio::io::AsyncWriteExt;

    let mut piped = driver.spawn_piped(instance, &["sh".to_string(), "-c".to_string(), script.to_string()])?;
    if let Some(mut stdin) = piped.child.stdin.take() {
        stdin
            .write_all(stdin_bytes)
            .await
            .map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
    }
    piped
        .child
        .wait()
        .await
        .map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
