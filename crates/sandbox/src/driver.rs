// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sandbox backend contract: build/start/exec/attach/stop against an
//! isolated per-user Linux userland.

use async_trait::async_trait;
use nix::unistd::Pid;
use std::os::fd::OwnedFd;
use thiserror::Error;
use tokio::process::Child;

use xoblas_core::{InstanceId, UserId};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("image build failed: {0}")]
    BuildFailed(String),
    #[error("instance start failed for {user}: {reason}")]
    StartFailed { user: UserId, reason: String },
    #[error("instance {0} is not alive")]
    NotAlive(InstanceId),
    #[error("exec failed: {0}")]
    ExecFailed(String),
    #[error("pty attach failed: {0}")]
    AttachFailed(String),
    #[error("stop failed: {0}")]
    StopFailed(String),
}

/// Result of `attach_pty`: a forked host-side process connected to the
/// in-sandbox argv via a controlling terminal, plus the PTY master fd.
pub struct PtyHandle {
    pub child_pid: Pid,
    pub master_fd: OwnedFd,
}

/// Output of a one-shot `exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// A long-lived child process exec'd inside the instance with piped stdio,
/// used by `xoblas-lsp` to frame Content-Length messages over
/// stdin/stdout rather than waiting for one-shot completion like `exec`.
/// Added because the LSP proxy needs a persistent piped process and
/// `exec` only ever returns after the child exits.
pub struct PipedProcess {
    pub child: Child,
}

/// The sandbox backend contract. The orchestrator treats any implementor
/// as interchangeable; `SessionRegistry` holds one `Arc<dyn SandboxDriver>`
/// for the whole process.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Build or fetch the sandbox image. Idempotent: a no-op if the tag
    /// already exists.
    async fn build_image(&self) -> Result<String, SandboxError>;

    /// Start (or reuse) a long-lived instance for `user_id`, with a named
    /// volume mounted at the sandbox home path. Returns an opaque handle.
    async fn start_instance(&self, user_id: &UserId) -> Result<InstanceId, SandboxError>;

    /// Run `argv` to completion inside the instance and capture its
    /// output. Never composes a shell string; `argv[0]` is exec'd
    /// directly.
    async fn exec(&self, instance_id: &InstanceId, argv: &[String]) -> Result<ExecOutput, SandboxError>;

    /// Fork a host-side process that attaches a controlling terminal to
    /// `argv` running inside the instance (a `docker exec -it` equivalent).
    fn attach_pty(&self, instance_id: &InstanceId, argv: &[String]) -> Result<PtyHandle, SandboxError>;

    /// Spawn `argv` inside the instance with piped (non-PTY) stdio, left
    /// running for the caller to read/write incrementally. Used for LSP
    /// child processes, which frame their own protocol over stdin/stdout
    /// rather than needing a controlling terminal.
    fn spawn_piped(&self, instance_id: &InstanceId, argv: &[String]) -> Result<PipedProcess, SandboxError>;

    /// Liveness check.
    async fn is_alive(&self, instance_id: &InstanceId) -> bool;

    /// Stop and remove the instance. Errors are logged by the caller and
    /// swallowed — the registry must converge to "no session" regardless.
    async fn stop_instance(&self, instance_id: &InstanceId) -> Result<(), SandboxError>;
}
