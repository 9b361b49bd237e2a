// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `SandboxDriver` double for `SessionRegistry` tests: records
//! every call so a test can assert exactly one `start_instance` happened
//! under concurrent `acquire`s.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::os::fd::OwnedFd;
use std::sync::atomic::{AtomicUsize, Ordering};

use xoblas_core::{InstanceId, UserId};

use crate::driver::{ExecOutput, PtyHandle, SandboxDriver, SandboxError};

#[derive(Default)]
pub struct MockSandboxDriver {
    pub build_image_calls: AtomicUsize,
    pub start_instance_calls: Mutex<Vec<UserId>>,
    pub stop_instance_calls: Mutex<Vec<InstanceId>>,
    pub exec_calls: Mutex<Vec<(InstanceId, Vec<String>)>>,
    /// Queued responses consumed in order by `exec`, falling back to an
    /// empty success output once exhausted. Lets mirror/watcher tests
    /// script what `wc -c`/`tail -c`/`find` would have printed without a
    /// real sandbox.
    exec_script: Mutex<std::collections::VecDeque<ExecOutput>>,
    alive: Mutex<HashSet<InstanceId>>,
    fail_start: Mutex<bool>,
}

impl MockSandboxDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_start(&self, fail: bool) {
        *self.fail_start.lock() = fail;
    }

    pub fn start_calls(&self) -> usize {
        self.start_instance_calls.lock().len()
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_instance_calls.lock().len()
    }

    /// Queues `output` to be returned by the next `exec` call.
    pub fn push_exec_output(&self, output: ExecOutput) {
        self.exec_script.lock().push_back(output);
    }
}

#[async_trait]
impl SandboxDriver for MockSandboxDriver {
    async fn build_image(&self) -> Result<String, SandboxError> {
        self.build_image_calls.fetch_add(1, Ordering::SeqCst);
        Ok("mock:latest".into())
    }

    async fn start_instance(&self, user_id: &UserId) -> Result<InstanceId, SandboxError> {
        if *self.fail_start.lock() {
            return Err(SandboxError::StartFailed {
                user: user_id.clone(),
                reason: "injected test failure".into(),
            });
        }
        self.start_instance_calls.lock().push(user_id.clone());
        let instance = InstanceId::new(format!("mock-{user_id}"));
        self.alive.lock().insert(instance.clone());
        Ok(instance)
    }

    async fn exec(&self, instance_id: &InstanceId, argv: &[String]) -> Result<ExecOutput, SandboxError> {
        self.exec_calls.lock().push((instance_id.clone(), argv.to_vec()));
        Ok(self.exec_script.lock().pop_front().unwrap_or(ExecOutput {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
        }))
    }

    fn attach_pty(&self, _instance_id: &InstanceId, _argv: &[String]) -> Result<PtyHandle, SandboxError> {
        let null = std::fs::File::open("/dev/null")
            .map_err(|e| SandboxError::AttachFailed(e.to_string()))?;
        Ok(PtyHandle {
            child_pid: nix::unistd::Pid::this(),
            master_fd: OwnedFd::from(null),
        })
    }

    /// Unlike `exec`, this runs `argv` for real (on the host, not inside
    /// any container) rather than replaying a scripted response — tests
    /// that need a live stdin/stdout pump (e.g. `xoblas-lsp`'s framing
    /// round trip) pass a `sh -c` script that behaves like the process
    /// under test.
    fn spawn_piped(&self, _instance_id: &InstanceId, argv: &[String]) -> Result<crate::driver::PipedProcess, SandboxError> {
        let (program, rest) = argv.split_first().ok_or_else(|| SandboxError::ExecFailed("empty argv".into()))?;
        let child = tokio::process::Command::new(program)
            .args(rest)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
        Ok(crate::driver::PipedProcess { child })
    }

    async fn is_alive(&self, instance_id: &InstanceId) -> bool {
        self.alive.lock().contains(instance_id)
    }

    async fn stop_instance(&self, instance_id: &InstanceId) -> Result<(), SandboxError> {
        self.stop_instance_calls.lock().push(instance_id.clone());
        self.alive.lock().remove(instance_id);
        Ok(())
    }
}
