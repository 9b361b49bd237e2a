// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ExecuteJob`: writes client code to a temp file, runs it under an
//! interpreter subprocess with CPU/memory caps, and captures its output.
//! Grounded on `run_safe_subprocess.py`'s `run_client_code` (temp-file
//! lifecycle) and `safe_env.py`'s `cap_resources` (the rlimit values), with
//! the actual `nix::sys::resource::setrlimit` call pattern grounded on
//! `examples/other_examples/40eb63b9_diggerhq-opensandbox__src-main.rs.rs`'s
//! `set_resource_limits`.

use std::io::Write as _;
use std::os::unix::process::CommandExt as _;
use std::process::Stdio;

use nix::sys::resource::{setrlimit, Resource};
use thiserror::Error;

use xoblas_core::constants::{EXECUTE_CPU_LIMIT_MAX, EXECUTE_CPU_LIMIT_MIN, EXECUTE_MEM_LIMIT};

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to stage temp file: {0}")]
    TempFile(#[from] std::io::Error),
    #[error("failed to spawn interpreter: {0}")]
    Spawn(String),
    #[error("failed to wait for interpreter: {0}")]
    Wait(String),
}

/// Captured result of running a code string to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs untrusted client code in a capped subprocess. One instance is
/// reusable across runs; it only carries the interpreter path.
pub struct ExecuteJob {
    interpreter: String,
}

impl Default for ExecuteJob {
    fn default() -> Self {
        Self { interpreter: "python3".to_string() }
    }
}

impl ExecuteJob {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self { interpreter: interpreter.into() }
    }

    /// Writes `code` to a temp `.py` file, runs it under the interpreter
    /// with CPU/address-space caps applied, and returns the captured
    /// stdout/stderr. The temp file is removed on drop regardless of
    /// outcome, matching the original's `finally: os.unlink(temp_filename)`.
    pub async fn run(&self, code: &str) -> Result<ExecuteOutcome, ExecuteError> {
        let mut temp_file = tempfile::Builder::new().suffix(".py").tempfile()?;
        temp_file.write_all(code.as_bytes())?;
        temp_file.flush()?;
        let path = temp_file.path().to_path_buf();

        let interpreter = self.interpreter.clone();
        let output = tokio::task::spawn_blocking(move || {
            let mut cmd = std::process::Command::new(&interpreter);
            cmd.arg(&path);
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());

            // Safety: pre_exec runs in the forked child before exec and
            // only calls setrlimit, matching the diggerhq-opensandbox
            // set_resource_limits pattern.
            unsafe {
                cmd.pre_exec(apply_resource_caps);
            }

            cmd.output()
        })
        .await
        .map_err(|e| ExecuteError::Wait(e.to_string()))?
        .map_err(|e| ExecuteError::Spawn(e.to_string()))?;

        drop(temp_file);

        if !output.status.success() {
            tracing::warn!(interpreter = %self.interpreter, status = %output.status, "execute job exited non-zero");
        }

        Ok(ExecuteOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Applies the CPU-time and address-space caps. `safe_env.py`'s
/// `cap_resources` sets soft == hard (2, 2); here the soft limit sits at
/// `EXECUTE_CPU_LIMIT_MIN` so the interpreter gets a `SIGXCPU` warning
/// before the hard `EXECUTE_CPU_LIMIT_MAX` ceiling kills it outright.
fn apply_resource_caps() -> std::io::Result<()> {
    let cpu_soft = EXECUTE_CPU_LIMIT_MIN.as_secs();
    let cpu_hard = EXECUTE_CPU_LIMIT_MAX.as_secs();
    setrlimit(Resource::RLIMIT_CPU, cpu_soft, cpu_hard).map_err(std::io::Error::from)?;
    setrlimit(Resource::RLIMIT_AS, EXECUTE_MEM_LIMIT, EXECUTE_MEM_LIMIT).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
