// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker-backed `SandboxDriver`, grounded on `docker_manager.py` but
//! rewritten so every command is exec'd as an argv array — never a shell
//! string built by interpolating a path or id into a command line.

use async_trait::async_trait;
use nix::pty::{openpty, Winsize};
use nix::sys::termios::{self, SetArg};
use nix::unistd::Pid;
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;

use xoblas_core::{InstanceId, UserId};

use crate::driver::{ExecOutput, PtyHandle, SandboxDriver, SandboxError};

/// Home directory mounted inside every sandbox instance.
pub const SANDBOX_HOME: &str = "/home/termuser";

pub struct DockerSandboxDriver {
    image: String,
}

impl DockerSandboxDriver {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }

    fn container_name(user_id: &UserId) -> String {
        format!("xoblas-sandbox-{user_id}")
    }

    async fn run_docker(args: &[&str]) -> Result<std::process::Output, SandboxError> {
        AsyncCommand::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| SandboxError::ExecFailed(format!("failed to spawn docker: {e}")))
    }
}

#[async_trait]
impl SandboxDriver for DockerSandboxDriver {
    async fn build_image(&self) -> Result<String, SandboxError> {
        let inspect = Self::run_docker(&["image", "inspect", &self.image]).await?;
        if inspect.status.success() {
            return Ok(self.image.clone());
        }

        let build = AsyncCommand::new("docker")
            .args(["build", "-t", &self.image, "."])
            .output()
            .await
            .map_err(|e| SandboxError::BuildFailed(e.to_string()))?;
        if !build.status.success() {
            return Err(SandboxError::BuildFailed(
                String::from_utf8_lossy(&build.stderr).into_owned(),
            ));
        }
        Ok(self.image.clone())
    }

    async fn start_instance(&self, user_id: &UserId) -> Result<InstanceId, SandboxError> {
        let name = Self::container_name(user_id);

        // Reuse a running container if one already answers to this name.
        let inspect = Self::run_docker(&["inspect", "-f", "{{.State.Running}}", &name]).await?;
        if inspect.status.success() && String::from_utf8_lossy(&inspect.stdout).trim() == "true" {
            return Ok(InstanceId::new(name));
        }

        let _ = Self::run_docker(&["volume", "create", user_id.as_str()]).await?;

        let mount = format!("{}:{}", user_id.as_str(), SANDBOX_HOME);
        let run = Self::run_docker(&[
            "run", "-d", "-i", "--rm", "--name", &name, "-v", &mount, &self.image, "tail", "-f",
            "/dev/null",
        ])
        .await?;
        if !run.status.success() {
            return Err(SandboxError::StartFailed {
                user: user_id.clone(),
                reason: String::from_utf8_lossy(&run.stderr).into_owned(),
            });
        }
        Ok(InstanceId::new(name))
    }

    async fn exec(&self, instance_id: &InstanceId, argv: &[String]) -> Result<ExecOutput, SandboxError> {
        let mut args: Vec<&str> = vec!["exec", instance_id.as_str()];
        args.extend(argv.iter().map(String::as_str));
        let output = Self::run_docker(&args).await?;
        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    fn attach_pty(&self, instance_id: &InstanceId, argv: &[String]) -> Result<PtyHandle, SandboxError> {
        let pty = openpty(None, None).map_err(|e| SandboxError::AttachFailed(e.to_string()))?;
        let master = pty.master;
        let slave = pty.slave;

        // Raw mode on the slave side so escape sequences pass through
        // byte-for-byte once the child attaches to it.
        if let Ok(mut term) = termios::tcgetattr(&slave) {
            termios::cfmakeraw(&mut term);
            let _ = termios::tcsetattr(&slave, SetArg::TCSANOW, &term);
        }

        let mut cmd = std::process::Command::new("docker");
        cmd.arg("exec").arg("-it").arg(instance_id.as_str());
        cmd.args(argv);

        let slave_fd = slave.as_raw_fd();
        cmd.stdin(unsafe { Stdio::from_raw_fd_checked(slave_fd)? });
        cmd.stdout(unsafe { Stdio::from_raw_fd_checked(slave_fd)? });
        cmd.stderr(unsafe { Stdio::from_raw_fd_checked(slave_fd)? });

        // Safety: pre_exec runs in the forked child before exec, after
        // stdio has been replaced with the PTY slave. It only calls
        // async-signal-safe syscalls (setsid, ioctl) as Sandchest's
        // spawn_shell does for the same purpose.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                let fd = std::io::stdin().as_raw_fd();
                if libc::ioctl(fd, libc::TIOCSCTTY as _, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd
            .spawn()
            .map_err(|e| SandboxError::AttachFailed(e.to_string()))?;
        let child_pid = Pid::from_raw(child.id() as i32);
        // The child owns the slave fds via dup; the parent never reads
        // the slave again, so the process handle itself can be dropped.
        std::mem::forget(child);
        drop(slave);

        Ok(PtyHandle { child_pid, master_fd: master })
    }

    fn spawn_piped(&self, instance_id: &InstanceId, argv: &[String]) -> Result<crate::driver::PipedProcess, SandboxError> {
        let mut cmd = AsyncCommand::new("docker");
        cmd.arg("exec").arg("-i").arg(instance_id.as_str());
        cmd.args(argv);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
        Ok(crate::driver::PipedProcess { child })
    }

    async fn is_alive(&self, instance_id: &InstanceId) -> bool {
        match Self::run_docker(&["inspect", "-f", "{{.State.Running}}", instance_id.as_str()]).await {
            Ok(out) => out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true",
            Err(_) => false,
        }
    }

    async fn stop_instance(&self, instance_id: &InstanceId) -> Result<(), SandboxError> {
        let stop = Self::run_docker(&["stop", instance_id.as_str()]).await?;
        if !stop.status.success() {
            return Err(SandboxError::StopFailed(
                String::from_utf8_lossy(&stop.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}

trait StdioFromRawFdChecked {
    unsafe fn from_raw_fd_checked(fd: i32) -> Result<Stdio, SandboxError>;
}

impl StdioFromRawFdChecked for Stdio {
    unsafe fn from_raw_fd_checked(fd: i32) -> Result<Stdio, SandboxError> {
        use std::os::fd::FromRawFd;
        if fd < 0 {
            return Err(SandboxError::AttachFailed("invalid pty slave fd".into()));
        }
        // Duplicated so each of stdin/stdout/stderr owns an independent
        // fd; the caller closes the original slave after spawning.
        let dup = libc::dup(fd);
        if dup < 0 {
            return Err(SandboxError::AttachFailed(std::io::Error::last_os_error().to_string()));
        }
        Ok(Stdio::from_raw_fd(dup))
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
