// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PtyController`: owns one non-blocking PTY attached to an interactive
//! shell inside a sandbox instance.

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

use xoblas_core::constants::{IMMEDIATE_READ, PROMPT_READ_TIMEOUT, PROMPT_SUFFIX};
use xoblas_core::InstanceId;
use xoblas_sandbox::{PtyHandle, SandboxDriver, SandboxError};

use crate::escape::AltScreenTracker;
use crate::prompt::{parse_prompt_info, PromptInfo};

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("pty attach failed: {0}")]
    Attach(#[from] SandboxError),
    #[error("pty io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pty is closed")]
    Closed,
}

/// Result of one `read_until_prompt`/`read_immediate` call.
#[derive(Debug, Clone)]
pub struct PtyReadResult {
    pub output: String,
    /// Set once, the read a `CSI ?1049l` transition was observed during:
    /// a true→false alternate-screen flip, which should trigger a file
    /// re-read by `WorkspaceEditor`.
    pub exited_alternate_screen: bool,
    /// In prompt mode: whether `PROMPT_SUFFIX` was observed before the
    /// read timed out.
    pub hit_prompt: bool,
}

pub struct PtyController {
    master_fd: OwnedFd,
    child_pid: Pid,
    rows: u16,
    cols: u16,
    alt_tracker: AltScreenTracker,
    last_prompt: PromptInfo,
}

impl PtyController {
    /// Attach to `instance_id` by asking the sandbox driver to fork a
    /// host process connected to `shell_argv` via a controlling terminal.
    pub fn attach(
        driver: &dyn SandboxDriver,
        instance_id: &InstanceId,
        shell_argv: &[String],
        rows: u16,
        cols: u16,
    ) -> Result<Self, PtyError> {
        let PtyHandle { child_pid, master_fd } = driver.attach_pty(instance_id, shell_argv)?;

        let flags = fcntl(master_fd.as_raw_fd(), FcntlArg::F_GETFL)?;
        let mut flags = OFlag::from_bits_truncate(flags);
        flags.insert(OFlag::O_NONBLOCK);
        fcntl(master_fd.as_raw_fd(), FcntlArg::F_SETFL(flags))?;

        Ok(Self {
            master_fd,
            child_pid,
            rows,
            cols,
            alt_tracker: AltScreenTracker::new(),
            last_prompt: PromptInfo::default(),
        })
    }

    pub fn in_alternate_screen(&self) -> bool {
        self.alt_tracker.in_alternate_screen()
    }

    pub fn last_prompt(&self) -> &PromptInfo {
        &self.last_prompt
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Write the prompt template, terminal mode, and initial geometry.
    pub async fn configure(&mut self) -> Result<(), PtyError> {
        self.write(b"export PS1=\"__START__\\u@\\h:\\w__END__$ \"\n").await?;
        self.write(b"export TERM=xterm-256color\n").await?;
        self.write(b"stty sane\n").await?;
        self.write(b"stty -icanon -echo\n").await?;
        self.write(b"stty opost onlcr\n").await?;
        self.write(b"bind '\"\\e[C\": forward-char'\n").await?;
        self.write(b"bind '\"\\eOC\": forward-char'\n").await?;
        self.write(b"reset\n").await?;
        self.write(b"\x1b[H\x1b[2J").await?;

        let (cols, rows) = (self.cols, self.rows);
        self.resize(rows, cols).await
    }

    /// Write raw bytes to the PTY, retrying on `EAGAIN` until the whole
    /// buffer lands.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        let mut written = 0;
        while written < data.len() {
            match nix::unistd::write(&self.master_fd, &data[written..]) {
                Ok(n) => written += n,
                Err(nix::errno::Errno::EAGAIN) => sleep(Duration::from_millis(5)).await,
                Err(e) => return Err(PtyError::Io(e.into())),
            }
        }
        Ok(())
    }

    fn read_once(&mut self, buf: &mut [u8]) -> Result<Option<usize>, PtyError> {
        match nix::unistd::read(self.master_fd.as_raw_fd(), buf) {
            Ok(0) => Err(PtyError::Closed),
            Ok(n) => Ok(Some(n)),
            Err(nix::errno::Errno::EAGAIN) => Ok(None),
            Err(e) => Err(PtyError::Io(e.into())),
        }
    }

    /// Read until `PROMPT_SUFFIX` appears, or `PROMPT_READ_TIMEOUT`
    /// elapses.
    pub async fn read_until_prompt(&mut self) -> Result<PtyReadResult, PtyError> {
        self.read_for(PROMPT_READ_TIMEOUT, true).await
    }

    /// Read whatever is available within a short window, used in
    /// alternate-screen ("raw") mode.
    pub async fn read_immediate(&mut self) -> Result<PtyReadResult, PtyError> {
        self.read_for(IMMEDIATE_READ, false).await
    }

    async fn read_for(&mut self, timeout: Duration, stop_at_prompt: bool) -> Result<PtyReadResult, PtyError> {
        let deadline = Instant::now() + timeout;
        let mut raw = Vec::new();
        let mut exited_alternate_screen = false;
        let mut hit_prompt = false;
        let mut buf = [0u8; 4096];

        while Instant::now() < deadline {
            match self.read_once(&mut buf) {
                Ok(Some(n)) => {
                    if self.alt_tracker.feed(&buf[..n]) {
                        exited_alternate_screen = true;
                    }
                    raw.extend_from_slice(&buf[..n]);
                    if stop_at_prompt && String::from_utf8_lossy(&raw).contains(PROMPT_SUFFIX) {
                        hit_prompt = true;
                        break;
                    }
                }
                Ok(None) => sleep(Duration::from_millis(10)).await,
                Err(e) => return Err(e),
            }
        }

        let output = String::from_utf8_lossy(&raw).into_owned();
        if hit_prompt {
            self.last_prompt = parse_prompt_info(&output);
        }
        Ok(PtyReadResult {
            output,
            exited_alternate_screen,
            hit_prompt,
        })
    }

    /// Read until `PROMPT_SUFFIX` appears, invoking `on_chunk` with each raw
    /// chunk as it arrives instead of only returning the accumulated buffer
    /// at the end. Chunks are unfiltered;
    /// stripping the prompt sentinel and the command's own echo is the
    /// caller's job (`WorkspaceEditor`), matching `execute_streaming`'s
    /// division of labor with `_filter_chunk` in the original.
    pub async fn read_streaming_until_prompt<F: FnMut(&str)>(&mut self, mut on_chunk: F) -> Result<PtyReadResult, PtyError> {
        let deadline = Instant::now() + PROMPT_READ_TIMEOUT;
        let mut raw = Vec::new();
        let mut exited_alternate_screen = false;
        let mut hit_prompt = false;
        let mut buf = [0u8; 4096];

        while Instant::now() < deadline {
            match self.read_once(&mut buf) {
                Ok(Some(n)) => {
                    if self.alt_tracker.feed(&buf[..n]) {
                        exited_alternate_screen = true;
                    }
                    on_chunk(&String::from_utf8_lossy(&buf[..n]));
                    raw.extend_from_slice(&buf[..n]);
                    if String::from_utf8_lossy(&raw).contains(PROMPT_SUFFIX) {
                        hit_prompt = true;
                        break;
                    }
                }
                Ok(None) => sleep(Duration::from_millis(10)).await,
                Err(e) => return Err(e),
            }
        }

        let output = String::from_utf8_lossy(&raw).into_owned();
        if hit_prompt {
            self.last_prompt = parse_prompt_info(&output);
        }
        Ok(PtyReadResult {
            output,
            exited_alternate_screen,
            hit_prompt,
        })
    }

    /// Apply new geometry, deliver `SIGWINCH`, and drain/capture residual
    /// output depending on mode.
    pub async fn resize(&mut self, rows: u16, cols: u16) -> Result<Option<String>, PtyError> {
        self.rows = rows;
        self.cols = cols;

        let winsize = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let ret = unsafe { libc::ioctl(self.master_fd.as_raw_fd(), libc::TIOCSWINSZ, &winsize) };
        if ret != 0 {
            return Err(PtyError::Io(std::io::Error::last_os_error()));
        }

        if !self.is_process_alive() {
            return Ok(None);
        }
        let _ = signal::kill(self.child_pid, Signal::SIGWINCH);

        if self.in_alternate_screen() {
            let captured = self.read_immediate().await?;
            Ok(Some(captured.output))
        } else {
            self.write(format!("stty columns {cols} rows {rows}\n").as_bytes()).await?;
            sleep(Duration::from_millis(100)).await;
            let _ = self.read_immediate().await?;
            Ok(None)
        }
    }

    pub fn is_process_alive(&self) -> bool {
        signal::kill(self.child_pid, None).is_ok()
    }

    pub fn close(&mut self) {
        if self.is_process_alive() {
            let _ = signal::kill(self.child_pid, Signal::SIGTERM);
        }
    }
}

impl Drop for PtyController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
