// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkspaceEditor`: composes `PtyController` and a single conventional
//! open file to serve `/ws/terminal/{user_id}`. Grounded on
//! `xoblas_editor.py`'s `XoblasEditor.execute_streaming`/
//! `xoblas_editor_command`/`is_xoblas_command`/`resize`/`write_to_file`/
//! `read_from_file`.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use xoblas_core::constants::{DEFAULT_OPEN_FILE, PROMPT_PREFIX, PROMPT_SUFFIX};
use xoblas_core::InstanceId;
use xoblas_pty::escape::strip_ansi_and_newlines;
use xoblas_pty::{PtyController, PtyError};
use xoblas_sandbox::docker::SANDBOX_HOME;
use xoblas_sandbox::{SandboxDriver, SandboxError};
use xoblas_wire::terminal::TerminalServerMessage;

/// Shell exec'd inside the sandbox instance once `attach_pty` connects a
/// controlling terminal to it (matches `os.execvp("docker", ["docker",
/// "exec", "-it", container_id, "bash"])`).
pub const SHELL_ARGV: &[&str] = &["bash"];

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("pty error: {0}")]
    Pty(#[from] PtyError),
    #[error("sandbox exec failed: {0}")]
    Sandbox(#[from] SandboxError),
    #[error("failed to write open file: {0}")]
    WriteFailed(String),
    #[error("failed to read open file: {0}")]
    ReadFailed(String),
}

/// Terminal WebSocket façade: one per connection, owning a dedicated PTY
/// and the conventional open-file path inside the sandbox. Deliberately
/// not a `FilesystemMirror` — that's the bidirectional tree watcher wired
/// separately onto `/ws/filesystem`; this is the narrower single-path
/// read/write `xoblas_editor.py` composes directly via `FileManager`.
pub struct WorkspaceEditor {
    driver: Arc<dyn SandboxDriver>,
    instance: InstanceId,
    pty: PtyController,
    open_file_path: String,
}

impl WorkspaceEditor {
    /// Attaches a PTY to `instance` and configures the prompt/terminal
    /// mode.
    pub async fn attach(
        driver: Arc<dyn SandboxDriver>,
        instance: InstanceId,
        rows: u16,
        cols: u16,
    ) -> Result<Self, EditorError> {
        let argv: Vec<String> = SHELL_ARGV.iter().map(|s| s.to_string()).collect();
        let mut pty = PtyController::attach(driver.as_ref(), &instance, &argv, rows, cols)?;
        pty.configure().await?;

        let open_file_path = format!("{SANDBOX_HOME}/{DEFAULT_OPEN_FILE}");
        Ok(Self { driver, instance, pty, open_file_path })
    }

    pub fn open_file_path(&self) -> &str {
        &self.open_file_path
    }

    /// Reads the conventional open file, for sending a `file` record on
    /// connect or after an alternate-screen exit.
    pub async fn read_open_file(&self) -> Result<String, EditorError> {
        let out = self.driver.exec(&self.instance, &["cat".to_string(), self.open_file_path.clone()]).await?;
        if out.exit_code != 0 {
            return Err(EditorError::ReadFailed(String::from_utf8_lossy(&out.stderr).into_owned()));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    /// Builds the `file` record for the open file, falling back to an
    /// `error` record rather than failing the connection if the file
    /// can't be read yet (e.g. before the user has created it).
    pub async fn open_file_record(&self) -> TerminalServerMessage {
        match self.read_open_file().await {
            Ok(content) => TerminalServerMessage::File { content, file_path: self.open_file_path.clone() },
            Err(e) => {
                tracing::warn!(path = %self.open_file_path, error = %e, "failed to read open file");
                TerminalServerMessage::Error { message: e.to_string() }
            }
        }
    }

    /// Overwrites the open file with `content` via a base64 pipe, never
    /// interpolating the content into a shell command string (matches
    /// `xoblas-fsmirror`'s `exec_with_stdin`).
    pub async fn write_file(&self, content: &str) -> Result<(), EditorError> {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, content.as_bytes());
        let script = format!("base64 -d > {}", self.open_file_path);
        let argv = vec!["sh".to_string(), "-c".to_string(), script];

        let mut piped = self.driver.spawn_piped(&self.instance, &argv)?;
        if let Some(mut stdin) = piped.child.stdin.take() {
            stdin.write_all(encoded.as_bytes()).await.map_err(|e| EditorError::WriteFailed(e.to_string()))?;
        }
        let status = piped.child.wait().await.map_err(|e| EditorError::WriteFailed(e.to_string()))?;
        if !status.success() {
            return Err(EditorError::WriteFailed(format!("base64 -d exited with {status}")));
        }
        Ok(())
    }

    /// Free-form shell input routed to `PtyController`, streaming output
    /// chunks to the caller until the prompt reappears. `xoblas`-prefixed
    /// commands are routed to the structured path instead and return a
    /// single `xoblas` reply.
    pub async fn handle_command(&mut self, command: &str) -> Result<Vec<TerminalServerMessage>, EditorError> {
        if is_xoblas_command(command) {
            return Ok(vec![self.run_xoblas_command(command).await?]);
        }

        let in_alt = self.pty.in_alternate_screen();
        if in_alt {
            self.pty.write(command.as_bytes()).await?;
        } else {
            self.pty.write(format!("{command}\n").as_bytes()).await?;
        }

        let mut messages = Vec::new();
        let result = self
            .pty
            .read_streaming_until_prompt(|chunk| {
                let filtered = filter_chunk(chunk, command);
                if !filtered.trim().is_empty() {
                    messages.push(TerminalServerMessage::Command {
                        output: filtered,
                        cwd: String::new(),
                        user: String::new(),
                        host: String::new(),
                        raw_mode: false,
                        is_complete: false,
                        is_exiting_raw: false,
                    });
                }
            })
            .await?;

        let prompt = self.pty.last_prompt();
        messages.push(TerminalServerMessage::Command {
            output: String::new(),
            cwd: prompt.cwd.clone(),
            user: prompt.user.clone(),
            host: prompt.host.clone(),
            raw_mode: self.pty.in_alternate_screen(),
            is_complete: true,
            is_exiting_raw: result.exited_alternate_screen,
        });

        if result.exited_alternate_screen {
            messages.push(self.open_file_record().await);
        }

        Ok(messages)
    }

    async fn run_xoblas_command(&mut self, command: &str) -> Result<TerminalServerMessage, EditorError> {
        let muted = format!("NO_COLOR=1 TERM=dumb {command}");
        if self.pty.in_alternate_screen() {
            self.pty.write(muted.as_bytes()).await?;
        } else {
            self.pty.write(format!("{muted}\n").as_bytes()).await?;
        }

        let result = self.pty.read_streaming_until_prompt(|_| {}).await?;
        let filtered = filter_chunk(&result.output, &muted);
        let cleaned = strip_ansi_and_newlines(filtered.trim());

        match serde_json::from_str::<Value>(&cleaned) {
            Ok(file_structure) => Ok(TerminalServerMessage::Xoblas { file_structure }),
            Err(e) => {
                tracing::warn!(command, error = %e, "xoblas command output was not valid JSON");
                Ok(TerminalServerMessage::Error {
                    message: format!("xoblas command output was not valid JSON: {e}"),
                })
            }
        }
    }

    /// Raw bytes for alternate-screen mode, forwarded verbatim; the
    /// reply uses the immediate-read path rather than waiting for a
    /// prompt.
    pub async fn handle_input(&mut self, data: &str) -> Result<Vec<TerminalServerMessage>, EditorError> {
        self.pty.write(data.as_bytes()).await?;
        let result = self.pty.read_immediate().await?;

        let mut messages = vec![TerminalServerMessage::Command {
            output: result.output,
            cwd: String::new(),
            user: String::new(),
            host: String::new(),
            raw_mode: self.pty.in_alternate_screen(),
            is_complete: true,
            is_exiting_raw: result.exited_alternate_screen,
        }];

        if result.exited_alternate_screen {
            messages.push(self.open_file_record().await);
        }

        Ok(messages)
    }

    /// Applies new geometry; in alternate-screen mode the redraw bytes
    /// the application emits in response are captured and echoed back.
    pub async fn resize(&mut self, rows: u16, cols: u16) -> Result<Option<TerminalServerMessage>, EditorError> {
        let captured = self.pty.resize(rows, cols).await?;
        Ok(captured.map(|output| TerminalServerMessage::Command {
            output,
            cwd: String::new(),
            user: String::new(),
            host: String::new(),
            raw_mode: true,
            is_complete: true,
            is_exiting_raw: false,
        }))
    }
}

/// First whitespace-separated token is `xoblas` (case-insensitive),
/// matching `is_xoblas_command`.
pub fn is_xoblas_command(command: &str) -> bool {
    command.split_whitespace().next().is_some_and(|w| w.eq_ignore_ascii_case("xoblas"))
}

fn prompt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| {
        let pattern = format!("{}.+?{}", regex::escape(PROMPT_PREFIX), regex::escape(PROMPT_SUFFIX));
        Regex::new(&pattern).expect("static prompt pattern is valid")
    })
}

fn blank_lines() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n").expect("static blank-line pattern is valid"))
}

/// Strips prompt sentinels and the command's own echo out of a raw PTY
/// chunk (matches `_filter_chunk`).
fn filter_chunk(chunk: &str, command: &str) -> String {
    let without_prompt = prompt_pattern().replace_all(chunk, "");
    let trimmed_command = command.trim();
    let without_echo = if !trimmed_command.is_empty() && without_prompt.contains(trimmed_command) {
        without_prompt.replacen(trimmed_command, "", 1)
    } else {
        without_prompt.into_owned()
    };
    blank_lines().replace_all(&without_echo, "\n").into_owned()
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod tests;
