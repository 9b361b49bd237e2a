// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `LspProxy`: one LSP server child process exec'd inside a sandbox
//! instance, speaking Content-Length-framed JSON-RPC over its piped
//! stdin/stdout. Grounded on `base_controller.py`'s
//! `start`/`_initialize`/`_did_open`/`close`.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex as AsyncMutex;

use xoblas_core::InstanceId;
use xoblas_sandbox::{SandboxDriver, SandboxError};

use crate::framing::{read_message, write_message, FramingError};

/// Sandbox-relative root the Python LSP server resolves imports against,
/// matching `WorkspaceEditor`'s `DEFAULT_OPEN_FILE` directory.
pub const ROOT_URI: &str = "file:///home/termuser/root";

#[derive(Debug, Error)]
pub enum LspError {
    #[error("sandbox exec failed: {0}")]
    Sandbox(#[from] SandboxError),
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("lsp server closed its stdout before responding")]
    ClosedEarly,
    #[error("lsp server stdin is unavailable")]
    StdinUnavailable,
    #[error("lsp json-rpc serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported lsp language: {0}")]
    UnsupportedLanguage(String),
}

/// Command to exec inside the sandbox for a given language. `python` is
/// the only entry wired up today; more languages extend this list
/// alongside their own argv.
pub fn lsp_command_for(language: &str) -> Option<Vec<String>> {
    match language {
        "python" => Some(vec!["pylsp".to_string()]),
        _ => None,
    }
}

fn initialization_options(language: &str) -> Value {
    match language {
        "python" => json!({
            "plugins": {
                "pylsp_mypy": {"enabled": true},
                "pycodestyle": {"enabled": true},
                "pyflakes": {"enabled": true},
                "pylint": {"enabled": true},
                "rope_completion": {"enabled": true},
                "jedi_completion": {"enabled": true, "include_params": false, "fuzzy": true},
            }
        }),
        _ => json!({}),
    }
}

pub struct LspProxy {
    language: String,
    stdin: AsyncMutex<ChildStdin>,
    stdout: AsyncMutex<BufReader<ChildStdout>>,
    next_id: Mutex<u64>,
    document_versions: Mutex<HashMap<String, u64>>,
}

impl LspProxy {
    /// Execs the language's LSP server inside `instance` and completes the
    /// `initialize`/`initialized` handshake.
    pub async fn start(driver: &dyn SandboxDriver, instance: &InstanceId, language: &str) -> Result<Self, LspError> {
        let argv = lsp_command_for(language).ok_or_else(|| LspError::UnsupportedLanguage(language.to_string()))?;
        let mut piped = driver.spawn_piped(instance, &argv)?;
        let stdin = piped.child.stdin.take().ok_or(LspError::StdinUnavailable)?;
        let stdout = piped
            .child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or(LspError::ClosedEarly)?;
        // Stderr/child lifecycle are intentionally not awaited here: `close`
        // tears the process down explicitly; letting `piped` drop here would
        // also drop the `Child` handle, but stdin/stdout have already been
        // taken out of it, so the handle is deliberately leaked via
        // `std::mem::forget` the same way `DockerSandboxDriver::attach_pty`
        // leaks its `Child` once ownership of its fds has moved elsewhere.
        std::mem::forget(piped.child);

        let proxy = Self {
            language: language.to_string(),
            stdin: AsyncMutex::new(stdin),
            stdout: AsyncMutex::new(stdout),
            next_id: Mutex::new(0),
            document_versions: Mutex::new(HashMap::new()),
        };
        proxy.initialize().await?;
        Ok(proxy)
    }

    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock();
        *id += 1;
        *id
    }

    async fn send(&self, message: &Value) -> Result<(), LspError> {
        let payload = serde_json::to_vec(message)?;
        let mut stdin = self.stdin.lock().await;
        write_message(&mut *stdin, &payload).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Value, LspError> {
        let mut stdout = self.stdout.lock().await;
        let body = read_message(&mut *stdout).await?.ok_or(LspError::ClosedEarly)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn initialize(&self) -> Result<(), LspError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "initialize",
            "params": {
                "processId": Value::Null,
                "rootUri": ROOT_URI,
                "capabilities": {
                    "textDocument": {
                        "completion": {
                            "completionItem": {
                                "snippetSupport": true,
                                "documentationFormat": ["markdown", "plaintext"],
                                "resolveSupport": {
                                    "properties": ["detail", "documentation", "additionalTextEdits"]
                                },
                                "insertTextModeSupport": {"valueSet": [1, 2]},
                                "labelDetailsSupport": true,
                            },
                            "completionItemKind": {"valueSet": (1..=25).collect::<Vec<_>>()},
                        }
                    }
                },
                "initializationOptions": initialization_options(&self.language),
            },
        });
        self.send(&request).await?;
        self.recv().await?;

        let initialized = json!({"jsonrpc": "2.0", "method": "initialized", "params": {}});
        self.send(&initialized).await
    }

    /// Forwards one raw JSON-RPC message the client sent verbatim onto
    /// the LSP server's stdin, re-framing it with Content-Length.
    pub async fn forward_client_message(&self, raw_json: &[u8]) -> Result<(), LspError> {
        let mut stdin = self.stdin.lock().await;
        write_message(&mut *stdin, raw_json).await?;
        Ok(())
    }

    /// Blocks until the LSP server writes its next framed message, for
    /// the daemon to forward verbatim to the client as a WS text frame.
    pub async fn next_server_message(&self) -> Result<Vec<u8>, LspError> {
        let mut stdout = self.stdout.lock().await;
        read_message(&mut *stdout).await?.ok_or(LspError::ClosedEarly)
    }

    /// Whether `path` already has an open-document entry, i.e. whether a
    /// write to it should go out as `textDocument/didChange` rather than
    /// `textDocument/didOpen`.
    pub fn is_open(&self, path: &str) -> bool {
        self.document_versions.lock().contains_key(path)
    }

    pub async fn did_open(&self, path: &str, text: &str) -> Result<(), LspError> {
        self.document_versions.lock().insert(path.to_string(), 1);
        let request = json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": format!("file://{path}"),
                    "languageId": self.language,
                    "version": 1,
                    "text": text,
                }
            },
        });
        self.send(&request).await
    }

    pub async fn did_change(&self, path: &str, text: &str) -> Result<(), LspError> {
        let version = {
            let mut versions = self.document_versions.lock();
            let entry = versions.entry(path.to_string()).or_insert(1);
            *entry += 1;
            *entry
        };
        let request = json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didChange",
            "params": {
                "textDocument": {"uri": format!("file://{path}"), "version": version},
                "contentChanges": [{"text": text}],
            },
        });
        self.send(&request).await
    }

    pub async fn shutdown(&self) -> Result<(), LspError> {
        let shutdown = json!({"jsonrpc": "2.0", "id": self.next_id(), "method": "shutdown", "params": Value::Null});
        self.send(&shutdown).await?;
        let _ = self.recv().await;

        let exit = json!({"jsonrpc": "2.0", "method": "exit", "params": Value::Null});
        self.send(&exit).await
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
