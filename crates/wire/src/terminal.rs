// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/terminal/{user_id}` message schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound message from the terminal WebSocket client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TerminalClientMessage {
    /// Free-form shell input. If the first whitespace-separated token is
    /// `xoblas`, `WorkspaceEditor` routes it through the structured
    /// command path instead of streaming raw output.
    #[serde(rename = "command")]
    Command { command: String },

    /// Raw bytes for alternate-screen mode, forwarded verbatim to the PTY.
    #[serde(rename = "input")]
    Input { data: String },

    /// Overwrite the conventional open file with UTF-8 text.
    #[serde(rename = "write_file")]
    WriteFile { content: String },

    /// Apply new terminal geometry.
    #[serde(rename = "resize")]
    Resize { cols: u16, rows: u16 },
}

/// Outbound message to the terminal WebSocket client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TerminalServerMessage {
    #[serde(rename = "command")]
    Command {
        output: String,
        cwd: String,
        user: String,
        host: String,
        raw_mode: bool,
        is_complete: bool,
        is_exiting_raw: bool,
    },

    #[serde(rename = "file")]
    File { content: String, file_path: String },

    /// Reply to an in-band `xoblas` command: ANSI- and newline-stripped
    /// output, parsed as JSON.
    #[serde(rename = "xoblas")]
    Xoblas { file_structure: Value },

    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
