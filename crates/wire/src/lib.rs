// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire schemas for the three session WebSockets and the `/execute` and
//! `/get_outputs` HTTP endpoints.
//!
//! Every tagged enum here round-trips through `serde_json`; the transport
//! layer (`xoblas-daemon`) is responsible for framing them onto an actual
//! WebSocket or HTTP body.

pub mod execute;
pub mod filesystem;
pub mod terminal;

pub use execute::{ExecuteRequest, ExecuteResponse, GetOutputsRequest, GetOutputsResponse, OutputRow};
pub use filesystem::{
    ClientFileOp, FileInfo, FileOperationBatch, FilesystemClientMessage, FilesystemContent,
    FilesystemEvent, FilesystemServerMessage,
};
pub use terminal::{TerminalClientMessage, TerminalServerMessage};
