// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/filesystem/{user_id}` message schema.

use serde::{Deserialize, Serialize};

/// One line of the in-sandbox watcher's append-only event log, and the
/// shape the host reads off that log before translating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilesystemEvent {
    pub event_type: WatcherEventType,
    pub src_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<String>,
    pub is_directory: bool,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FilesystemContent>,
    /// Present only for `Moved` events: the destination side's metadata,
    /// mirroring `src_path`'s `is_directory`/`file_info`/`content` but for
    /// `dest_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_is_directory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_file_info: Option<FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_content: Option<FilesystemContent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WatcherEventType {
    Created,
    Deleted,
    Modified,
    Moved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub size: u64,
    pub mtime: f64,
    pub permissions: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "content_type", rename_all = "snake_case")]
pub enum FilesystemContent {
    Text { content: String },
    Binary { content: String },
    FileTooLarge,
    NotFile,
    ReadError { message: String },
}

/// Operation name as seen by the browser client — distinct from
/// `WatcherEventType`, which is the in-sandbox watcher's vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClientOperation {
    Create,
    Delete,
    Change,
    Rename,
}

impl From<WatcherEventType> for ClientOperation {
    fn from(value: WatcherEventType) -> Self {
        match value {
            WatcherEventType::Created => ClientOperation::Create,
            WatcherEventType::Deleted => ClientOperation::Delete,
            WatcherEventType::Modified => ClientOperation::Change,
            WatcherEventType::Moved => ClientOperation::Rename,
        }
    }
}

/// One entry in a client-originated batch `file_operation` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFileOp {
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOperationBatch {
    pub operation: ClientOperation,
    pub files: Vec<ClientFileOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FilesystemClientMessage {
    #[serde(rename = "file_operation")]
    FileOperation { data: FileOperationBatch },
    #[serde(rename = "start_watching")]
    StartWatching,
    #[serde(rename = "stop_watching")]
    StopWatching,
}

/// The translated event the client actually renders, distinct from the
/// raw `FilesystemEvent` read off the in-sandbox log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslatedFileChange {
    pub operation: ClientOperation,
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FilesystemServerMessage {
    #[serde(rename = "filesystem_connected")]
    FilesystemConnected,

    #[serde(rename = "filesystem_initial_sync")]
    FilesystemInitialSync {
        files: Vec<TranslatedFileChange>,
        watch_path: String,
        timestamp: f64,
        source: String,
    },

    #[serde(rename = "filesystem_change_from_container")]
    FilesystemChangeFromContainer {
        operation: ClientOperation,
        files: Vec<TranslatedFileChange>,
        timestamp: f64,
        source: String,
    },

    #[serde(rename = "file_operation_result")]
    FileOperationResult {
        operation: ClientOperation,
        success: bool,
        files: Vec<ClientFileOp>,
        timestamp: f64,
    },

    #[serde(rename = "watching_status")]
    WatchingStatus { watching: bool, message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
