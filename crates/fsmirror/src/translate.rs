// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates a raw `FilesystemEvent` read off the watcher's event log into
//! the `TranslatedFileChange` the browser client actually renders.
//!
//! Grounded on `filesystem_watcher.py`'s `_convert_to_webapp_format`: a
//! `Moved` event reports the *destination* side under the client-facing
//! `path`/`file_info`/`content` fields and the source side under
//! `old_path`; every other event type reports its own `src_path` as-is.
//! Content is only ever attached for create/change/moved (`_handle_delete`
//! intentionally carries none).

use xoblas_wire::filesystem::{ClientOperation, FilesystemContent, FilesystemEvent, TranslatedFileChange, WatcherEventType};

pub fn translate_event(event: &FilesystemEvent) -> TranslatedFileChange {
    match event.event_type {
        WatcherEventType::Moved => {
            let (content, content_type) = split_content(event.dest_content.as_ref());
            TranslatedFileChange {
                operation: ClientOperation::from(event.event_type),
                path: event.dest_path.clone().unwrap_or_else(|| event.src_path.clone()),
                is_directory: event.dest_is_directory.unwrap_or(event.is_directory),
                content,
                content_type,
                file_info: event.dest_file_info.clone(),
                old_path: Some(event.src_path.clone()),
            }
        }
        WatcherEventType::Deleted => TranslatedFileChange {
            operation: ClientOperation::from(event.event_type),
            path: event.src_path.clone(),
            is_directory: event.is_directory,
            content: None,
            content_type: None,
            file_info: None,
            old_path: None,
        },
        WatcherEventType::Created | WatcherEventType::Modified => {
            let (content, content_type) = split_content(event.content.as_ref());
            TranslatedFileChange {
                operation: ClientOperation::from(event.event_type),
                path: event.src_path.clone(),
                is_directory: event.is_directory,
                content,
                content_type,
                file_info: event.file_info.clone(),
                old_path: None,
            }
        }
    }
}

fn split_content(content: Option<&FilesystemContent>) -> (Option<String>, Option<String>) {
    match content {
        None => (None, None),
        Some(FilesystemContent::Text { content }) => (Some(content.clone()), Some("text".to_string())),
        Some(FilesystemContent::Binary { content }) => (Some(content.clone()), Some("binary".to_string())),
        Some(FilesystemContent::FileTooLarge) => (None, Some("file_too_large".to_string())),
        Some(FilesystemContent::NotFile) => (None, Some("not_file".to_string())),
        Some(FilesystemContent::ReadError { message }) => (Some(message.clone()), Some("read_error".to_string())),
    }
}

/// `(event_type, path)` key the self-echo filter checks a translated
/// change's implied `ClientOperation` against. For `Moved` this is the
/// *new* path, matching `PendingOperations::mark_rename`.
pub fn echo_key(event: &FilesystemEvent) -> (ClientOperation, String) {
    let operation = ClientOperation::from(event.event_type);
    let path = match event.event_type {
        WatcherEventType::Moved => event.dest_path.clone().unwrap_or_else(|| event.src_path.clone()),
        _ => event.src_path.clone(),
    };
    (operation, path)
}

#[cfg(test)]
#[path = "translate_tests.rs"]
mod tests;
