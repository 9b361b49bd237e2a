// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `xoblas-editor`: the terminal WebSocket's façade over `PtyController`
//! and a single conventional open file. Grounded on `xoblas_editor.py`'s
//! `XoblasEditor`.

pub mod editor;

pub use editor::{EditorError, WorkspaceEditor, SHELL_ARGV};
