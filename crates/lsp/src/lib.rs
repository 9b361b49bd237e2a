// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `xoblas-lsp`: per-`(user_id, language)` managed LSP child process,
//! Content-Length framed, bidirectionally pumped between client and
//! server.

pub mod framing;
pub mod proxy;
pub mod registry;

pub use framing::{read_message, write_message, FramingError};
pub use proxy::{lsp_command_for, LspError, LspProxy, ROOT_URI};
pub use registry::LspRegistry;
