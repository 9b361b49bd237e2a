// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `xoblas-daemon`: the HTTP/WebSocket transport binding the per-user
//! session orchestrator's subsystems onto its five endpoints
//! (`/ws/terminal`, `/ws/filesystem`, `/ws/lsp`, `/execute`,
//! `/get_outputs`, plus `/ping`).

pub mod config;
pub mod editor_registry;
pub mod error;
pub mod fs_registry;
pub mod persistence;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
