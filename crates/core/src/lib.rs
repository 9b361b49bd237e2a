// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xoblas-core: shared identifiers and timing constants for the per-user
//! session orchestrator.

pub mod constants;
pub mod ids;
pub mod sanitize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use ids::{ConnectionId, InstanceId, UserId};
pub use sanitize::sanitize_user_id;
