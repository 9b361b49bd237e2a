// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers, available to other workspace crates via the
//! `test-support` feature.

use crate::ids::{ConnectionId, UserId};

/// A cheap, deterministic-looking user id for tests that don't care about
/// the exact value.
pub fn test_user(tag: &str) -> UserId {
    UserId::new(format!("user-{tag}"))
}

pub fn test_connection(tag: &str) -> ConnectionId {
    ConnectionId::new(format!("conn-{tag}"))
}
