// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-id sanitization: lowercase, replace any byte outside
//! `[a-z0-9_.-]` with `-`. The result is used verbatim as the sandbox
//! volume name, so it must never be empty and must never contain a path
//! separator.

use crate::ids::UserId;

/// Sanitize a raw, client-supplied user id into the form safe to use as a
/// sandbox volume name and registry key.
pub fn sanitize_user_id(raw: &str) -> UserId {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() || matches!(lower, '_' | '.' | '-') {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    if out.is_empty() {
        out.push('-');
    }
    UserId::new(out)
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
