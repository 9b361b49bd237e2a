// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lowercases() {
    assert_eq!(sanitize_user_id("Alice").as_str(), "alice");
}

#[test]
fn replaces_disallowed_bytes() {
    assert_eq!(sanitize_user_id("alice/../bob").as_str(), "alice-----bob");
}

#[test]
fn preserves_allowed_punctuation() {
    assert_eq!(sanitize_user_id("alice.bob_2-x").as_str(), "alice.bob_2-x");
}

#[test]
fn empty_input_becomes_dash() {
    assert_eq!(sanitize_user_id("").as_str(), "-");
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn always_matches_allowed_charset(raw in ".{0,64}") {
            let sanitized = sanitize_user_id(&raw);
            prop_assert!(!sanitized.as_str().is_empty());
            prop_assert!(sanitized
                .as_str()
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-')));
        }
    }
}
