// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn supported_languages_lists_python_only() {
    let registry = LspRegistry::new();
    assert_eq!(registry.supported_languages(), &["python"]);
}

#[tokio::test]
async fn close_on_an_unknown_user_language_pair_is_a_no_op() {
    let registry = LspRegistry::new();
    registry.close(&UserId::new("nobody"), "python").await;
    registry.close_all_for_user(&UserId::new("nobody")).await;
}
