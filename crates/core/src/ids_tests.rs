// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_matches_inner_string() {
    let id = UserId::new("alice");
    assert_eq!(id.to_string(), "alice");
}

#[test]
fn eq_against_str_and_borrow() {
    let id = UserId::from("alice");
    assert_eq!(id, "alice");
    assert_eq!(id, *"alice");

    let map: std::collections::HashMap<UserId, u32> = [(id.clone(), 1)].into();
    assert_eq!(map.get("alice"), Some(&1));
}

#[test]
fn distinct_id_types_do_not_unify() {
    let user = UserId::new("alice");
    let conn = ConnectionId::new("alice");
    assert_eq!(user.as_str(), conn.as_str());
}
