// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn marked_operation_is_consumed_exactly_once() {
    let pending = PendingOperations::new();
    pending.mark(ClientOperation::Create, "/home/termuser/root/a.py");

    assert!(pending.take_if_pending(ClientOperation::Create, "/home/termuser/root/a.py"));
    assert!(!pending.take_if_pending(ClientOperation::Create, "/home/termuser/root/a.py"));
}

#[test]
fn unmarked_operation_is_not_pending() {
    let pending = PendingOperations::new();
    assert!(!pending.take_if_pending(ClientOperation::Delete, "/home/termuser/root/a.py"));
}

#[test]
fn different_operation_on_same_path_is_not_suppressed() {
    let pending = PendingOperations::new();
    pending.mark(ClientOperation::Create, "/home/termuser/root/a.py");
    assert!(!pending.take_if_pending(ClientOperation::Change, "/home/termuser/root/a.py"));
}

#[test]
fn mark_rename_marks_all_three_entries() {
    let pending = PendingOperations::new();
    pending.mark_rename("/home/termuser/root/old.py", "/home/termuser/root/new.py");
    assert_eq!(pending.len(), 3);

    assert!(pending.take_if_pending(ClientOperation::Rename, "/home/termuser/root/new.py"));
    assert!(pending.take_if_pending(ClientOperation::Delete, "/home/termuser/root/old.py"));
    assert!(pending.take_if_pending(ClientOperation::Create, "/home/termuser/root/new.py"));
}

#[test]
fn sweep_expired_drops_stale_entries_without_waiting_on_query() {
    let pending = PendingOperations::new();
    pending.entries.lock().insert(
        (ClientOperation::Create, "/home/termuser/root/stale.py".to_string()),
        std::time::Instant::now() - xoblas_core::constants::PENDING_OP_TTL - std::time::Duration::from_millis(1),
    );
    assert_eq!(pending.len(), 1);
    pending.sweep_expired();
    assert_eq!(pending.len(), 0);
}
