// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use std::sync::Arc;

use xoblas_core::constants::GRACE_PERIOD;
use xoblas_sandbox::test_support::MockSandboxDriver;

fn registry_with_mock() -> (Arc<SessionRegistry>, Arc<MockSandboxDriver>) {
    let mock = Arc::new(MockSandboxDriver::new());
    let registry = Arc::new(SessionRegistry::new(mock.clone() as Arc<dyn SandboxDriver>));
    (registry, mock)
}

#[tokio::test]
async fn cold_acquire_builds_image_then_starts_instance_and_registers_connection() {
    let (registry, mock) = registry_with_mock();
    let user = UserId::new("alice");

    let session = registry.acquire(&user, ConnectionId::new("c1")).await.unwrap();

    assert_eq!(mock.build_image_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(mock.start_calls(), 1);
    assert_eq!(session.connection_count(), 1);
    assert!(session.instance_id().is_some());
}

#[tokio::test]
async fn concurrent_acquires_for_the_same_user_start_exactly_one_instance() {
    let (registry, mock) = registry_with_mock();
    let user = UserId::new("alice");

    let mut handles = Vec::new();
    for i in 0..20 {
        let registry = registry.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            registry.acquire(&user, ConnectionId::new(format!("c{i}"))).await.unwrap()
        }));
    }

    let mut instance_ids = Vec::new();
    for handle in handles {
        let session = handle.await.unwrap();
        instance_ids.push(session.instance_id().unwrap());
    }

    assert_eq!(mock.start_calls(), 1, "exactly one start_instance call under contention");
    assert!(instance_ids.windows(2).all(|pair| pair[0] == pair[1]), "every caller observes the same instance");
}

#[tokio::test]
async fn acquires_for_different_users_proceed_independently() {
    let (registry, mock) = registry_with_mock();

    let alice = registry.acquire(&UserId::new("alice"), ConnectionId::new("c1")).await.unwrap();
    let bob = registry.acquire(&UserId::new("bob"), ConnectionId::new("c2")).await.unwrap();

    assert_eq!(mock.start_calls(), 2);
    assert_ne!(alice.instance_id(), bob.instance_id());
}

#[tokio::test(start_paused = true)]
async fn reacquiring_within_the_grace_period_does_not_stop_the_instance() {
    let (registry, mock) = registry_with_mock();
    let user = UserId::new("alice");

    registry.acquire(&user, ConnectionId::new("c1")).await.unwrap();
    registry.release(&user, &ConnectionId::new("c1"));

    tokio::time::advance(GRACE_PERIOD / 2).await;
    registry.acquire(&user, ConnectionId::new("c2")).await.unwrap();

    tokio::time::advance(GRACE_PERIOD).await;
    tokio::task::yield_now().await;

    assert_eq!(mock.stop_calls(), 0, "reconnect within the grace period absorbs the reload");
    assert_eq!(registry.session_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_reacquire_within_the_grace_period_stops_the_instance_exactly_once() {
    let (registry, mock) = registry_with_mock();
    let user = UserId::new("alice");

    registry.acquire(&user, ConnectionId::new("c1")).await.unwrap();
    registry.release(&user, &ConnectionId::new("c1"));

    tokio::time::advance(GRACE_PERIOD + std::time::Duration::from_millis(50)).await;
    tokio::task::yield_now().await;
    // Grace-period task runs on a spawned tokio task; give the runtime a
    // chance to schedule it after the clock has already moved past the
    // deadline.
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert_eq!(mock.stop_calls(), 1);
    assert_eq!(registry.session_count(), 0);
}

#[tokio::test]
async fn a_stopping_session_fails_fast_on_acquire() {
    let (registry, _mock) = registry_with_mock();
    let user = UserId::new("alice");

    registry.acquire(&user, ConnectionId::new("c1")).await.unwrap();
    registry.mark_stopping(&user);

    let err = registry.acquire(&user, ConnectionId::new("c2")).await.unwrap_err();
    assert!(matches!(err, SessionError::Stopping(_)));
}

#[tokio::test]
async fn build_image_failure_surfaces_as_unavailable_and_leaves_no_instance() {
    let (registry, mock) = registry_with_mock();
    let user = UserId::new("alice");
    mock.set_fail_start(true);

    let err = registry.acquire(&user, ConnectionId::new("c1")).await.unwrap_err();
    assert!(matches!(err, SessionError::Unavailable { .. }));
}
