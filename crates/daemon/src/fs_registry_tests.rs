use std::sync::Arc;

use xoblas_core::{InstanceId, UserId};
use xoblas_sandbox::test_support::MockSandboxDriver;
use xoblas_sandbox::ExecOutput;

use super::*;

fn ok(stdout: &str) -> ExecOutput {
    ExecOutput { stdout: stdout.as_bytes().to_vec(), stderr: Vec::new(), exit_code: 0 }
}

fn queue_start_watching_responses(driver: &MockSandboxDriver) {
    driver.push_exec_output(ok("")); // mkdir -p watch_path
    driver.push_exec_output(ok("")); // chmod +x
    driver.push_exec_output(ok("")); // nohup launch
    driver.push_exec_output(ok("")); // find (empty tree)
}

#[tokio::test]
async fn get_or_start_reuses_handle_for_same_instance() {
    let driver = Arc::new(MockSandboxDriver::new());
    queue_start_watching_responses(&driver);
    let registry = FsMirrorRegistry::new();
    let user = UserId::new("alice");
    let instance = InstanceId::new("mock-alice");

    let first = registry.get_or_start(driver.clone(), &user, &instance, "/home/termuser/root").await.unwrap();
    let second = registry.get_or_start(driver.clone(), &user, &instance, "/home/termuser/root").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn get_or_start_replaces_handle_on_instance_change() {
    let driver = Arc::new(MockSandboxDriver::new());
    queue_start_watching_responses(&driver);
    queue_start_watching_responses(&driver);
    let registry = FsMirrorRegistry::new();
    let user = UserId::new("bob");
    let first_instance = InstanceId::new("mock-bob-1");
    let second_instance = InstanceId::new("mock-bob-2");

    let first = registry.get_or_start(driver.clone(), &user, &first_instance, "/home/termuser/root").await.unwrap();
    let second = registry.get_or_start(driver.clone(), &user, &second_instance, "/home/termuser/root").await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn stop_removes_the_tracked_handle_so_a_later_start_succeeds() {
    let driver = Arc::new(MockSandboxDriver::new());
    queue_start_watching_responses(&driver);
    queue_start_watching_responses(&driver);
    let registry = FsMirrorRegistry::new();
    let user = UserId::new("carol");
    let instance = InstanceId::new("mock-carol");

    registry.get_or_start(driver.clone(), &user, &instance, "/home/termuser/root").await.unwrap();
    registry.stop(driver.as_ref(), &user).await;

    let restarted = registry.get_or_start(driver.clone(), &user, &instance, "/home/termuser/root").await;
    assert!(restarted.is_ok());
}
