// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use xoblas_sandbox::test_support::MockSandboxDriver;

/// Stands in for a language server: echoes every framed message straight
/// back, so tests can drive `LspProxy`'s wire-level methods (`did_open`,
/// `did_change`) against a real stdin/stdout pipe without a real server
/// installed. `LspProxy::start` is not exercised directly since it hard-codes
/// `lsp_command_for`'s argv (`pylsp`), which isn't present in a test sandbox.
fn spawn_echo_proxy(driver: &MockSandboxDriver, instance: &InstanceId) -> LspProxy {
    let mut piped = driver.spawn_piped(instance, &["cat".to_string()]).expect("spawn echo process");
    let stdin = piped.child.stdin.take().expect("stdin");
    let stdout = piped.child.stdout.take().map(BufReader::new).expect("stdout");
    std::mem::forget(piped.child);

    LspProxy {
        language: "python".to_string(),
        stdin: AsyncMutex::new(stdin),
        stdout: AsyncMutex::new(stdout),
        next_id: Mutex::new(0),
        document_versions: Mutex::new(HashMap::new()),
    }
}

#[tokio::test]
async fn a_sent_message_frames_back_losslessly_through_the_pipe() {
    let driver = MockSandboxDriver::new();
    let instance = InstanceId::new("echo-instance");
    let proxy = spawn_echo_proxy(&driver, &instance);

    let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
    proxy.send(&message).await.unwrap();

    let echoed = proxy.recv().await.unwrap();
    assert_eq!(echoed, message);
}

#[tokio::test]
async fn did_open_then_did_change_versions_increase_monotonically_from_two() {
    let driver = MockSandboxDriver::new();
    let instance = InstanceId::new("doc-instance");
    let proxy = spawn_echo_proxy(&driver, &instance);

    proxy.did_open("/home/termuser/root/main.py", "print(1)\n").await.unwrap();
    let opened = proxy.recv().await.unwrap();
    assert_eq!(opened["params"]["textDocument"]["version"], 1);

    proxy.did_change("/home/termuser/root/main.py", "print(2)\n").await.unwrap();
    let changed = proxy.recv().await.unwrap();
    assert_eq!(changed["params"]["textDocument"]["version"], 2);

    proxy.did_change("/home/termuser/root/main.py", "print(3)\n").await.unwrap();
    let changed_again = proxy.recv().await.unwrap();
    assert_eq!(changed_again["params"]["textDocument"]["version"], 3);
}

#[test]
fn lsp_command_for_python_is_pylsp() {
    assert_eq!(lsp_command_for("python"), Some(vec!["pylsp".to_string()]));
}

#[test]
fn lsp_command_for_unknown_language_is_none() {
    assert_eq!(lsp_command_for("cobol"), None);
}
