// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use async_trait::async_trait;
use nix::pty::openpty;
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::fd::{AsRawFd, OwnedFd};

use xoblas_core::{InstanceId, UserId};
use xoblas_sandbox::{ExecOutput, PtyHandle, SandboxDriver, SandboxError};

/// A `SandboxDriver` double that hands out one end of a real PTY loopback
/// pair instead of forking a shell, so tests can write to the slave side
/// and assert what `PtyController` reads off the master, and vice versa.
/// The slave fd is handed to the test itself (via `take_slave`) rather
/// than to a child process.
struct LoopbackDriver {
    slave: Mutex<Option<OwnedFd>>,
}

impl LoopbackDriver {
    fn new() -> (Self, OwnedFd) {
        let pty = openpty(None, None).expect("openpty for test loopback");
        // The test keeps its own dup of the slave to write/read against,
        // since `attach_pty` below hands the original to the controller's
        // "child" side conceptually (there is no real child here).
        let test_side = nix::unistd::dup(&pty.slave).expect("dup slave for test side");
        (
            Self { slave: Mutex::new(Some(pty.slave)) },
            unsafe { OwnedFd::from_raw_fd(test_side) },
        )
    }
}

use std::os::fd::FromRawFd;

#[async_trait]
impl SandboxDriver for LoopbackDriver {
    async fn build_image(&self) -> Result<String, SandboxError> {
        Ok("loopback".into())
    }

    async fn start_instance(&self, user_id: &UserId) -> Result<InstanceId, SandboxError> {
        Ok(InstanceId::new(format!("loopback-{user_id}")))
    }

    async fn exec(&self, _instance_id: &InstanceId, _argv: &[String]) -> Result<ExecOutput, SandboxError> {
        unimplemented!("not exercised by PtyController tests")
    }

    fn attach_pty(&self, _instance_id: &InstanceId, _argv: &[String]) -> Result<PtyHandle, SandboxError> {
        let master = self
            .slave
            .lock()
            .take()
            .expect("attach_pty called more than once on this double");
        // We hand out the slave fd as if it were the pty *master*: this
        // driver double exists purely to give `PtyController::attach` a
        // real fd to put into non-blocking mode and own, while the test
        // itself drives the actual master side directly via `take_slave`.
        Ok(PtyHandle { child_pid: Pid::this(), master_fd: master })
    }

    async fn is_alive(&self, _instance_id: &InstanceId) -> bool {
        true
    }

    async fn stop_instance(&self, _instance_id: &InstanceId) -> Result<(), SandboxError> {
        Ok(())
    }
}

/// Builds a `PtyController` via the real `attach()` path, backed by a
/// loopback pty pair: the controller owns the slave fd (as its "master"),
/// and the test owns the true master fd to write/read against directly.
fn attached_over_loopback() -> (PtyController, OwnedFd) {
    let (driver, master_side) = LoopbackDriver::new();
    let instance = InstanceId::new("loopback-instance");
    let controller =
        PtyController::attach(&driver, &instance, &["sh".to_string()], 24, 80).expect("attach over loopback");
    (controller, master_side)
}

#[tokio::test]
async fn write_from_controller_is_readable_on_the_true_master_end() {
    let (mut controller, master_side) = attached_over_loopback();
    controller.write(b"echo hi\n").await.expect("write should succeed");

    let mut buf = [0u8; 64];
    let n = nix::unistd::read(master_side.as_raw_fd(), &mut buf).expect("master-side read");
    assert_eq!(&buf[..n], b"echo hi\n");
}

#[tokio::test]
async fn read_immediate_sees_bytes_written_from_the_true_master_end() {
    let (mut controller, master_side) = attached_over_loopback();
    nix::unistd::write(&master_side, b"hello from shell").expect("master-side write");

    let result = controller.read_immediate().await.expect("read_immediate should succeed");
    assert!(result.output.contains("hello from shell"));
    assert!(!result.hit_prompt);
    assert!(!result.exited_alternate_screen);
}

#[tokio::test]
async fn read_until_prompt_stops_as_soon_as_suffix_appears() {
    let (mut controller, master_side) = attached_over_loopback();
    nix::unistd::write(&master_side, b"some output __START__bob@host:/home__END__$ ").expect("master-side write");

    let result = controller.read_until_prompt().await.expect("read_until_prompt should succeed");
    assert!(result.hit_prompt);
    assert_eq!(controller.last_prompt().user, "bob");
    assert_eq!(controller.last_prompt().host, "host");
    assert_eq!(controller.last_prompt().cwd, "/home");
}

#[tokio::test]
async fn read_until_prompt_times_out_returning_buffered_output_without_error() {
    let (mut controller, master_side) = attached_over_loopback();
    nix::unistd::write(&master_side, b"still running, no prompt yet").expect("master-side write");

    let result = controller.read_until_prompt().await.expect("timeout is not an error");
    assert!(!result.hit_prompt);
    assert!(result.output.contains("still running"));
}

#[tokio::test]
async fn alternate_screen_exit_is_flagged_exactly_once() {
    let (mut controller, master_side) = attached_over_loopback();
    nix::unistd::write(&master_side, b"\x1b[?1049h").expect("master-side write");
    let entered = controller.read_immediate().await.unwrap();
    assert!(!entered.exited_alternate_screen);
    assert!(controller.in_alternate_screen());

    nix::unistd::write(&master_side, b"\x1b[?1049l").expect("master-side write");
    let exited = controller.read_immediate().await.unwrap();
    assert!(exited.exited_alternate_screen);
    assert!(!controller.in_alternate_screen());
}

#[tokio::test]
async fn read_streaming_until_prompt_invokes_callback_per_chunk_and_still_returns_full_output() {
    let (mut controller, master_side) = attached_over_loopback();
    nix::unistd::write(&master_side, b"partial output ").expect("master-side write");

    let mut chunks = Vec::new();
    let handle = {
        let result = tokio::time::timeout(Duration::from_millis(200), async {
            controller.read_streaming_until_prompt(|chunk| chunks.push(chunk.to_string())).await
        });
        tokio::spawn(async move {
            nix::unistd::write(&master_side, b"more __START__a@b:/c__END__$ ").expect("second write");
        });
        result.await
    };
    let result = handle.expect("should not time out").expect("read should succeed");

    assert!(result.hit_prompt);
    assert!(!chunks.is_empty());
    assert!(chunks.iter().any(|c| c.contains("partial output")));
}

#[tokio::test]
async fn dimensions_reflect_constructor_values() {
    let (controller, _master_side) = attached_over_loopback();
    assert_eq!(controller.dimensions(), (80, 24));
}

#[tokio::test]
async fn is_process_alive_is_true_for_the_current_process() {
    let (controller, _master_side) = attached_over_loopback();
    assert!(controller.is_process_alive());
}
