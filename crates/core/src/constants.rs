// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timing and sizing constants shared between `xoblas-pty`,
//! `xoblas-fsmirror`, `xoblas-daemon`, and `xoblas-execute` so the numbers
//! live in exactly one place.

use std::time::Duration;

/// How long `PtyController::read_until_prompt` waits before returning
/// whatever has been buffered so far.
pub const PROMPT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Window used by `PtyController::read_immediate` in alternate-screen mode.
pub const IMMEDIATE_READ: Duration = Duration::from_millis(30);

/// Interval at which the filesystem mirror polls the event log for new
/// bytes.
pub const FS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Backoff applied after a poll read error before retrying.
pub const FS_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Lifetime of a `PendingOperation` self-echo suppression entry.
pub const PENDING_OP_TTL: Duration = Duration::from_secs(2);

/// In-sandbox watcher debounce window for identical `(event_type, path)`
/// events.
pub const WATCHER_DEBOUNCE: Duration = Duration::from_millis(100);

/// How long a session with zero live connections is kept warm before
/// `SandboxDriver::stop_instance` is invoked.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Largest file whose content is inlined into a `FilesystemEvent`; beyond
/// this only metadata is reported (`content_type = "file_too_large"`).
pub const MAX_FILE_INLINE: u64 = 10 * 1024 * 1024;

/// Cap on the number of entries synthesized during the initial tree sync.
pub const INITIAL_SYNC_CAP: usize = 500;

/// CPU time limit applied to `ExecuteJob` subprocesses, as a range; callers
/// pick a concrete value within it.
pub const EXECUTE_CPU_LIMIT_MIN: Duration = Duration::from_secs(1);
pub const EXECUTE_CPU_LIMIT_MAX: Duration = Duration::from_secs(2);

/// Address-space (RLIMIT_AS) limit applied to `ExecuteJob` subprocesses.
pub const EXECUTE_MEM_LIMIT: u64 = 120 * 1024 * 1024;

/// Prompt sentinel markers. `PROMPT_SUFFIX` includes the trailing `$ `
/// that appears in the live PTY stream; prompt-parsing uses
/// `PROMPT_SUFFIX_HEAD`, which omits the final `$`, as the regex anchor.
pub const PROMPT_PREFIX: &str = "__START__";
pub const PROMPT_SUFFIX: &str = "__END__$ ";
pub const PROMPT_SUFFIX_HEAD: &str = "__END__";

/// Default single-file open-file path used by `WorkspaceEditor` (v1 model).
pub const DEFAULT_OPEN_FILE: &str = "root/main.py";
