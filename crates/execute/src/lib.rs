// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `xoblas-execute`: runs a one-off interpreter job under resource caps and
//! hands back its captured output. Grounded on `run_safe_subprocess.py`'s
//! `run_client_code` and `safe_env.py`'s `cap_resources` — the "safe"
//! sandboxed design the original `/execute` endpoint defines but never
//! actually wires up (it `exec()`s in-process with no caps), not a
//! translation of that live endpoint.
//!
//! HTTP status-code mapping (200/201/400/401) and persistence storage are
//! both deliberately out of scope here; see `xoblas_wire::execute` and
//! [`persistence::PersistedExecutionStore`].

pub mod job;
pub mod persistence;

pub use job::{ExecuteError, ExecuteJob, ExecuteOutcome};
pub use persistence::{PersistError, PersistedExecutionStore};
