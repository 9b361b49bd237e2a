// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn container_name_is_namespaced_and_stable() {
    let user = UserId::new("alice");
    let name = DockerSandboxDriver::container_name(&user);
    assert_eq!(name, "xoblas-sandbox-alice");
    assert_eq!(name, DockerSandboxDriver::container_name(&user));
}
