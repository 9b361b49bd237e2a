// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process environment configuration, modeled on `oj-daemon`'s
//! `lifecycle::Config::load()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid XOBLAS_BIND_ADDR: {0}")]
    InvalidBindAddr(String),
}

/// Daemon-wide configuration read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `POSTGRES_CONNECTION_STRING`: backs the `PersistedExecutionStore`
    /// implementation. `None` when unset — the daemon still serves
    /// `/execute` but every `should_save` request fails with a
    /// persistence error.
    pub postgres_connection_string: Option<String>,
    /// `ENV`: toggles allowed CORS origins. Anything other than
    /// `"production"` is treated as a development environment and allows
    /// any origin.
    pub env: String,
    /// Address the HTTP/WebSocket server binds to. Defaults to
    /// `0.0.0.0:8080` matching `diggerhq-opensandbox`'s default port.
    pub bind_addr: String,
    /// Sandbox image tag `SandboxDriver::build_image` targets.
    pub image_tag: String,
    /// Root path inside the sandbox the filesystem mirror watches.
    pub sandbox_root: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let bind_addr = std::env::var("XOBLAS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            postgres_connection_string: std::env::var("POSTGRES_CONNECTION_STRING").ok(),
            env: std::env::var("ENV").unwrap_or_else(|_| "development".to_string()),
            bind_addr,
            image_tag: std::env::var("XOBLAS_IMAGE_TAG").unwrap_or_else(|_| "xoblas-sandbox:latest".to_string()),
            sandbox_root: std::env::var("XOBLAS_SANDBOX_ROOT")
                .unwrap_or_else(|_| format!("{}/root", xoblas_sandbox::docker::SANDBOX_HOME)),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}
