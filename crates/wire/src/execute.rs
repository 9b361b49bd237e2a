// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/execute` and `/get_outputs` request/response bodies.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteRequest {
    pub code: String,
    #[serde(default)]
    pub should_save: bool,
}

/// The `/execute` HTTP response body. Status code policy (200/201/400/401)
/// lives in `xoblas-daemon`'s route handler, not in this schema type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetOutputsRequest {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputRow {
    pub executable_id: String,
    pub output: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetOutputsResponse {
    pub outputs: Vec<OutputRow>,
}

#[cfg(test)]
#[path = "execute_tests.rs"]
mod tests;
