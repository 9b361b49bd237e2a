// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt-sentinel parsing.
//!
//! `PROMPT_PREFIX = "__START__"`, `PROMPT_SUFFIX = "__END__$ "`; parsing
//! anchors on `PROMPT_SUFFIX_HEAD = "__END__"` (the suffix without its
//! trailing `$`), matching `parse_prompt_info`'s regex in the original.

use xoblas_core::constants::{PROMPT_PREFIX, PROMPT_SUFFIX_HEAD};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInfo {
    pub user: String,
    pub host: String,
    pub cwd: String,
}

/// Extract the most recent `user@host:cwd` sentinel from `output`. A
/// missing or malformed sentinel yields an all-empty `PromptInfo`, never
/// an error.
pub fn parse_prompt_info(output: &str) -> PromptInfo {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = PATTERN.get_or_init(|| {
        let pattern = format!("{}(.+?){}", regex::escape(PROMPT_PREFIX), regex::escape(PROMPT_SUFFIX_HEAD));
        regex::Regex::new(&pattern).expect("static prompt pattern is valid")
    });

    let Some(captures) = re.captures_iter(output).last() else {
        return PromptInfo::default();
    };
    let Some(body) = captures.get(1) else {
        return PromptInfo::default();
    };

    let Some((user_host, cwd)) = body.as_str().split_once(':') else {
        return PromptInfo::default();
    };
    let Some((user, host)) = user_host.split_once('@') else {
        return PromptInfo::default();
    };

    PromptInfo {
        user: user.to_string(),
        host: host.to_string(),
        cwd: cwd.to_string(),
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
