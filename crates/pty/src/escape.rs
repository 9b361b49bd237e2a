// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escape-sequence state machine tracking DEC private-mode alternate
//! screen transitions. Naive substring scanning on a streaming buffer
//! misfires when `CSI ?1049h`/`l` is split across reads; this scans
//! byte-by-byte and carries partial-sequence state across calls to
//! `feed` instead.

/// Tracks progress through a CSI (`ESC [ ... final-byte`) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Ground,
    SawEsc,
    InCsi,
}

/// Feeds a byte stream through a CSI parser and reports alternate-screen
/// mode transitions derived from `CSI ?1049h` (enter) / `CSI ?1049l`
/// (exit), tolerating sequences split across `feed` calls.
#[derive(Debug, Clone)]
pub struct AltScreenTracker {
    state: ScanState,
    params: Vec<u8>,
    in_alternate_screen: bool,
}

impl Default for AltScreenTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AltScreenTracker {
    pub fn new() -> Self {
        Self {
            state: ScanState::Ground,
            params: Vec::with_capacity(8),
            in_alternate_screen: false,
        }
    }

    pub fn in_alternate_screen(&self) -> bool {
        self.in_alternate_screen
    }

    /// Scan `chunk`, updating alternate-screen state. Returns `true`
    /// exactly once per observed `CSI ?1049l` (an exit transition), which
    /// is what `WorkspaceEditor` uses to know it must re-read the open
    /// file.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        let mut exited = false;
        for &byte in chunk {
            match self.state {
                ScanState::Ground => {
                    if byte == 0x1b {
                        self.state = ScanState::SawEsc;
                    }
                }
                ScanState::SawEsc => {
                    if byte == b'[' {
                        self.params.clear();
                        self.state = ScanState::InCsi;
                    } else {
                        self.state = ScanState::Ground;
                    }
                }
                ScanState::InCsi => {
                    if (0x30..=0x3f).contains(&byte) {
                        self.params.push(byte);
                    } else if (0x40..=0x7e).contains(&byte) {
                        if self.params == b"?1049" {
                            match byte {
                                b'h' => self.in_alternate_screen = true,
                                b'l' => {
                                    self.in_alternate_screen = false;
                                    exited = true;
                                }
                                _ => {}
                            }
                        }
                        self.state = ScanState::Ground;
                    } else if !(0x20..=0x2f).contains(&byte) {
                        // Not a valid intermediate byte either; abandon.
                        self.state = ScanState::Ground;
                    }
                }
            }
        }
        exited
    }
}

/// Strip complete ANSI/VT escape sequences and CR/LF from `input`,
/// matching the class of sequences `xoblas_editor_command` strips before
/// JSON-parsing a structured command's output.
pub fn strip_ansi_and_newlines(input: &str) -> String {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])|\r|\n")
            .expect("static ANSI-strip pattern is valid")
    });
    re.replace_all(input, "").into_owned()
}

#[cfg(test)]
#[path = "escape_tests.rs"]
mod tests;
