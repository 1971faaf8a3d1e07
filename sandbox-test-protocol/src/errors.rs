// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt};

/// An error that occurs while parsing a message received from the sandbox.
#[derive(Debug)]
pub struct MessageParseError {
    input: String,
    err: serde_json::Error,
}

impl MessageParseError {
    pub(crate) fn new(input: impl Into<String>, err: serde_json::Error) -> Self {
        Self {
            input: input.into(),
            err,
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for MessageParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Messages can be large (stack traces, source snippets), so only show the start.
        const MAX_INPUT_CHARS: usize = 80;

        let mut chars = self.input.chars();
        let prefix: String = chars.by_ref().take(MAX_INPUT_CHARS).collect();
        let ellipsis = if chars.next().is_some() { "..." } else { "" };
        write!(f, "failed to parse sandbox message `{prefix}{ellipsis}`")
    }
}

impl error::Error for MessageParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SandboxMessage;
    use std::error::Error as _;

    #[test]
    fn display_truncates_long_input() {
        let input = format!(r#"{{"type": "test", "event": "{}"#, "x".repeat(200));
        let error = SandboxMessage::from_json(&input).expect_err("input is truncated");
        let display = error.to_string();
        assert!(display.ends_with("...`"), "display was: {display}");
        assert!(display.len() < 140, "display was: {display}");
        assert!(error.source().is_some(), "serde_json error is the source");
    }
}
