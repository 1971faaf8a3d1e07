// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::SpecPath;
use serde::{Deserialize, Serialize};

/// A command sent from the results panel to the sandboxed test runner.
///
/// Commands are fire-and-forget: the runner never acknowledges them, and all resulting state
/// changes arrive as [`TestEvent`](crate::TestEvent)s.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunnerCommand {
    /// Run every test file in the sandbox.
    RunAllTests,

    /// Run a single test file.
    RunTests {
        /// The file to run.
        path: SpecPath,
    },
}

impl RunnerCommand {
    /// Returns the wire name of this command, as used in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            RunnerCommand::RunAllTests => "run-all-tests",
            RunnerCommand::RunTests { .. } => "run-tests",
        }
    }

    /// Serializes this command to its JSON representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(
            RunnerCommand::RunAllTests.to_json().unwrap(),
            r#"{"type":"run-all-tests"}"#
        );
        assert_eq!(
            RunnerCommand::RunTests {
                path: SpecPath::new("/src/a.test.js")
            }
            .to_json()
            .unwrap(),
            r#"{"type":"run-tests","path":"/src/a.test.js"}"#
        );
    }

    #[test]
    fn names_match_wire_tags() {
        for command in [
            RunnerCommand::RunAllTests,
            RunnerCommand::RunTests {
                path: SpecPath::new("a.test.js"),
            },
        ] {
            let value = serde_json::to_value(&command).unwrap();
            assert_eq!(value["type"], command.name());
        }
    }
}
