// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{MessageParseError, SpecPath};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A message received from the sandbox.
///
/// The channel between the results panel and the sandbox is shared with other traffic (bundler
/// status, console output and so on). Only `test` and `action` messages are relevant to test
/// results; everything else deserializes to [`SandboxMessage::Other`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SandboxMessage {
    /// An event emitted by the test runner.
    #[serde(rename = "test")]
    Test(TestEvent),

    /// An editor action, such as clearing stale error markers.
    #[serde(rename = "action")]
    Action(ActionMessage),

    /// Any other message type.
    #[serde(other)]
    Other,
}

impl SandboxMessage {
    /// Parses a message from its JSON representation.
    pub fn from_json(input: &str) -> Result<Self, MessageParseError> {
        serde_json::from_str(input).map_err(|err| MessageParseError::new(input, err))
    }

    /// Returns the spec path this message is scoped to, if any.
    ///
    /// This is the message's own `path` field if it has one, and otherwise the `path` of the test
    /// it describes. Lifecycle and describe events are not scoped to a path.
    pub fn scope_path(&self) -> Option<&SpecPath> {
        match self {
            SandboxMessage::Test(event) => event.scope_path(),
            SandboxMessage::Action(ActionMessage::ClearErrors { path, .. }) => path.as_ref(),
            SandboxMessage::Action(ActionMessage::Other) | SandboxMessage::Other => None,
        }
    }
}

/// An event emitted by the test runner.
///
/// Ordering across files is not guaranteed, but within a single file events arrive causally: a
/// `describe_start` always precedes the tests nested inside it, and each `describe_end` closes
/// the most recent unmatched `describe_start`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TestEvent {
    /// The runner has (re)initialized. All previous results are stale.
    InitializeTests,

    /// The number of tests that are about to run. Informational only.
    TestCount {
        /// The number of tests, if reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
    },

    /// A run over one or more files started.
    TotalTestStart,

    /// A run over one or more files finished.
    TotalTestEnd,

    /// A test file was discovered.
    AddFile {
        /// The path of the file.
        path: SpecPath,
    },

    /// A test file was removed.
    RemoveFile {
        /// The path of the file.
        path: SpecPath,
    },

    /// A test file failed to load, for example because of a syntax error.
    FileError {
        /// The path of the file.
        path: SpecPath,

        /// The error that occurred.
        error: ErrorInfo,
    },

    /// A `describe` block was entered.
    DescribeStart {
        /// The name of the block.
        #[serde(rename = "blockName")]
        block_name: String,
    },

    /// The innermost open `describe` block was exited.
    DescribeEnd,

    /// A test was declared inside the currently open `describe` blocks.
    AddTest {
        /// The name of the test.
        #[serde(rename = "testName")]
        test_name: String,

        /// The file the test belongs to.
        path: SpecPath,
    },

    /// A test started running.
    TestStart {
        /// The test that started.
        test: StartedTest,
    },

    /// A test finished running.
    TestEnd {
        /// The test that finished, along with its results.
        test: FinishedTest,
    },
}

impl TestEvent {
    /// Returns the wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            TestEvent::InitializeTests => "initialize_tests",
            TestEvent::TestCount { .. } => "test_count",
            TestEvent::TotalTestStart => "total_test_start",
            TestEvent::TotalTestEnd => "total_test_end",
            TestEvent::AddFile { .. } => "add_file",
            TestEvent::RemoveFile { .. } => "remove_file",
            TestEvent::FileError { .. } => "file_error",
            TestEvent::DescribeStart { .. } => "describe_start",
            TestEvent::DescribeEnd => "describe_end",
            TestEvent::AddTest { .. } => "add_test",
            TestEvent::TestStart { .. } => "test_start",
            TestEvent::TestEnd { .. } => "test_end",
        }
    }

    /// Returns the spec path this event is scoped to, if any.
    pub fn scope_path(&self) -> Option<&SpecPath> {
        match self {
            TestEvent::AddFile { path }
            | TestEvent::RemoveFile { path }
            | TestEvent::FileError { path, .. }
            | TestEvent::AddTest { path, .. } => Some(path),
            TestEvent::TestStart { test } => Some(&test.path),
            TestEvent::TestEnd { test } => Some(&test.path),
            TestEvent::InitializeTests
            | TestEvent::TestCount { .. }
            | TestEvent::TotalTestStart
            | TestEvent::TotalTestEnd
            | TestEvent::DescribeStart { .. }
            | TestEvent::DescribeEnd => None,
        }
    }
}

/// An editor action carried over the sandbox channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ActionMessage {
    /// Stale error markers should be cleared. When sent by the test runner, this marks the file
    /// it is about to execute.
    #[serde(rename = "clear-errors")]
    ClearErrors {
        /// The component that sent the action, for example `jest`.
        source: String,

        /// The file the action applies to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<SpecPath>,
    },

    /// Any other action.
    #[serde(other)]
    Other,
}

/// The status of a single test.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The test has been declared but has not started.
    Idle,

    /// The test is running.
    Running,

    /// The test passed.
    Pass,

    /// The test failed.
    Fail,
}

impl TestStatus {
    /// Returns true if the test has reached a final status.
    pub fn is_finished(self) -> bool {
        match self {
            TestStatus::Pass | TestStatus::Fail => true,
            TestStatus::Idle | TestStatus::Running => false,
        }
    }
}

/// An error reported by the runner, either for a single test or for a whole file.
///
/// Fields other than `message` and `stack` are preserved verbatim in `details`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// A human-readable description of the error.
    #[serde(default)]
    pub message: String,

    /// The stack trace, if one was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// All other fields sent with the error.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ErrorInfo {
    /// Creates a new `ErrorInfo` with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            details: serde_json::Map::new(),
        }
    }
}

/// The `test` payload of a `test_start` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartedTest {
    /// The name of the test.
    pub name: String,

    /// The file the test belongs to.
    pub path: SpecPath,

    /// Names of the enclosing `describe` blocks, outermost first.
    #[serde(default)]
    pub blocks: Vec<String>,
}

/// The `test` payload of a `test_end` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinishedTest {
    /// The name of the test.
    pub name: String,

    /// The file the test belongs to.
    pub path: SpecPath,

    /// Names of the enclosing `describe` blocks, outermost first.
    #[serde(default)]
    pub blocks: Vec<String>,

    /// The final status of the test.
    pub status: TestStatus,

    /// Assertion failures, in the order they were raised.
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,

    /// How long the test took, in milliseconds.
    #[serde(
        default,
        rename = "duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<f64>,
}

impl FinishedTest {
    /// Returns the duration of the test.
    ///
    /// Returns `None` if no duration was reported, or if the reported value was negative or not
    /// finite.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.and_then(millis_to_duration)
    }
}

/// Converts a millisecond count from the wire into a [`Duration`], at microsecond precision.
pub fn millis_to_duration(millis: f64) -> Option<Duration> {
    if !millis.is_finite() || millis < 0.0 {
        return None;
    }
    Some(Duration::from_micros((millis * 1000.0).round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(TestStatus::Idle, false; "idle")]
    #[test_case(TestStatus::Running, false; "running")]
    #[test_case(TestStatus::Pass, true; "pass")]
    #[test_case(TestStatus::Fail, true; "fail")]
    fn finished_statuses(status: TestStatus, expected: bool) {
        assert_eq!(status.is_finished(), expected);
    }

    #[test]
    fn parse_lifecycle_events() {
        for (input, expected) in [
            (
                r#"{"type": "test", "event": "initialize_tests"}"#,
                TestEvent::InitializeTests,
            ),
            (
                r#"{"type": "test", "event": "test_count", "count": 3}"#,
                TestEvent::TestCount { count: Some(3) },
            ),
            (
                r#"{"type": "test", "event": "total_test_start"}"#,
                TestEvent::TotalTestStart,
            ),
            (
                r#"{"type": "test", "event": "total_test_end"}"#,
                TestEvent::TotalTestEnd,
            ),
            (
                r#"{"type": "test", "event": "describe_end"}"#,
                TestEvent::DescribeEnd,
            ),
        ] {
            let message = SandboxMessage::from_json(input).expect("valid message");
            assert_eq!(message, SandboxMessage::Test(expected), "for {input}");
        }
    }

    #[test]
    fn parse_test_end() {
        let input = indoc! {r#"
            {
                "type": "test",
                "event": "test_end",
                "test": {
                    "name": "adds numbers",
                    "path": "/src/sum.test.js",
                    "blocks": ["sum", "positive"],
                    "status": "fail",
                    "duration": 12,
                    "errors": [
                        {
                            "message": "expected 3 to be 4",
                            "stack": "at sum.test.js:4:10",
                            "matcherResult": {"pass": false}
                        }
                    ]
                }
            }
        "#};

        let message = SandboxMessage::from_json(input).expect("valid message");
        let SandboxMessage::Test(TestEvent::TestEnd { test }) = message else {
            panic!("expected test_end, found {message:?}");
        };
        assert_eq!(test.name, "adds numbers");
        assert_eq!(test.path, SpecPath::new("/src/sum.test.js"));
        assert_eq!(test.blocks, vec!["sum".to_owned(), "positive".to_owned()]);
        assert_eq!(test.status, TestStatus::Fail);
        assert_eq!(test.duration(), Some(Duration::from_millis(12)));
        assert_eq!(test.errors.len(), 1);
        let error = &test.errors[0];
        assert_eq!(error.message, "expected 3 to be 4");
        assert_eq!(error.stack.as_deref(), Some("at sum.test.js:4:10"));
        assert_eq!(
            error.details.get("matcherResult"),
            Some(&serde_json::json!({"pass": false})),
            "unknown error fields are preserved"
        );
    }

    #[test]
    fn parse_describe_and_add_test_use_camel_case() {
        let message =
            SandboxMessage::from_json(r#"{"type":"test","event":"describe_start","blockName":"A"}"#)
                .unwrap();
        assert_eq!(
            message,
            SandboxMessage::Test(TestEvent::DescribeStart {
                block_name: "A".to_owned()
            })
        );

        let message = SandboxMessage::from_json(
            r#"{"type":"test","event":"add_test","testName":"t","path":"a.test.js"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            SandboxMessage::Test(TestEvent::AddTest {
                test_name: "t".to_owned(),
                path: SpecPath::new("a.test.js"),
            })
        );
    }

    #[test]
    fn parse_actions() {
        let message = SandboxMessage::from_json(
            r#"{"type":"action","action":"clear-errors","source":"jest","path":"a.test.js"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            SandboxMessage::Action(ActionMessage::ClearErrors {
                source: "jest".to_owned(),
                path: Some(SpecPath::new("a.test.js")),
            })
        );

        let message =
            SandboxMessage::from_json(r#"{"type":"action","action":"show-error","line":3}"#)
                .unwrap();
        assert_eq!(message, SandboxMessage::Action(ActionMessage::Other));
    }

    #[test]
    fn unrelated_messages_are_other() {
        let message =
            SandboxMessage::from_json(r#"{"type":"status","status":"transpiling"}"#).unwrap();
        assert_eq!(message, SandboxMessage::Other);
        assert_eq!(message.scope_path(), None);
    }

    #[test_case(r#"{"event": "add_file", "path": "a.test.js"}"#; "missing type")]
    #[test_case(r#"{"type": "test", "event": "launch_rockets"}"#; "unknown test event")]
    #[test_case(r#"{"type": "test", "event": "add_file"}"#; "missing path")]
    #[test_case(r#"{"type": "test", "#; "truncated")]
    fn parse_errors(input: &str) {
        let error = SandboxMessage::from_json(input).expect_err("message should be invalid");
        assert_eq!(error.input(), input);
    }

    #[test]
    fn scope_paths() {
        let path = SpecPath::new("a.test.js");
        let started = SandboxMessage::Test(TestEvent::TestStart {
            test: StartedTest {
                name: "t".to_owned(),
                path: path.clone(),
                blocks: vec![],
            },
        });
        assert_eq!(started.scope_path(), Some(&path));

        let file_error = SandboxMessage::Test(TestEvent::FileError {
            path: path.clone(),
            error: ErrorInfo::new("SyntaxError"),
        });
        assert_eq!(file_error.scope_path(), Some(&path));

        let describe = SandboxMessage::Test(TestEvent::DescribeStart {
            block_name: "A".to_owned(),
        });
        assert_eq!(describe.scope_path(), None);
    }

    #[test_case(12.0, Some(Duration::from_millis(12)); "integral")]
    #[test_case(0.5, Some(Duration::from_micros(500)); "fractional")]
    #[test_case(0.0, Some(Duration::ZERO); "zero")]
    #[test_case(-1.0, None; "negative")]
    #[test_case(f64::NAN, None; "nan")]
    #[test_case(f64::INFINITY, None; "infinite")]
    fn millis_conversion(input: f64, expected: Option<Duration>) {
        assert_eq!(millis_to_duration(input), expected);
    }
}
