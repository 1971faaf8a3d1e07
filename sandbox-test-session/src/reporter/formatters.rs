// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::aggregate::SuiteOutcome;
use owo_colors::Style;
use sandbox_test_protocol::TestStatus;
use std::{fmt, time::Duration};

#[derive(Clone, Debug, Default)]
pub(super) struct Styles {
    pub(super) count: Style,
    pub(super) pass: Style,
    pub(super) fail: Style,
    pub(super) pending: Style,
    pub(super) spec_path: Style,
    pub(super) block: Style,
    pub(super) duration: Style,
}

impl Styles {
    pub(super) fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.pending = Style::new().yellow().bold();
        self.spec_path = Style::new().bold();
        self.block = Style::new().cyan();
        self.duration = Style::new().dimmed();
    }

    pub(super) fn for_outcome(&self, outcome: SuiteOutcome) -> Style {
        match outcome {
            SuiteOutcome::Pass => self.pass,
            SuiteOutcome::Fail => self.fail,
            SuiteOutcome::Pending => self.pending,
        }
    }

    pub(super) fn for_status(&self, status: TestStatus) -> Style {
        match status {
            TestStatus::Pass => self.pass,
            TestStatus::Fail => self.fail,
            TestStatus::Idle | TestStatus::Running => self.pending,
        }
    }
}

pub(super) fn outcome_badge(outcome: SuiteOutcome) -> &'static str {
    match outcome {
        SuiteOutcome::Pass => " PASS ",
        SuiteOutcome::Fail => " FAIL ",
        SuiteOutcome::Pending => " RUNS ",
    }
}

pub(super) fn status_marker(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "✓",
        TestStatus::Fail => "✕",
        TestStatus::Running => "●",
        TestStatus::Idle => "○",
    }
}

/// A duration shown in milliseconds below one second, and in seconds otherwise.
pub(super) struct DisplayTestDuration(pub(super) Duration);

impl fmt::Display for DisplayTestDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 < Duration::from_secs(1) {
            write!(f, "({} ms)", self.0.as_millis())
        } else {
            write!(f, "({:.2} s)", self.0.as_secs_f64())
        }
    }
}

pub(super) struct DisplayTotalDuration(pub(super) Duration);

impl fmt::Display for DisplayTotalDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // .3 means print three digits after the decimal point.
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Duration::ZERO, "(0 ms)"; "zero")]
    #[test_case(Duration::from_micros(12_400), "(12 ms)"; "fractional millis")]
    #[test_case(Duration::from_millis(999), "(999 ms)"; "just under a second")]
    #[test_case(Duration::from_millis(1_250), "(1.25 s)"; "seconds")]
    fn test_durations(duration: Duration, expected: &str) {
        assert_eq!(DisplayTestDuration(duration).to_string(), expected);
    }

    #[test]
    fn total_duration() {
        assert_eq!(
            DisplayTotalDuration(Duration::from_millis(24)).to_string(),
            "0.024s"
        );
    }
}
