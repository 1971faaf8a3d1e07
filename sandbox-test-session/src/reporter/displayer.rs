// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::formatters::{
    DisplayTestDuration, DisplayTotalDuration, Styles, outcome_badge, status_marker,
};
use crate::{
    config::DisplaySettings,
    session::{SessionState, SessionStatus},
    tree::{Spec, Suite, Test},
};
use owo_colors::{OwoColorize, Style};
use sandbox_test_protocol::{ErrorInfo, SpecPath, TestStatus};
use std::io::{self, Write};

const INDENT: &str = "  ";

/// Writes session snapshots as a tree of results followed by a summary.
///
/// In verbose mode every test is listed. Otherwise only specs and failing tests are.
#[derive(Clone, Debug)]
pub struct SessionReporter {
    styles: Styles,
    show_durations: bool,
}

impl SessionReporter {
    /// Creates a new reporter with uncolored output.
    pub fn new(display: &DisplaySettings) -> Self {
        Self {
            styles: Styles::default(),
            show_durations: display.show_durations,
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes the results tree, then the summary.
    pub fn write_report(&self, state: &SessionState, writer: &mut dyn Write) -> io::Result<()> {
        self.write_tree(state, writer)?;
        let mut summary = Vec::new();
        self.write_summary(state, &mut summary)?;
        if !state.specs.is_empty() && !summary.is_empty() {
            writeln!(writer)?;
        }
        writer.write_all(&summary)
    }

    /// Writes the results tree.
    pub fn write_tree(&self, state: &SessionState, writer: &mut dyn Write) -> io::Result<()> {
        for spec in state.specs() {
            self.write_spec(spec, state.verbose(), writer)?;
        }
        Ok(())
    }

    /// Writes the summary lines.
    ///
    /// Counts are only written once a run has completed with at least one test. While a run is
    /// in progress a single status line is written instead.
    pub fn write_summary(&self, state: &SessionState, writer: &mut dyn Write) -> io::Result<()> {
        let status = state.status();
        if status.is_loading() {
            return writeln!(writer, "Status: {status}");
        }
        if status != SessionStatus::Complete {
            return Ok(());
        }
        if state.specs.is_empty() {
            writeln!(writer, "No test files found.")?;
            return writeln!(
                writer,
                "Test match: {}",
                format!("/{}/", SpecPath::TEST_FILE_PATTERN).style(self.styles.spec_path)
            );
        }

        let summary = state.summary();
        if summary.tests.total == 0 {
            return Ok(());
        }
        let styles = &self.styles;

        write!(writer, "Tests:  ")?;
        let tests = summary.tests;
        write_counts(
            writer,
            styles,
            &[
                (tests.fail, "failed", styles.fail),
                (tests.pass, "passed", styles.pass),
                (tests.running, "running", styles.pending),
                (tests.idle, "idle", styles.pending),
            ],
            tests.total,
        )?;

        write!(writer, "Suites: ")?;
        let suites = summary.suites;
        write_counts(
            writer,
            styles,
            &[
                (suites.fail, "failed", styles.fail),
                (suites.pass, "passed", styles.pass),
                (suites.pending, "pending", styles.pending),
            ],
            suites.total,
        )?;

        writeln!(writer, "Time:   {}", DisplayTotalDuration(summary.duration))
    }

    fn write_spec(&self, spec: &Spec, verbose: bool, writer: &mut dyn Write) -> io::Result<()> {
        let outcome = spec.outcome();
        writeln!(
            writer,
            "{} {}",
            outcome_badge(outcome).style(self.styles.for_outcome(outcome)),
            spec.name.style(self.styles.spec_path),
        )?;

        if let Some(error) = &spec.error {
            write_error(error, 1, writer)?;
        }

        if verbose {
            self.write_suite(&spec.suite, 1, writer)
        } else {
            for test in spec
                .suite
                .tests_recursive()
                .filter(|test| test.status == TestStatus::Fail)
            {
                write!(writer, "{INDENT}")?;
                for block in &test.blocks {
                    write!(writer, "{} › ", block.style(self.styles.block))?;
                }
                self.write_test_line(test, writer)?;
                for error in &test.errors {
                    write_error(error, 2, writer)?;
                }
            }
            Ok(())
        }
    }

    fn write_suite(&self, suite: &Suite, depth: usize, writer: &mut dyn Write) -> io::Result<()> {
        let indent = INDENT.repeat(depth);
        for test in suite.tests() {
            write!(
                writer,
                "{indent}{} ",
                status_marker(test.status).style(self.styles.for_status(test.status))
            )?;
            self.write_test_line(test, writer)?;
            if test.status == TestStatus::Fail {
                for error in &test.errors {
                    write_error(error, depth + 1, writer)?;
                }
            }
        }
        for block in suite.describes() {
            writeln!(writer, "{indent}{}", block.name.style(self.styles.block))?;
            self.write_suite(&block.suite, depth + 1, writer)?;
        }
        Ok(())
    }

    fn write_test_line(&self, test: &Test, writer: &mut dyn Write) -> io::Result<()> {
        write!(writer, "{}", test.name)?;
        let duration = test
            .duration
            .filter(|_| self.show_durations && test.status.is_finished());
        if let Some(duration) = duration {
            write!(
                writer,
                " {}",
                DisplayTestDuration(duration).style(self.styles.duration)
            )?;
        }
        writeln!(writer)
    }
}

fn write_counts(
    writer: &mut dyn Write,
    styles: &Styles,
    counts: &[(usize, &str, Style)],
    total: usize,
) -> io::Result<()> {
    for &(count, label, style) in counts {
        if count > 0 {
            write!(writer, "{}, ", format!("{count} {label}").style(style))?;
        }
    }
    writeln!(writer, "{} total", total.style(styles.count))
}

fn write_error(error: &ErrorInfo, depth: usize, writer: &mut dyn Write) -> io::Result<()> {
    let indent = INDENT.repeat(depth);
    for line in error.message.lines() {
        if line.is_empty() {
            writeln!(writer)?;
        } else {
            writeln!(writer, "{indent}{line}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ListenerScope, ReducerOptions, Reduction, ScopeKey, reduce};
    use indoc::indoc;
    use sandbox_test_protocol::SandboxMessage;

    fn state_from(input: &str, verbose: bool) -> SessionState {
        let mut state = SessionState::new(verbose);
        let mut scope = ListenerScope::new(ScopeKey {
            run_mode: state.run_mode(),
            active_file: None,
        });
        for line in input.lines() {
            let message = SandboxMessage::from_json(line).unwrap();
            match reduce(&state, &mut scope, &message, &ReducerOptions::default()) {
                Reduction::Updated(next) => state = next,
                Reduction::Unchanged => {}
                other => panic!("unexpected reduction for {line}: {other:?}"),
            }
        }
        state
    }

    const RUN: &str = indoc! {r#"
        {"type": "test", "event": "initialize_tests"}
        {"type": "test", "event": "add_file", "path": "a.test.js"}
        {"type": "test", "event": "add_file", "path": "b.test.js"}
        {"type": "test", "event": "add_file", "path": "c.test.js"}
        {"type": "test", "event": "total_test_start"}
        {"type": "test", "event": "test_end", "test": {"name": "adds", "path": "a.test.js", "blocks": ["math"], "status": "pass", "errors": [], "duration": 4}}
        {"type": "test", "event": "test_end", "test": {"name": "divides", "path": "a.test.js", "blocks": ["math", "division"], "status": "fail", "errors": [{"message": "expected 2\nreceived 3"}], "duration": 7}}
        {"type": "test", "event": "test_end", "test": {"name": "root", "path": "b.test.js", "blocks": [], "status": "pass", "errors": [], "duration": 13}}
        {"type": "test", "event": "file_error", "path": "c.test.js", "error": {"message": "SyntaxError: unexpected token"}}
        {"type": "test", "event": "total_test_end"}
    "#};

    fn render(state: &SessionState, show_durations: bool) -> String {
        let reporter = SessionReporter::new(&DisplaySettings { show_durations });
        let mut out = Vec::new();
        reporter.write_report(state, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn failures_only() {
        insta::assert_snapshot!(render(&state_from(RUN, false), true), @r"
         FAIL  a.test.js
          math › division › divides (7 ms)
            expected 2
            received 3
         PASS  b.test.js
         FAIL  c.test.js
          SyntaxError: unexpected token

        Tests:  1 failed, 2 passed, 3 total
        Suites: 2 failed, 1 passed, 3 total
        Time:   0.024s
        ");
    }

    #[test]
    fn verbose_tree() {
        insta::assert_snapshot!(render(&state_from(RUN, true), false), @r"
         FAIL  a.test.js
          math
            ✓ adds
            division
              ✕ divides
                expected 2
                received 3
         PASS  b.test.js
          ✓ root
         FAIL  c.test.js
          SyntaxError: unexpected token

        Tests:  1 failed, 2 passed, 3 total
        Suites: 2 failed, 1 passed, 3 total
        Time:   0.024s
        ");
    }

    #[test]
    fn in_progress() {
        let input = indoc! {r#"
            {"type": "test", "event": "add_file", "path": "a.test.js"}
            {"type": "test", "event": "add_test", "testName": "later", "path": "a.test.js"}
            {"type": "test", "event": "total_test_start"}
            {"type": "test", "event": "test_start", "test": {"name": "now", "path": "a.test.js", "blocks": []}}
        "#};
        insta::assert_snapshot!(render(&state_from(input, true), true), @r"
         RUNS  a.test.js
          ○ later
          ● now

        Status: running
        ");
    }

    #[test]
    fn no_test_files() {
        let input = indoc! {r#"
            {"type": "test", "event": "initialize_tests"}
            {"type": "test", "event": "total_test_start"}
            {"type": "test", "event": "total_test_end"}
        "#};
        insta::assert_snapshot!(render(&state_from(input, false), true), @r"
        No test files found.
        Test match: /.*\.(test|spec)\.[tj]sx?$/
        ");
    }

    #[test]
    fn no_counts_without_tests() {
        let input = indoc! {r#"
            {"type": "test", "event": "add_file", "path": "a.test.js"}
            {"type": "test", "event": "file_error", "path": "a.test.js", "error": {"message": "SyntaxError: unexpected token"}}
            {"type": "test", "event": "total_test_end"}
        "#};
        insta::assert_snapshot!(render(&state_from(input, false), true), @r"
         FAIL  a.test.js
          SyntaxError: unexpected token
        ");
    }

    #[test]
    fn idle_session_has_no_summary() {
        let input = indoc! {r#"
            {"type": "test", "event": "initialize_tests"}
        "#};
        insta::assert_snapshot!(render(&state_from(input, false), true), @"");
    }
}
