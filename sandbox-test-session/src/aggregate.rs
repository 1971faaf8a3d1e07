// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roll-up statistics over a forest of specs.
//!
//! Everything here is derived from a snapshot on demand and never stored.

use crate::tree::{Spec, Suite};
use sandbox_test_protocol::TestStatus;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Test counts by status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TestResults {
    /// The number of tests.
    pub total: usize,

    /// Tests that passed.
    pub pass: usize,

    /// Tests that failed.
    pub fail: usize,

    /// Tests that have been declared but not started.
    pub idle: usize,

    /// Tests that are running.
    pub running: usize,
}

impl TestResults {
    /// Counts a single test.
    pub fn record(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Idle => self.idle += 1,
            TestStatus::Running => self.running += 1,
            TestStatus::Pass => self.pass += 1,
            TestStatus::Fail => self.fail += 1,
        }
    }

    /// Returns true if at least one test failed.
    pub fn has_failures(&self) -> bool {
        self.fail > 0
    }
}

/// The roll-up status of a spec or describe block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteOutcome {
    /// At least one test passed, and none failed.
    Pass,

    /// A test failed, or the file failed to load.
    Fail,

    /// Nothing has passed or failed yet.
    Pending,
}

impl SuiteOutcome {
    fn from_results(results: &TestResults, file_error: bool) -> Self {
        if file_error || results.has_failures() {
            SuiteOutcome::Fail
        } else if results.pass > 0 {
            SuiteOutcome::Pass
        } else {
            SuiteOutcome::Pending
        }
    }
}

/// Spec counts by outcome.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SuiteResults {
    /// The number of specs.
    pub total: usize,

    /// Specs that passed.
    pub pass: usize,

    /// Specs that failed.
    pub fail: usize,

    /// Specs with no finished tests.
    pub pending: usize,
}

impl SuiteResults {
    fn record(&mut self, outcome: SuiteOutcome) {
        self.total += 1;
        match outcome {
            SuiteOutcome::Pass => self.pass += 1,
            SuiteOutcome::Fail => self.fail += 1,
            SuiteOutcome::Pending => self.pending += 1,
        }
    }
}

impl Suite {
    /// Counts every test in this suite, at any depth.
    pub fn results(&self) -> TestResults {
        let mut results = TestResults::default();
        for test in self.tests_recursive() {
            results.record(test.status);
        }
        results
    }

    /// Returns the roll-up outcome of this suite.
    pub fn outcome(&self) -> SuiteOutcome {
        SuiteOutcome::from_results(&self.results(), false)
    }
}

impl Spec {
    /// Returns the roll-up outcome of this spec. A file error always fails the spec.
    pub fn outcome(&self) -> SuiteOutcome {
        SuiteOutcome::from_results(&self.suite.results(), self.error.is_some())
    }
}

/// Sums the durations of every finished test. Tests without a duration count as zero.
pub fn get_duration<'a>(specs: impl IntoIterator<Item = &'a Spec>) -> Duration {
    specs
        .into_iter()
        .flat_map(|spec| spec.suite.tests_recursive())
        .filter_map(|test| test.duration)
        .sum()
}

/// Counts every test in every spec by status.
pub fn get_all_test_results<'a>(specs: impl IntoIterator<Item = &'a Spec>) -> TestResults {
    let mut results = TestResults::default();
    for spec in specs {
        for test in spec.suite.tests_recursive() {
            results.record(test.status);
        }
    }
    results
}

/// Counts specs by outcome.
pub fn get_all_suite_results<'a>(specs: impl IntoIterator<Item = &'a Spec>) -> SuiteResults {
    let mut results = SuiteResults::default();
    for spec in specs {
        results.record(spec.outcome());
    }
    results
}

/// Roll-up statistics for a session snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Total time spent in finished tests.
    #[serde(serialize_with = "serialize_ms")]
    pub duration: Duration,

    /// Test counts.
    pub tests: TestResults,

    /// Spec counts.
    pub suites: SuiteResults,

    /// The number of specs that failed to load.
    pub file_errors: usize,
}

impl SessionSummary {
    /// Computes a summary over `specs`.
    pub fn new<'a>(specs: impl IntoIterator<Item = &'a Spec> + Clone) -> Self {
        Self {
            duration: get_duration(specs.clone()),
            tests: get_all_test_results(specs.clone()),
            suites: get_all_suite_results(specs.clone()),
            file_errors: specs
                .into_iter()
                .filter(|spec| spec.error.is_some())
                .count(),
        }
    }

    /// Returns true if any test or spec failed.
    pub fn has_failures(&self) -> bool {
        self.tests.has_failures() || self.suites.fail > 0
    }
}

fn serialize_ms<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_micros() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{SuiteNode, Test};
    use proptest::{collection::vec, prelude::*};
    use sandbox_test_protocol::{ErrorInfo, SpecPath};
    use std::collections::BTreeMap;
    use test_strategy::proptest;

    fn spec_with(path: &str, tests: &[(&[&str], &str, TestStatus, Option<u64>)]) -> Spec {
        let mut spec = Spec::new(SpecPath::new(path));
        for &(blocks, name, status, duration_ms) in tests {
            let blocks: Vec<String> = blocks.iter().map(|&block| block.to_owned()).collect();
            let test = Test {
                status,
                duration: duration_ms.map(Duration::from_millis),
                ..Test::declared(name, spec.name.clone(), blocks.clone())
            };
            spec.suite.set_at_path(&blocks, SuiteNode::Test(test));
        }
        spec
    }

    #[test]
    fn counts_every_depth() {
        let specs = [
            spec_with(
                "a.test.js",
                &[
                    (&[][..], "root", TestStatus::Pass, Some(5)),
                    (&["A"][..], "one", TestStatus::Fail, Some(7)),
                    (&["A", "B"][..], "two", TestStatus::Running, None),
                    (&["A", "B", "C"][..], "three", TestStatus::Idle, None),
                ],
            ),
            spec_with("b.test.js", &[(&["X"][..], "x", TestStatus::Pass, Some(12))]),
            spec_with("c.test.js", &[(&[][..], "c", TestStatus::Idle, None)]),
        ];

        assert_eq!(
            get_all_test_results(&specs),
            TestResults {
                total: 6,
                pass: 2,
                fail: 1,
                idle: 2,
                running: 1,
            }
        );
        assert_eq!(
            get_all_suite_results(&specs),
            SuiteResults {
                total: 3,
                pass: 1,
                fail: 1,
                pending: 1,
            }
        );
        assert_eq!(get_duration(&specs), Duration::from_millis(24));
        let a = specs[0].suite.describe_at(&["A".to_owned()]).unwrap();
        assert_eq!(a.suite.outcome(), SuiteOutcome::Fail);
    }

    #[test]
    fn file_error_fails_the_spec() {
        let mut spec = spec_with("a.test.js", &[(&[][..], "t", TestStatus::Pass, Some(1))]);
        spec.error = Some(ErrorInfo::new("SyntaxError"));
        assert_eq!(spec.outcome(), SuiteOutcome::Fail);

        let summary = SessionSummary::new([&spec]);
        assert_eq!(summary.file_errors, 1);
        assert_eq!(summary.tests.total, 1, "tests under a file error are still counted");
        assert!(summary.has_failures());
    }

    #[test]
    fn empty_forest() {
        let summary = SessionSummary::new(std::iter::empty());
        assert_eq!(summary.duration, Duration::ZERO);
        assert_eq!(summary.tests, TestResults::default());
        assert_eq!(summary.suites, SuiteResults::default());
        assert!(!summary.has_failures());
    }

    #[test]
    fn summary_serializes_duration_as_millis() {
        let spec = spec_with("a.test.js", &[(&[][..], "t", TestStatus::Pass, Some(12))]);
        let json = serde_json::to_value(SessionSummary::new([&spec])).unwrap();
        assert_eq!(json["duration"], 12.0);
        assert_eq!(json["tests"]["pass"], 1);
        assert_eq!(json["suites"]["pass"], 1);
    }

    type Placement = (usize, Vec<String>, String, TestStatus);

    fn placements() -> impl Strategy<Value = Vec<Placement>> {
        vec(
            (0..3usize, vec("[ABC]", 0..4), "[xyz]", any::<TestStatus>()),
            0..48,
        )
    }

    #[proptest(cases = 64)]
    fn totals_match_distinct_tests(
        #[any] paths: [SpecPath; 3],
        #[strategy(placements())] placements: Vec<Placement>,
    ) {
        let mut specs: Vec<_> = paths.into_iter().map(Spec::new).collect();
        // Later placements with the same identity overwrite earlier ones.
        let mut expected = BTreeMap::new();
        for (index, blocks, name, status) in placements {
            let spec = &mut specs[index];
            let test = Test {
                status,
                ..Test::declared(name.clone(), spec.name.clone(), blocks.clone())
            };
            spec.suite.set_at_path(&blocks, SuiteNode::Test(test));
            expected.insert((index, blocks, name), status);
        }

        let mut expected_results = TestResults::default();
        for status in expected.values() {
            expected_results.record(*status);
        }
        let results = get_all_test_results(&specs);
        prop_assert_eq!(results, expected_results);
        prop_assert_eq!(
            results.total,
            results.pass + results.fail + results.idle + results.running
        );

        let per_spec: usize = specs.iter().map(|spec| spec.suite.results().total).sum();
        prop_assert_eq!(per_spec, results.total);
    }
}
