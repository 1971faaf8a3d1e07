// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The suite tree: specs, describe blocks and tests.
//!
//! Each [`Spec`] is the root of a tree mirroring the nested `describe()` calls in one test file.
//! Children are stored behind [`Arc`]s and updated with [`Arc::make_mut`], so an update only
//! clones the blocks along the path it touches, and any earlier snapshot holding the old `Arc`s
//! is left intact.

use crate::paths::{StoragePath, StorageSegment};
use indexmap::IndexMap;
use sandbox_test_protocol::{ErrorInfo, FinishedTest, SpecPath, StartedTest, TestStatus};
use serde::{Serialize, Serializer};
use std::{sync::Arc, time::Duration};

/// A single test, the leaf of a suite tree.
///
/// A test is identified by its `path`, `blocks` and `name`. Inserting a test with the same
/// identity replaces the existing one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Test {
    /// The name of the test.
    pub name: String,

    /// The file the test belongs to.
    pub path: SpecPath,

    /// Names of the enclosing describe blocks, outermost first.
    pub blocks: Vec<String>,

    /// The current status of the test.
    pub status: TestStatus,

    /// Assertion failures, in the order they were reported.
    pub errors: Vec<ErrorInfo>,

    /// How long the test took. `None` until the test has finished.
    #[serde(
        serialize_with = "serialize_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
}

impl Test {
    /// Creates a test that has been declared but not started.
    pub fn declared(name: impl Into<String>, path: SpecPath, blocks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path,
            blocks,
            status: TestStatus::Idle,
            errors: Vec::new(),
            duration: None,
        }
    }

    /// Creates a running test from a `test_start` payload.
    pub fn started(test: &StartedTest) -> Self {
        Self {
            name: test.name.clone(),
            path: test.path.clone(),
            blocks: test.blocks.clone(),
            status: TestStatus::Running,
            errors: Vec::new(),
            duration: None,
        }
    }

    /// Creates a finished test from a `test_end` payload.
    pub fn finished(test: &FinishedTest) -> Self {
        Self {
            name: test.name.clone(),
            path: test.path.clone(),
            blocks: test.blocks.clone(),
            status: test.status,
            errors: test.errors.clone(),
            duration: test.duration(),
        }
    }

    /// Returns the location of this test within its spec.
    pub fn storage_path(&self) -> StoragePath {
        StoragePath::for_test(&self.blocks, &self.name)
    }
}

/// The children of a spec or describe block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Suite {
    describes: IndexMap<String, Arc<DescribeBlock>>,
    tests: IndexMap<String, Test>,
}

impl Suite {
    /// Returns the describe blocks directly inside this suite, in insertion order.
    pub fn describes(&self) -> impl ExactSizeIterator<Item = &DescribeBlock> + '_ {
        self.describes.values().map(|block| &**block)
    }

    /// Returns the tests directly inside this suite, in insertion order.
    pub fn tests(&self) -> impl ExactSizeIterator<Item = &Test> + '_ {
        self.tests.values()
    }

    /// Returns true if this suite has no children.
    pub fn is_empty(&self) -> bool {
        self.describes.is_empty() && self.tests.is_empty()
    }

    /// Returns every test in this suite at any depth, depth-first.
    ///
    /// A suite's own tests are visited before its describe blocks.
    pub fn tests_recursive(&self) -> RecursiveTests<'_> {
        RecursiveTests {
            current: self.tests.values(),
            stack: self
                .describes
                .values()
                .rev()
                .map(|block| &block.suite)
                .collect(),
        }
    }

    /// Places `node` in the container reached by walking `blocks` from this suite.
    ///
    /// Describe blocks along `blocks` that don't exist yet are created empty. `node` replaces any
    /// existing node of the same kind and name in that container, keeping its position. A
    /// replaced describe block loses everything that was nested inside it.
    pub fn set_at_path(&mut self, blocks: &[String], node: SuiteNode) {
        let container = self.container_mut(blocks);
        match node {
            SuiteNode::Test(test) => {
                container.tests.insert(test.name.clone(), test);
            }
            SuiteNode::Describe(block) => {
                container
                    .describes
                    .insert(block.name.clone(), Arc::new(block));
            }
        }
    }

    /// Returns the node at `path`, if it exists.
    pub fn node_at(&self, path: &StoragePath) -> Option<SuiteNodeRef<'_>> {
        let mut node = SuiteNodeRef::Root(self);
        // Segments always come in (selector, name) pairs.
        for pair in path.segments().chunks(2) {
            let suite = match node {
                SuiteNodeRef::Root(suite) => suite,
                SuiteNodeRef::Describe(block) => &block.suite,
                SuiteNodeRef::Test(_) => return None,
            };
            node = match pair {
                [StorageSegment::Describes, StorageSegment::Name(name)] => {
                    SuiteNodeRef::Describe(&**suite.describes.get(name)?)
                }
                [StorageSegment::Tests, StorageSegment::Name(name)] => {
                    SuiteNodeRef::Test(suite.tests.get(name)?)
                }
                _ => return None,
            };
        }
        Some(node)
    }

    /// Returns the describe block identified by `blocks`, outermost first.
    pub fn describe_at(&self, blocks: &[String]) -> Option<&DescribeBlock> {
        let (first, rest) = blocks.split_first()?;
        let mut block = self.describes.get(first)?;
        for name in rest {
            block = block.suite.describes.get(name)?;
        }
        Some(&**block)
    }

    /// Returns the test `name` nested inside `blocks`.
    pub fn test_at(&self, blocks: &[String], name: &str) -> Option<&Test> {
        let suite = if blocks.is_empty() {
            self
        } else {
            &self.describe_at(blocks)?.suite
        };
        suite.tests.get(name)
    }

    fn container_mut(&mut self, blocks: &[String]) -> &mut Suite {
        let mut suite = self;
        for name in blocks {
            let block = suite
                .describes
                .entry(name.clone())
                .or_insert_with(|| Arc::new(DescribeBlock::new(name.clone())));
            suite = &mut Arc::make_mut(block).suite;
        }
        suite
    }
}

/// Iterator over every test in a [`Suite`], returned by [`Suite::tests_recursive`].
#[derive(Clone, Debug)]
pub struct RecursiveTests<'a> {
    current: indexmap::map::Values<'a, String, Test>,
    stack: Vec<&'a Suite>,
}

impl<'a> Iterator for RecursiveTests<'a> {
    type Item = &'a Test;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(test) = self.current.next() {
                return Some(test);
            }
            let suite = self.stack.pop()?;
            self.current = suite.tests.values();
            self.stack
                .extend(suite.describes.values().rev().map(|block| &block.suite));
        }
    }
}

/// A named grouping of tests, mirroring a `describe()` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DescribeBlock {
    /// The name of the block.
    pub name: String,

    /// Blocks and tests nested inside this one.
    #[serde(flatten)]
    pub suite: Suite,
}

impl DescribeBlock {
    /// Creates a new, empty describe block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suite: Suite::default(),
        }
    }
}

/// The results for one test file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Spec {
    /// The path of the test file.
    pub name: SpecPath,

    /// Top-level describe blocks and tests.
    #[serde(flatten)]
    pub suite: Suite,

    /// Set if the whole file failed to load. The tree is kept, but its results are not
    /// meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Spec {
    /// Creates a new, empty spec.
    pub fn new(name: SpecPath) -> Self {
        Self {
            name,
            suite: Suite::default(),
            error: None,
        }
    }
}

/// A node that can be placed into a [`Suite`] with [`Suite::set_at_path`].
#[derive(Clone, Debug, PartialEq)]
pub enum SuiteNode {
    /// A describe block.
    Describe(DescribeBlock),

    /// A test.
    Test(Test),
}

/// A reference to a node in a suite tree, returned by [`Suite::node_at`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SuiteNodeRef<'a> {
    /// The suite the lookup started from.
    Root(&'a Suite),

    /// A describe block.
    Describe(&'a DescribeBlock),

    /// A test.
    Test(&'a Test),
}

impl<'a> SuiteNodeRef<'a> {
    /// Returns the test, if this node is one.
    pub fn as_test(self) -> Option<&'a Test> {
        match self {
            SuiteNodeRef::Test(test) => Some(test),
            SuiteNodeRef::Root(_) | SuiteNodeRef::Describe(_) => None,
        }
    }

    /// Returns the describe block, if this node is one.
    pub fn as_describe(self) -> Option<&'a DescribeBlock> {
        match self {
            SuiteNodeRef::Describe(block) => Some(block),
            SuiteNodeRef::Root(_) | SuiteNodeRef::Test(_) => None,
        }
    }
}

fn serialize_duration_ms<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_f64(duration.as_micros() as f64 / 1000.0),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    fn test_in(blocks: &[&str], name: &str, status: TestStatus) -> Test {
        Test {
            status,
            ..Test::declared(name, SpecPath::new("a.test.js"), names(blocks))
        }
    }

    #[test]
    fn set_at_path_creates_intermediate_blocks() {
        let mut suite = Suite::default();
        let test = test_in(&["A", "B", "C"], "t", TestStatus::Idle);
        suite.set_at_path(&test.blocks.clone(), SuiteNode::Test(test.clone()));

        let a = suite.describe_at(&names(&["A"])).expect("A was created");
        assert_eq!(a.name, "A");
        assert_eq!(a.suite.tests().len(), 0);
        let c = suite
            .describe_at(&names(&["A", "B", "C"]))
            .expect("C was created");
        assert_eq!(c.suite.tests().collect::<Vec<_>>(), vec![&test]);

        let found = suite
            .node_at(&"describes.A.describes.B.describes.C.tests.t".parse().unwrap())
            .and_then(SuiteNodeRef::as_test);
        assert_eq!(found, Some(&test));
    }

    #[test]
    fn tests_overwrite_in_place() {
        let mut suite = Suite::default();
        suite.set_at_path(&[], SuiteNode::Test(test_in(&[], "first", TestStatus::Idle)));
        suite.set_at_path(&[], SuiteNode::Test(test_in(&[], "second", TestStatus::Idle)));
        suite.set_at_path(&[], SuiteNode::Test(test_in(&[], "first", TestStatus::Pass)));

        let tests: Vec<_> = suite
            .tests()
            .map(|test| (test.name.as_str(), test.status))
            .collect();
        assert_eq!(
            tests,
            vec![("first", TestStatus::Pass), ("second", TestStatus::Idle)],
            "overwriting keeps the original position"
        );
    }

    #[test]
    fn existing_describe_is_replaced() {
        let mut suite = Suite::default();
        suite.set_at_path(&[], SuiteNode::Describe(DescribeBlock::new("first")));
        suite.set_at_path(&names(&["A"]), SuiteNode::Test(test_in(&["A"], "t", TestStatus::Idle)));
        suite.set_at_path(&[], SuiteNode::Describe(DescribeBlock::new("last")));
        suite.set_at_path(&[], SuiteNode::Describe(DescribeBlock::new("A")));

        assert!(suite.test_at(&names(&["A"]), "t").is_none());
        assert!(suite.describe_at(&names(&["A"])).is_some_and(|a| a.suite.is_empty()));
        let order: Vec<_> = suite.describes().map(|block| block.name.as_str()).collect();
        assert_eq!(order, vec!["first", "A", "last"]);
    }

    #[test]
    fn updates_do_not_affect_snapshots() {
        let mut suite = Suite::default();
        suite.set_at_path(&names(&["A"]), SuiteNode::Test(test_in(&["A"], "t", TestStatus::Running)));
        suite.set_at_path(&names(&["Z"]), SuiteNode::Test(test_in(&["Z"], "z", TestStatus::Idle)));
        let snapshot = suite.clone();

        suite.set_at_path(&names(&["A"]), SuiteNode::Test(test_in(&["A"], "t", TestStatus::Pass)));

        assert_eq!(
            snapshot.test_at(&names(&["A"]), "t").map(|test| test.status),
            Some(TestStatus::Running)
        );
        assert_eq!(
            suite.test_at(&names(&["A"]), "t").map(|test| test.status),
            Some(TestStatus::Pass)
        );
        // The untouched block is still shared between both trees.
        assert!(Arc::ptr_eq(&snapshot.describes["Z"], &suite.describes["Z"]));
        assert!(!Arc::ptr_eq(&snapshot.describes["A"], &suite.describes["A"]));
    }

    #[test]
    fn recursive_iteration_is_depth_first() {
        let mut suite = Suite::default();
        for (blocks, name) in [
            (&["A"][..], "a1"),
            (&["A", "B"][..], "b1"),
            (&[][..], "root"),
            (&["C"][..], "c1"),
            (&["A"][..], "a2"),
        ] {
            suite.set_at_path(
                &names(blocks),
                SuiteNode::Test(test_in(blocks, name, TestStatus::Idle)),
            );
        }

        let order: Vec<_> = suite
            .tests_recursive()
            .map(|test| test.name.as_str())
            .collect();
        assert_eq!(order, vec!["root", "a1", "a2", "b1", "c1"]);
    }

    #[test]
    fn node_at_missing_paths() {
        let mut suite = Suite::default();
        suite.set_at_path(&names(&["A"]), SuiteNode::Test(test_in(&["A"], "t", TestStatus::Idle)));

        for path in ["describes.B", "describes.A.tests.missing", "tests.t"] {
            assert_eq!(suite.node_at(&path.parse().unwrap()), None, "for {path}");
        }
        assert!(matches!(
            suite.node_at(&StoragePath::root()),
            Some(SuiteNodeRef::Root(_))
        ));
        assert!(
            suite
                .node_at(&"describes.A".parse().unwrap())
                .and_then(SuiteNodeRef::as_describe)
                .is_some()
        );
    }

    #[test]
    fn spec_serializes_flat() {
        let mut spec = Spec::new(SpecPath::new("a.test.js"));
        let mut test = test_in(&["A"], "t", TestStatus::Pass);
        test.duration = Some(Duration::from_millis(12));
        spec.suite.set_at_path(&names(&["A"]), SuiteNode::Test(test));

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "a.test.js",
                "describes": {
                    "A": {
                        "name": "A",
                        "describes": {},
                        "tests": {
                            "t": {
                                "name": "t",
                                "path": "a.test.js",
                                "blocks": ["A"],
                                "status": "pass",
                                "errors": [],
                                "duration": 12.0,
                            }
                        }
                    }
                },
                "tests": {},
            })
        );
    }
}
