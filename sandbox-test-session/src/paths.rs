// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for describing where a node lives inside a spec's suite tree.
//!
//! A test nested as `describe("A", () => describe("B", () => it("t")))` is stored under
//! `describes.A.describes.B.tests.t`. [`StoragePath`] is the typed form of that key.

use crate::errors::StoragePathParseError;
use std::{fmt, str::FromStr};

/// Splits a sequence into everything but the last element, and the last element.
///
/// Returns `None` as the tail for an empty sequence: a test or describe block with no enclosing
/// blocks lives directly at the spec root.
pub fn split_tail<T>(items: &[T]) -> (&[T], Option<&T>) {
    match items.split_last() {
        Some((last, init)) => (init, Some(last)),
        None => (items, None),
    }
}

/// Expands each item into zero or more outputs and concatenates the results in order.
pub fn flat_map<T, U, I>(items: &[T], expand: impl FnMut(&T) -> I) -> Vec<U>
where
    I: IntoIterator<Item = U>,
{
    items.iter().flat_map(expand).collect()
}

/// One segment of a [`StoragePath`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum StorageSegment {
    /// Selects the `describes` container of the current node.
    Describes,

    /// Selects the `tests` container of the current node.
    Tests,

    /// Selects a named entry within a container.
    Name(String),
}

impl StorageSegment {
    const DESCRIBES: &'static str = "describes";
    const TESTS: &'static str = "tests";
}

/// The location of a node within a spec, relative to the spec root.
///
/// Segments alternate between a container selector and a name, e.g.
/// `describes.A.describes.B.tests.t`. Names containing `.` are not escaped in the display
/// form, so [`FromStr`] only round-trips names without dots.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StoragePath {
    segments: Vec<StorageSegment>,
}

impl StoragePath {
    /// Returns the path of the describe block identified by `blocks`, outermost first.
    ///
    /// Returns the empty (root) path if `blocks` is empty.
    pub fn for_describe(blocks: &[String]) -> Self {
        let (ancestors, leaf) = split_tail(blocks);
        let Some(leaf) = leaf else {
            return Self::root();
        };
        let mut segments = vec![StorageSegment::Describes];
        segments.extend(Self::ancestor_segments(ancestors));
        segments.push(StorageSegment::Name(leaf.clone()));
        Self { segments }
    }

    /// Returns the path of the test `name` nested inside `blocks`.
    pub fn for_test(blocks: &[String], name: &str) -> Self {
        let mut segments = Self::for_describe(blocks).segments;
        segments.push(StorageSegment::Tests);
        segments.push(StorageSegment::Name(name.to_owned()));
        Self { segments }
    }

    /// Returns the root path.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[StorageSegment] {
        &self.segments
    }

    /// Returns true if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    // Each ancestor expands to its name followed by the `describes` selector of that block.
    fn ancestor_segments(ancestors: &[String]) -> Vec<StorageSegment> {
        flat_map(ancestors, |name| {
            [
                StorageSegment::Name(name.clone()),
                StorageSegment::Describes,
            ]
        })
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            match segment {
                StorageSegment::Describes => f.write_str(StorageSegment::DESCRIBES)?,
                StorageSegment::Tests => f.write_str(StorageSegment::TESTS)?,
                StorageSegment::Name(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

impl FromStr for StoragePath {
    type Err = StoragePathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let error = |reason| StoragePathParseError::new(s, reason);

        let mut segments = Vec::new();
        let mut parts = s.split('.');
        while let Some(selector) = parts.next() {
            let selector = match selector {
                StorageSegment::DESCRIBES => StorageSegment::Describes,
                StorageSegment::TESTS => StorageSegment::Tests,
                _ => return Err(error("expected `describes` or `tests`")),
            };
            let is_tests = selector == StorageSegment::Tests;
            segments.push(selector);
            match parts.next() {
                Some("") | None => return Err(error("expected a name after a selector")),
                Some(name) => segments.push(StorageSegment::Name(name.to_owned())),
            }
            // Nothing can be nested inside a test.
            if is_tests && parts.clone().next().is_some() {
                return Err(error("tests cannot contain other nodes"));
            }
        }

        Ok(Self { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn blocks(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    #[test]
    fn split_tail_cases() {
        let empty: [u32; 0] = [];
        assert_eq!(split_tail(&empty), (&[][..], None));
        assert_eq!(split_tail(&[1]), (&[][..], Some(&1)));
        assert_eq!(split_tail(&[1, 2, 3]), (&[1, 2][..], Some(&3)));
    }

    #[test]
    fn flat_map_alternates() {
        let expanded = flat_map(&["A", "B"], |name| [name.to_string(), "describes".to_owned()]);
        assert_eq!(expanded, ["A", "describes", "B", "describes"]);

        let nothing: Vec<u8> = flat_map(&[1, 2], |_| None);
        assert!(nothing.is_empty());
    }

    #[test_case(&[], "t", "tests.t"; "root test")]
    #[test_case(&["A"], "t", "describes.A.tests.t"; "one level")]
    #[test_case(&["A", "B"], "t", "describes.A.describes.B.tests.t"; "two levels")]
    #[test_case(&["A", "B", "C"], "t", "describes.A.describes.B.describes.C.tests.t"; "three levels")]
    fn test_paths(names: &[&str], test: &str, expected: &str) {
        let path = StoragePath::for_test(&blocks(names), test);
        assert_eq!(path.to_string(), expected);
        assert_eq!(expected.parse::<StoragePath>().unwrap(), path);
    }

    #[test_case(&[], ""; "root")]
    #[test_case(&["A"], "describes.A"; "one level")]
    #[test_case(&["A", "B"], "describes.A.describes.B"; "two levels")]
    fn describe_paths(names: &[&str], expected: &str) {
        let path = StoragePath::for_describe(&blocks(names));
        assert_eq!(path.to_string(), expected);
        assert_eq!(path.is_root(), names.is_empty());
        assert_eq!(expected.parse::<StoragePath>().unwrap(), path);
    }

    #[test_case("describes"; "selector without name")]
    #[test_case("describes."; "empty name")]
    #[test_case("A.tests.t"; "name without selector")]
    #[test_case("tests.t.describes.A"; "node under a test")]
    #[test_case("suites.A"; "unknown selector")]
    fn invalid_paths(input: &str) {
        input
            .parse::<StoragePath>()
            .expect_err("path should be invalid");
    }
}
