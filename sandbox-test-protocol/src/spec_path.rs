// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// The path of a test file inside the sandbox, for example `/src/sum.test.js`.
///
/// A `SpecPath` is an opaque identifier: two paths are the same spec if and only if their strings
/// are equal. No normalization is performed, because the runner and the editor agree on the
/// exact form.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecPath(SmolStr);

impl SpecPath {
    /// The file names [`is_test_file`](Self::is_test_file) accepts, as a regular expression.
    pub const TEST_FILE_PATTERN: &'static str = r".*\.(test|spec)\.[tj]sx?$";

    /// Creates a new `SpecPath`.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(SmolStr::new(path))
    }

    /// Returns the path as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns true if this looks like a test file the runner will pick up.
    ///
    /// Matches `*.test.{js,jsx,ts,tsx}` and `*.spec.{js,jsx,ts,tsx}`.
    pub fn is_test_file(&self) -> bool {
        let Some((stem, ext)) = self.0.rsplit_once('.') else {
            return false;
        };
        if !matches!(ext, "js" | "jsx" | "ts" | "tsx") {
            return false;
        }
        stem.ends_with(".test") || stem.ends_with(".spec")
    }
}

impl fmt::Display for SpecPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for SpecPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for SpecPath {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for SpecPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SpecPath {
    fn from(path: String) -> Self {
        Self(SmolStr::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/src/sum.test.js", true; "js test")]
    #[test_case("/src/App.spec.tsx", true; "tsx spec")]
    #[test_case("button.test.ts", true; "bare ts test")]
    #[test_case("/src/sum.js", false; "plain source file")]
    #[test_case("/src/sum.test.mjs", false; "unsupported extension")]
    #[test_case("/src/test.js", false; "test is the stem, not a suffix")]
    #[test_case("README", false; "no extension")]
    fn test_file_detection(input: &str, expected: bool) {
        assert_eq!(SpecPath::new(input).is_test_file(), expected, "for {input}");
    }

    #[test]
    fn serde_is_transparent() {
        let path = SpecPath::new("/src/x.test.js");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""/src/x.test.js""#);
        let back: SpecPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
