// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `sandbox-test` failures.
///
/// `sandbox-test` runs in a variety of situations, and it is useful for callers to tell apart
/// failing tests from problems with `sandbox-test` itself. These codes are stable across
/// releases.
///
/// Panics and other unexpected errors exit with code 101.
pub enum SandboxTestExitCode {}

impl SandboxTestExitCode {
    /// No errors occurred, and no tests failed.
    pub const OK: i32 = 0;

    /// One or more tests, or whole test files, failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Setting up the session failed, e.g. because the config file is invalid.
    pub const SETUP_ERROR: i32 = 96;

    /// Reading the event stream or writing output failed.
    pub const IO_ERROR: i32 = 97;
}
