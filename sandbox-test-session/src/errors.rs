// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by sandbox-test sessions.

use camino::{FromPathBufError, Utf8PathBuf};
use sandbox_test_protocol::SpecPath;
use std::io;
use thiserror::Error;

/// Error returned while parsing a [`StoragePath`](crate::paths::StoragePath) from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid storage path `{input}`: {reason}")]
pub struct StoragePathParseError {
    input: String,
    reason: &'static str,
}

impl StoragePathParseError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// An error that occurred while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file was explicitly specified but does not exist.
    #[error("config file not found at `{path}`")]
    FileNotFound {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// The config file could not be read.
    #[error("failed to read config file `{path}`")]
    Read {
        /// The path of the file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file `{path}`")]
    Parse {
        /// The path of the file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// The default config directory is not valid UTF-8.
    #[error("config directory is not valid UTF-8")]
    NonUtf8Path {
        /// The underlying error.
        #[source]
        error: FromPathBufError,
    },
}

/// An error that occurred while sending a command to the test runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The command could not be serialized.
    #[error("failed to serialize `{command}` command")]
    Serialize {
        /// The wire name of the command.
        command: &'static str,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The command could not be written.
    #[error("failed to write `{command}` command")]
    Write {
        /// The wire name of the command.
        command: &'static str,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error returned by [`TestSession::run_all_tests`](crate::session::TestSession::run_all_tests)
/// or [`TestSession::run_spec`](crate::session::TestSession::run_spec).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunControlError {
    /// A single-spec run was requested, but no file is active.
    #[error("cannot run the active spec: no file is active")]
    NoActiveFile,

    /// A single-spec run was requested, but the active file is not a test file.
    #[error("cannot run `{path}`: not a test file")]
    NotATestFile {
        /// The active file.
        path: SpecPath,
    },

    /// The command could not be delivered to the runner.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// An error that ended a [`SessionDriver`](crate::driver::SessionDriver) run early.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    /// Reading from the event stream failed.
    #[error("failed to read event stream at line {line}")]
    Read {
        /// The 1-based number of the line being read.
        line: u64,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Waiting for Ctrl-C could not be set up.
    #[error("failed to listen for Ctrl-C")]
    Signal {
        /// The underlying error.
        #[source]
        error: io::Error,
    },
}
