// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{ErrorStyles, NO_HEADING_TARGET};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use sandbox_test_protocol::{SandboxTestExitCode, SpecPath};
use sandbox_test_session::errors::{ConfigError, DriverError, RunControlError};
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected failure of `sandbox-test`.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config error")]
    ConfigError {
        #[from]
        err: ConfigError,
    },
    #[error("no active file")]
    NoActiveFile,
    #[error("active file is not a test file")]
    NotATestFile { path: SpecPath },
    #[error("failed to open event stream")]
    InputOpenError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to build async runtime")]
    RuntimeBuildError {
        #[source]
        err: std::io::Error,
    },
    #[error("driver error")]
    DriverError {
        #[from]
        err: DriverError,
    },
    #[error("failed to send run command")]
    RunControlError {
        #[source]
        err: RunControlError,
    },
    #[error("failed to serialize output")]
    SerializeError {
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to write output")]
    WriteError {
        #[source]
        err: std::io::Error,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn run_control(err: RunControlError) -> Self {
        match err {
            RunControlError::NoActiveFile => Self::NoActiveFile,
            RunControlError::NotATestFile { path } => Self::NotATestFile { path },
            err => Self::RunControlError { err },
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigError { .. }
            | Self::NoActiveFile
            | Self::NotATestFile { .. }
            | Self::RuntimeBuildError { .. } => SandboxTestExitCode::SETUP_ERROR,
            Self::InputOpenError { .. }
            | Self::DriverError { .. }
            | Self::RunControlError { .. }
            | Self::SerializeError { .. }
            | Self::WriteError { .. } => SandboxTestExitCode::IO_ERROR,
            Self::TestRunFailed => SandboxTestExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &ErrorStyles) {
        let mut next_error = match self {
            Self::ConfigError { err } => {
                error!("failed to load config");
                Some(err as &dyn Error)
            }
            Self::NoActiveFile => {
                error!(
                    "running a single spec requires {}",
                    "--active-file".style(styles.highlight)
                );
                None
            }
            Self::NotATestFile { path } => {
                error!(
                    "`{}` is not a test file (expected a name matching `{}`)",
                    path.style(styles.path),
                    SpecPath::TEST_FILE_PATTERN,
                );
                None
            }
            Self::InputOpenError { path, err } => {
                error!("failed to open event stream at `{}`", path.style(styles.path));
                Some(err as &dyn Error)
            }
            Self::RuntimeBuildError { err } => {
                error!("failed to build async runtime");
                Some(err as &dyn Error)
            }
            Self::DriverError { err } => {
                error!("{err}");
                err.source()
            }
            Self::RunControlError { err } => {
                error!("{err}");
                err.source()
            }
            Self::SerializeError { err } => {
                error!("failed to serialize session state");
                Some(err as &dyn Error)
            }
            Self::WriteError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
