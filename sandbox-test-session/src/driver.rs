// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feeding a [`TestSession`] from a stream of newline-delimited JSON messages.

use crate::{
    errors::DriverError,
    session::{HandleOutcome, TestSession},
};
use sandbox_test_protocol::SandboxMessage;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// The kind of signal handling to set up for a [`SessionDriver`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SignalHandlerKind {
    /// Stop reading when Ctrl-C is pressed.
    #[default]
    Standard,

    /// Don't handle signals. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    async fn wait(self) -> io::Result<()> {
        match self {
            SignalHandlerKind::Standard => tokio::signal::ctrl_c().await,
            SignalHandlerKind::Noop => std::future::pending().await,
        }
    }
}

/// Counters collected by [`SessionDriver::run`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DriverReport {
    /// Lines read, including blank and malformed ones.
    pub lines: u64,

    /// Messages that were applied to the session.
    pub handled: u64,

    /// Messages dropped by the single-file filter.
    pub filtered: u64,

    /// Messages unrelated to test results.
    pub ignored: u64,

    /// Lines that could not be parsed.
    pub malformed: u64,

    /// Messages recorded as protocol anomalies.
    pub anomalies: u64,

    /// True if reading stopped because of Ctrl-C rather than end of input.
    pub interrupted: bool,
}

/// Reads messages from a stream and applies them to a [`TestSession`].
///
/// Each line of input is one JSON message. Lines that fail to parse are logged and skipped.
#[derive(Debug)]
pub struct SessionDriver<'a> {
    session: &'a mut TestSession,
    signal_handler: SignalHandlerKind,
}

impl<'a> SessionDriver<'a> {
    /// Creates a new driver for `session`.
    pub fn new(session: &'a mut TestSession) -> Self {
        Self {
            session,
            signal_handler: SignalHandlerKind::default(),
        }
    }

    /// Sets the kind of signal handling to use.
    pub fn set_signal_handler(&mut self, kind: SignalHandlerKind) -> &mut Self {
        self.signal_handler = kind;
        self
    }

    /// Reads `reader` until end of input, or until interrupted.
    ///
    /// Only I/O failures end the run early: malformed lines and messages that can't be applied
    /// are counted in the returned report.
    pub async fn run<R>(&mut self, reader: R) -> Result<DriverReport, DriverError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut report = DriverReport::default();
        let interrupt = self.signal_handler.wait();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                res = &mut interrupt => {
                    res.map_err(|error| DriverError::Signal { error })?;
                    info!("interrupted, stopping after {} lines", report.lines);
                    report.interrupted = true;
                    break;
                }
                line = lines.next_line() => {
                    let line_number = report.lines + 1;
                    let line = line.map_err(|error| DriverError::Read {
                        line: line_number,
                        error,
                    })?;
                    match line {
                        Some(line) => {
                            report.lines = line_number;
                            self.handle_line(line_number, &line, &mut report);
                        }
                        None => {
                            debug!("end of input after {} lines", report.lines);
                            break;
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    fn handle_line(&mut self, line_number: u64, line: &str, report: &mut DriverReport) {
        if line.trim().is_empty() {
            return;
        }

        let message = match SandboxMessage::from_json(line) {
            Ok(message) => message,
            Err(error) => {
                warn!("skipping malformed message on line {line_number}: {error}");
                report.malformed += 1;
                return;
            }
        };

        match self.session.handle(&message) {
            HandleOutcome::Updated | HandleOutcome::Unchanged => report.handled += 1,
            HandleOutcome::Filtered => report.filtered += 1,
            HandleOutcome::Ignored => report.ignored += 1,
            HandleOutcome::Anomaly => report.anomalies += 1,
        }
    }
}
