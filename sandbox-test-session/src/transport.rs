// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery of [`RunnerCommand`]s.

use crate::errors::TransportError;
use sandbox_test_protocol::RunnerCommand;
use std::io::Write;
use tracing::debug;

/// A destination for commands sent to the test runner.
pub trait CommandSink {
    /// Delivers a single command. No acknowledgement is awaited.
    fn dispatch(&mut self, command: &RunnerCommand) -> Result<(), TransportError>;
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn dispatch(&mut self, command: &RunnerCommand) -> Result<(), TransportError> {
        (**self).dispatch(command)
    }
}

/// Writes each command as a single line of JSON.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a new sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for JsonLinesSink<W> {
    fn dispatch(&mut self, command: &RunnerCommand) -> Result<(), TransportError> {
        let name = command.name();
        let json = command
            .to_json()
            .map_err(|error| TransportError::Serialize {
                command: name,
                error,
            })?;
        let write_err = |error| TransportError::Write {
            command: name,
            error,
        };
        writeln!(self.writer, "{json}").map_err(write_err)?;
        // The runner reads commands line by line.
        self.writer.flush().map_err(write_err)?;
        debug!(command = name, "dispatched runner command");
        Ok(())
    }
}

/// Keeps every dispatched command in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    commands: Vec<RunnerCommand>,
}

impl RecordingSink {
    /// Creates a new, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the commands dispatched so far, oldest first.
    pub fn commands(&self) -> &[RunnerCommand] {
        &self.commands
    }
}

impl CommandSink for RecordingSink {
    fn dispatch(&mut self, command: &RunnerCommand) -> Result<(), TransportError> {
        self.commands.push(command.clone());
        Ok(())
    }
}
