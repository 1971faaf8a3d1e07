// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    ListenerScope, ProtocolAnomaly, ReducerOptions, Reduction, RunMode, ScopeKey, SessionState,
    reduce,
};
use crate::{aggregate::SessionSummary, errors::RunControlError, transport::CommandSink};
use sandbox_test_protocol::{RunnerCommand, SandboxMessage, SpecPath};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options for a [`TestSession`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionOptions {
    /// Whether every test is shown initially, rather than only failures.
    pub verbose: bool,

    /// How messages are folded into the session state.
    pub reducer: ReducerOptions,
}

/// What happened when a message was handled by [`TestSession::handle`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleOutcome {
    /// The message is not related to test results.
    Ignored,

    /// The message was for another file, and was dropped by the single-file filter.
    Filtered,

    /// The message was processed without producing a new snapshot.
    Unchanged,

    /// A new snapshot was produced.
    Updated,

    /// The message couldn't be applied, and was recorded as an anomaly.
    Anomaly,
}

/// A test-results session.
///
/// The session owns the current [`SessionState`] snapshot, and is the only thing that replaces
/// it. Readers take snapshots with [`Self::snapshot`]; a snapshot never changes once taken.
#[derive(Debug)]
pub struct TestSession {
    state: Arc<SessionState>,
    scope: ListenerScope,
    active_file: Option<SpecPath>,
    options: ReducerOptions,
    anomalies: Vec<ProtocolAnomaly>,
}

impl TestSession {
    /// Creates a new session in the initialising state.
    pub fn new(options: SessionOptions) -> Self {
        let state = SessionState::new(options.verbose);
        let scope = ListenerScope::new(ScopeKey {
            run_mode: state.run_mode(),
            active_file: None,
        });
        Self {
            state: Arc::new(state),
            scope,
            active_file: None,
            options: options.reducer,
            anomalies: Vec::new(),
        }
    }

    /// Folds a single inbound message into the session.
    pub fn handle(&mut self, message: &SandboxMessage) -> HandleOutcome {
        match reduce(&self.state, &mut self.scope, message, &self.options) {
            Reduction::Ignored => HandleOutcome::Ignored,
            Reduction::Filtered => HandleOutcome::Filtered,
            Reduction::Unchanged => HandleOutcome::Unchanged,
            Reduction::Updated(next) => {
                self.replace_state(next);
                HandleOutcome::Updated
            }
            Reduction::Anomaly(anomaly) => {
                warn!("ignoring {anomaly}");
                self.anomalies.push(anomaly);
                HandleOutcome::Anomaly
            }
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Starts a run of every test file.
    ///
    /// On success, the session is reset to an empty, running state in [`RunMode::All`].
    pub fn run_all_tests(&mut self, sink: &mut impl CommandSink) -> Result<(), RunControlError> {
        sink.dispatch(&RunnerCommand::RunAllTests)?;
        self.replace_state(self.state.for_new_run(RunMode::All));
        Ok(())
    }

    /// Starts a run of the active file.
    ///
    /// On success, the session is reset to an empty, running state in [`RunMode::Single`].
    /// Returns [`RunControlError::NoActiveFile`] if no file is active, and
    /// [`RunControlError::NotATestFile`] if the active file isn't a test file.
    pub fn run_spec(&mut self, sink: &mut impl CommandSink) -> Result<(), RunControlError> {
        let path = self
            .active_file
            .clone()
            .ok_or(RunControlError::NoActiveFile)?;
        if !path.is_test_file() {
            return Err(RunControlError::NotATestFile { path });
        }
        sink.dispatch(&RunnerCommand::RunTests { path })?;
        self.replace_state(self.state.for_new_run(RunMode::Single));
        Ok(())
    }

    /// Returns the active file, if any.
    pub fn active_file(&self) -> Option<&SpecPath> {
        self.active_file.as_ref()
    }

    /// Sets the active file.
    ///
    /// Changing the active file discards the listener's describe-block tracking.
    pub fn set_active_file(&mut self, path: Option<SpecPath>) {
        self.active_file = path;
        self.resubscribe_if_needed();
    }

    /// Makes `path` the active file. Used when navigating to a spec from the results tree.
    pub fn open_spec(&mut self, path: SpecPath) {
        self.set_active_file(Some(path));
    }

    /// Returns true if the active file is a test file, so [`Self::run_spec`] can run it.
    pub fn is_spec_open(&self) -> bool {
        self.active_file.as_ref().is_some_and(SpecPath::is_test_file)
    }

    /// Flips whether every test is shown, rather than only failures.
    pub fn toggle_verbose(&mut self) {
        let next = SessionState {
            verbose: !self.state.verbose(),
            ..SessionState::clone(&self.state)
        };
        self.replace_state(next);
    }

    /// Returns every anomaly recorded so far, oldest first.
    pub fn anomalies(&self) -> &[ProtocolAnomaly] {
        &self.anomalies
    }

    /// Computes roll-up statistics for the current snapshot.
    pub fn summary(&self) -> SessionSummary {
        self.state.summary()
    }

    /// Returns how many times the message listener has been resubscribed.
    pub fn listener_generation(&self) -> u64 {
        self.scope.generation()
    }

    fn replace_state(&mut self, next: SessionState) {
        if next.status() != self.state.status() {
            debug!(from = %self.state.status(), to = %next.status(), "session status changed");
        }
        self.state = Arc::new(next);
        self.resubscribe_if_needed();
    }

    fn resubscribe_if_needed(&mut self) {
        let key = ScopeKey {
            run_mode: self.state.run_mode(),
            active_file: self.active_file.clone(),
        };
        if *self.scope.key() != key {
            debug!(
                run_mode = %key.run_mode,
                active_file = ?key.active_file.as_ref().map(SpecPath::as_str),
                generation = self.scope.generation() + 1,
                "resubscribing message listener",
            );
            self.scope.resubscribe(key);
        }
    }
}
