// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{aggregate::SessionSummary, tree::Spec};
use indexmap::IndexMap;
use sandbox_test_protocol::SpecPath;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// The overall status of a test session.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The runner has not reported in yet.
    Initialising,

    /// The runner is ready, and no run is in progress.
    Idle,

    /// A run is in progress.
    Running,

    /// The last run finished.
    Complete,
}

impl SessionStatus {
    /// Returns true if the presentation layer should show a loading indicator.
    pub fn is_loading(self) -> bool {
        match self {
            SessionStatus::Initialising | SessionStatus::Running => true,
            SessionStatus::Idle | SessionStatus::Complete => false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Initialising => "initialising",
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Which files a test run targets.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Every test file. Events for any file are accepted.
    #[default]
    All,

    /// Only the active file. Events scoped to other files are discarded.
    Single,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::All => f.write_str("all"),
            RunMode::Single => f.write_str("single"),
        }
    }
}

/// An immutable snapshot of a test session.
///
/// Snapshots are shared as `Arc<SessionState>`. Every update produces a new snapshot; specs that
/// an update doesn't touch are shared between the old and new snapshots.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionState {
    pub(crate) specs: IndexMap<SpecPath, Arc<Spec>>,
    pub(crate) status: SessionStatus,
    pub(crate) run_mode: RunMode,
    pub(crate) verbose: bool,
}

impl SessionState {
    /// Creates the state of a freshly mounted session.
    pub fn new(verbose: bool) -> Self {
        Self {
            specs: IndexMap::new(),
            status: SessionStatus::Initialising,
            run_mode: RunMode::All,
            verbose,
        }
    }

    /// Returns the specs in the order they were first added.
    pub fn specs(&self) -> impl ExactSizeIterator<Item = &Spec> + Clone + '_ {
        self.specs.values().map(|spec| &**spec)
    }

    /// Returns the spec for `path`, if any.
    pub fn spec(&self, path: &str) -> Option<&Spec> {
        self.specs.get(path).map(|spec| &**spec)
    }

    /// Returns the session status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the current run mode.
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Returns true if every test should be shown, not just failures.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Computes roll-up statistics for this snapshot.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::new(self.specs())
    }

    /// Returns the state a new run starts from: no specs, running, in the given mode.
    pub(crate) fn for_new_run(&self, run_mode: RunMode) -> Self {
        Self {
            specs: IndexMap::new(),
            status: SessionStatus::Running,
            run_mode,
            verbose: self.verbose,
        }
    }
}

/// The stack of currently open describe blocks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ancestry {
    blocks: Vec<String>,
}

impl Ancestry {
    /// Opens a describe block.
    pub fn push(&mut self, name: impl Into<String>) {
        self.blocks.push(name.into());
    }

    /// Closes the innermost describe block, returning its name.
    ///
    /// Returns `None` if no block is open.
    pub fn pop(&mut self) -> Option<String> {
        self.blocks.pop()
    }

    /// Closes every open describe block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Returns the open blocks, outermost first.
    pub fn as_slice(&self) -> &[String] {
        &self.blocks
    }

    /// Returns the number of open blocks.
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }
}

/// The inputs a message listener is subscribed with.
///
/// When either changes, the listener is torn down and subscribed afresh.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScopeKey {
    /// The run mode at subscription time.
    pub run_mode: RunMode,

    /// The active file at subscription time.
    pub active_file: Option<SpecPath>,
}

/// Transient state owned by a single listener subscription.
///
/// None of this is part of [`SessionState`]: it tracks where in the event stream the listener
/// is, and is discarded whenever the listener is resubscribed.
#[derive(Clone, Debug)]
pub struct ListenerScope {
    pub(crate) ancestry: Ancestry,
    pub(crate) current_spec: Option<SpecPath>,
    key: ScopeKey,
    generation: u64,
}

impl ListenerScope {
    /// Creates the first subscription.
    pub fn new(key: ScopeKey) -> Self {
        Self {
            ancestry: Ancestry::default(),
            current_spec: None,
            key,
            generation: 0,
        }
    }

    /// Tears down this subscription and replaces it with a fresh one for `key`.
    ///
    /// All tracking is discarded, and the generation is bumped.
    pub fn resubscribe(&mut self, key: ScopeKey) {
        *self = Self {
            ancestry: Ancestry::default(),
            current_spec: None,
            key,
            generation: self.generation + 1,
        };
    }

    /// Returns the inputs this subscription was created with.
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// Returns how many times the listener has been resubscribed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the open describe blocks.
    pub fn ancestry(&self) -> &Ancestry {
        &self.ancestry
    }

    /// Returns the spec most recently marked active by the runner.
    pub fn current_spec(&self) -> Option<&SpecPath> {
        self.current_spec.as_ref()
    }

    pub(crate) fn reset_tracking(&mut self) {
        self.ancestry.clear();
        self.current_spec = None;
    }
}
