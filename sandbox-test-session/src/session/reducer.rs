// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The state machine that folds runner messages into a [`SessionState`].

use super::{ListenerScope, RunMode, SessionState, SessionStatus};
use crate::{
    paths::{StoragePath, split_tail},
    tree::{DescribeBlock, Spec, SuiteNode, Test},
};
use indexmap::IndexMap;
use sandbox_test_protocol::{ActionMessage, SandboxMessage, SpecPath, TestEvent};
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::trace;

/// What to do with an event that refers to a spec the session doesn't know about.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingSpecPolicy {
    /// Leave the state unchanged and record a [`ProtocolAnomaly`].
    #[default]
    Discard,

    /// Create an empty spec for the path, then apply the event to it.
    Create,
}

/// Settings that affect how messages are reduced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReducerOptions {
    /// What to do with events for unknown specs.
    pub missing_spec: MissingSpecPolicy,

    /// The `source` of `clear-errors` actions sent by the test runner.
    pub runner_source: String,
}

impl ReducerOptions {
    /// The source the bundled runner uses for its `clear-errors` actions.
    pub const DEFAULT_RUNNER_SOURCE: &'static str = "jest";
}

impl Default for ReducerOptions {
    fn default() -> Self {
        Self {
            missing_spec: MissingSpecPolicy::default(),
            runner_source: Self::DEFAULT_RUNNER_SOURCE.to_owned(),
        }
    }
}

/// The result of reducing a single message.
#[derive(Clone, Debug, PartialEq)]
pub enum Reduction {
    /// The message is not related to test results.
    Ignored,

    /// The message was for a file other than the active one, and the session is in
    /// [`RunMode::Single`].
    Filtered,

    /// The message was handled, but the session state did not change. The listener scope may
    /// have changed.
    Unchanged,

    /// The message produced a new session state.
    Updated(SessionState),

    /// The message couldn't be applied. The session state did not change.
    Anomaly(ProtocolAnomaly),
}

/// An event that referred to state the session doesn't have.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolAnomaly {
    /// The wire name of the event.
    pub event: &'static str,

    /// What was missing.
    pub kind: AnomalyKind,

    /// Where inside the spec the event would have been applied, if known.
    pub storage_path: Option<StoragePath>,
}

/// The kind of a [`ProtocolAnomaly`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AnomalyKind {
    /// The event referred to a spec that was never added, or has been removed.
    UnknownSpec {
        /// The path of the spec.
        path: SpecPath,
    },

    /// A describe block was opened before the runner marked any spec as active.
    NoCurrentSpec,
}

impl fmt::Display for ProtocolAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AnomalyKind::UnknownSpec { path } => {
                write!(f, "{} for unknown spec `{path}`", self.event)?;
            }
            AnomalyKind::NoCurrentSpec => {
                write!(f, "{} with no active spec", self.event)?;
            }
        }
        if let Some(storage_path) = &self.storage_path {
            write!(f, " (at `{storage_path}`)")?;
        }
        Ok(())
    }
}

/// Folds `message` into `state`.
///
/// This is a pure function of its inputs: `state` is never modified, and any change is returned
/// as a new [`SessionState`] in [`Reduction::Updated`]. `scope` carries listener-local tracking
/// (open describe blocks, the runner's current spec) and is updated in place.
///
/// If the listener was subscribed in [`RunMode::Single`], messages scoped to any file other than
/// the listener's active file are discarded before anything else happens.
pub fn reduce(
    state: &SessionState,
    scope: &mut ListenerScope,
    message: &SandboxMessage,
    options: &ReducerOptions,
) -> Reduction {
    if scope.key().run_mode == RunMode::Single
        && let Some(path) = message.scope_path()
        && Some(path) != scope.key().active_file.as_ref()
    {
        return Reduction::Filtered;
    }

    match message {
        SandboxMessage::Action(ActionMessage::ClearErrors { source, path }) => {
            if *source != options.runner_source {
                return Reduction::Ignored;
            }
            scope.current_spec = path.clone();
            Reduction::Unchanged
        }
        SandboxMessage::Action(ActionMessage::Other) | SandboxMessage::Other => {
            Reduction::Ignored
        }
        SandboxMessage::Test(event) => reduce_test_event(state, scope, event, options),
    }
}

fn reduce_test_event(
    state: &SessionState,
    scope: &mut ListenerScope,
    event: &TestEvent,
    options: &ReducerOptions,
) -> Reduction {
    match event {
        TestEvent::InitializeTests => {
            scope.reset_tracking();
            Reduction::Updated(SessionState {
                specs: IndexMap::new(),
                status: SessionStatus::Idle,
                run_mode: state.run_mode,
                verbose: state.verbose,
            })
        }
        TestEvent::TestCount { .. } => Reduction::Unchanged,
        TestEvent::TotalTestStart => {
            scope.ancestry.clear();
            Reduction::Updated(SessionState {
                status: SessionStatus::Running,
                ..state.clone()
            })
        }
        TestEvent::TotalTestEnd => Reduction::Updated(SessionState {
            status: SessionStatus::Complete,
            run_mode: RunMode::All,
            ..state.clone()
        }),
        TestEvent::AddFile { path } => {
            let mut next = state.clone();
            next.specs
                .insert(path.clone(), Arc::new(Spec::new(path.clone())));
            Reduction::Updated(next)
        }
        TestEvent::RemoveFile { path } => {
            if !state.specs.contains_key(path) {
                return Reduction::Unchanged;
            }
            let mut next = state.clone();
            next.specs.shift_remove(path);
            Reduction::Updated(next)
        }
        TestEvent::FileError { path, error } => {
            update_spec(state, event, path, None, options, |spec| {
                spec.error = Some(error.clone());
            })
        }
        TestEvent::DescribeStart { block_name } => {
            scope.ancestry.push(block_name.clone());
            let (ancestors, leaf) = split_tail(scope.ancestry.as_slice());
            // The block was just pushed, so there is always a leaf.
            let Some(leaf) = leaf else {
                return Reduction::Unchanged;
            };
            let storage_path = StoragePath::for_describe(scope.ancestry.as_slice());
            let Some(current_spec) = &scope.current_spec else {
                return Reduction::Anomaly(ProtocolAnomaly {
                    event: event.name(),
                    kind: AnomalyKind::NoCurrentSpec,
                    storage_path: Some(storage_path),
                });
            };
            update_spec(
                state,
                event,
                current_spec,
                Some(storage_path),
                options,
                |spec| {
                    spec.suite
                        .set_at_path(ancestors, SuiteNode::Describe(DescribeBlock::new(leaf)));
                },
            )
        }
        TestEvent::DescribeEnd => {
            scope.ancestry.pop();
            Reduction::Unchanged
        }
        TestEvent::AddTest { test_name, path } => {
            let test = Test::declared(
                test_name.clone(),
                path.clone(),
                scope.ancestry.as_slice().to_vec(),
            );
            insert_test(state, event, test, options)
        }
        TestEvent::TestStart { test } => insert_test(state, event, Test::started(test), options),
        TestEvent::TestEnd { test } => insert_test(state, event, Test::finished(test), options),
    }
}

fn insert_test(
    state: &SessionState,
    event: &TestEvent,
    test: Test,
    options: &ReducerOptions,
) -> Reduction {
    let storage_path = test.storage_path();
    let path = test.path.clone();
    trace!(spec = %path, %storage_path, status = ?test.status, "{}", event.name());
    update_spec(state, event, &path, Some(storage_path), options, |spec| {
        let blocks = test.blocks.clone();
        spec.suite.set_at_path(&blocks, SuiteNode::Test(test));
    })
}

/// Applies `f` to a copy of the spec at `path`, honoring the missing-spec policy.
fn update_spec(
    state: &SessionState,
    event: &TestEvent,
    path: &SpecPath,
    storage_path: Option<StoragePath>,
    options: &ReducerOptions,
    f: impl FnOnce(&mut Spec),
) -> Reduction {
    if !state.specs.contains_key(path) && options.missing_spec == MissingSpecPolicy::Discard {
        return Reduction::Anomaly(ProtocolAnomaly {
            event: event.name(),
            kind: AnomalyKind::UnknownSpec { path: path.clone() },
            storage_path,
        });
    }

    let mut next = state.clone();
    let spec = next
        .specs
        .entry(path.clone())
        .or_insert_with(|| Arc::new(Spec::new(path.clone())));
    f(Arc::make_mut(spec));
    Reduction::Updated(next)
}
