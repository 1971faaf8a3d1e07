// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state and the reducer that maintains it.
//!
//! A [`TestSession`] is the single owner of the current [`SessionState`] snapshot. Inbound
//! [`SandboxMessage`](sandbox_test_protocol::SandboxMessage)s are folded in with [`reduce`], and
//! outbound run commands are issued with [`TestSession::run_all_tests`] and
//! [`TestSession::run_spec`].

mod imp;
mod reducer;
mod state;

pub use imp::*;
pub use reducer::*;
pub use state::*;
