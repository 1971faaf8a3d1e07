// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output for session snapshots.

mod displayer;
mod formatters;

pub use displayer::*;
