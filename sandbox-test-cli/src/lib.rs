// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line frontend for sandboxed JavaScript test runs.
//!
//! `sandbox-test replay` folds a recorded event stream into a results tree and prints it.
//! `sandbox-test listen` sends a run command and then consumes events live from standard input.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
