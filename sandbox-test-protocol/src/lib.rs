// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Message types exchanged between a sandboxed test runner and the results panel that observes it.
//!
//! The runner lives inside an isolated execution environment (typically an iframe) and reports
//! progress over a shared message channel. Inbound messages are modelled by [`SandboxMessage`];
//! the two commands a results panel can send back are modelled by [`RunnerCommand`].
//!
//! Parse a single message with [`SandboxMessage::from_json`]:
//!
//! ```
//! use sandbox_test_protocol::{SandboxMessage, TestEvent};
//!
//! let message = SandboxMessage::from_json(
//!     r#"{"type": "test", "event": "add_file", "path": "/src/x.test.js"}"#,
//! )
//! .unwrap();
//! assert!(matches!(message, SandboxMessage::Test(TestEvent::AddFile { .. })));
//! ```

mod commands;
mod errors;
mod exit_codes;
mod messages;
#[cfg(feature = "proptest1")]
mod proptest_helpers;
mod spec_path;

pub use commands::*;
pub use errors::*;
pub use exit_codes::*;
pub use messages::*;
pub use spec_path::*;
