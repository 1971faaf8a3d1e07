// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Session state for a results panel observing a sandboxed test runner.
//!
//! The runner reports progress as a stream of
//! [`SandboxMessage`](sandbox_test_protocol::SandboxMessage)s. A [`session::TestSession`] folds
//! them into an immutable [`session::SessionState`] snapshot: a forest of [`tree::Spec`]s
//! mirroring the `describe()`/`it()` structure of each test file.
//!
//! ```
//! use sandbox_test_protocol::SandboxMessage;
//! use sandbox_test_session::session::{SessionOptions, TestSession};
//!
//! let mut session = TestSession::new(SessionOptions::default());
//! for line in [
//!     r#"{"type": "test", "event": "add_file", "path": "x.test.js"}"#,
//!     r#"{"type": "test", "event": "add_test", "testName": "works", "path": "x.test.js"}"#,
//! ] {
//!     session.handle(&SandboxMessage::from_json(line).unwrap());
//! }
//! assert_eq!(session.summary().tests.total, 1);
//! ```

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod errors;
pub mod paths;
pub mod reporter;
pub mod session;
pub mod transport;
pub mod tree;
