// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for sandbox-test sessions.
//!
//! ## Config file location
//!
//! If a path is passed in explicitly (`--config` or `SANDBOX_TEST_CONFIG`), that file is loaded
//! and must exist. The special value `none` skips loading user config. Otherwise the file is
//! searched for at `$XDG_CONFIG_HOME/sandbox-test/config.toml`, falling back to
//! `~/.config/sandbox-test/config.toml`.
//!
//! ## Configuration hierarchy
//!
//! Settings are resolved in the following order (highest priority first):
//!
//! 1. CLI arguments (e.g. `--missing-spec=create`)
//! 2. The user config file
//! 3. Built-in defaults

mod discovery;
mod imp;

pub use discovery::*;
pub use imp::*;
