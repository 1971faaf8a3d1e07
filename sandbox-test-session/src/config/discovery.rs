// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigError;
use camino::Utf8PathBuf;
use etcetera::{BaseStrategy, HomeDirError, base_strategy::Xdg};

/// Returns the default location of the user config file.
///
/// This is `$XDG_CONFIG_HOME/sandbox-test/config.toml`, or
/// `~/.config/sandbox-test/config.toml` if `XDG_CONFIG_HOME` is unset. The same path is used on
/// every platform.
///
/// Returns `Ok(None)` if the home directory can't be determined.
pub fn default_config_path() -> Result<Option<Utf8PathBuf>, ConfigError> {
    let strategy = match Xdg::new() {
        Ok(strategy) => strategy,
        Err(HomeDirError) => return Ok(None),
    };

    let config_path = strategy.config_dir().join("sandbox-test").join("config.toml");
    Utf8PathBuf::try_from(config_path)
        .map(Some)
        .map_err(|error| ConfigError::NonUtf8Path { error })
}
