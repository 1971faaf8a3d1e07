// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::discovery::default_config_path;
use crate::{
    errors::ConfigError,
    session::{MissingSpecPolicy, ReducerOptions, SessionOptions},
};
use camino::Utf8Path;
use serde::Deserialize;
use std::{collections::BTreeSet, io};
use tracing::{debug, warn};

/// Special value for `--config` and `SANDBOX_TEST_CONFIG` that skips loading user config.
pub const CONFIG_NONE: &str = "none";

/// Where to load configuration from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigLocation<'a> {
    /// Look for the user config file at its default location.
    Default,

    /// Use only built-in defaults.
    Isolated,

    /// Load the config file at this path. The file must exist.
    Explicit(&'a Utf8Path),
}

impl<'a> ConfigLocation<'a> {
    /// Creates a location from the value of a CLI argument or environment variable.
    ///
    /// Returns `Default` if `None`, `Isolated` if `"none"`, otherwise `Explicit` with the path.
    pub fn from_cli_or_env(s: Option<&'a str>) -> Self {
        match s {
            None => Self::Default,
            Some(s) if s == CONFIG_NONE => Self::Isolated,
            Some(s) => Self::Explicit(Utf8Path::new(s)),
        }
    }
}

/// Resolved configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionConfig {
    /// Session behavior.
    pub session: SessionSettings,

    /// Output preferences.
    pub display: DisplaySettings,
}

/// The `[session]` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionSettings {
    /// Whether every test is shown, rather than only failures.
    pub verbose: bool,

    /// What to do with events for unknown specs.
    pub missing_spec: MissingSpecPolicy,

    /// The source of `clear-errors` actions sent by the test runner.
    pub runner_source: String,
}

/// The `[display]` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplaySettings {
    /// Whether test durations are shown.
    pub show_durations: bool,
}

impl SessionConfig {
    /// Loads configuration from `location`, layered over the built-in defaults.
    pub fn load(location: ConfigLocation<'_>) -> Result<Self, ConfigError> {
        Self::load_with_warnings(location, &mut DefaultConfigWarnings)
    }

    /// Returns the built-in defaults.
    pub fn defaults() -> Self {
        Self::resolve(DefaultConfig::from_embedded(), None)
    }

    /// Returns options for a [`TestSession`](crate::session::TestSession).
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            verbose: self.session.verbose,
            reducer: ReducerOptions {
                missing_spec: self.session.missing_spec,
                runner_source: self.session.runner_source.clone(),
            },
        }
    }

    fn load_with_warnings(
        location: ConfigLocation<'_>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigError> {
        let user_config = DeserializedConfig::from_location(location, warnings)?;
        Ok(Self::resolve(DefaultConfig::from_embedded(), user_config))
    }

    fn resolve(defaults: DefaultConfig, user: Option<DeserializedConfig>) -> Self {
        let user = user.unwrap_or_default();
        Self {
            session: SessionSettings {
                verbose: user.session.verbose.unwrap_or(defaults.session.verbose),
                missing_spec: user
                    .session
                    .missing_spec
                    .unwrap_or(defaults.session.missing_spec),
                runner_source: user
                    .session
                    .runner_source
                    .unwrap_or(defaults.session.runner_source),
            },
            display: DisplaySettings {
                show_durations: user
                    .display
                    .show_durations
                    .unwrap_or(defaults.display.show_durations),
            },
        }
    }
}

/// Handles warnings produced while loading configuration.
trait ConfigWarnings {
    /// Called with the unknown keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs warnings with `tracing`.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        for key in unknown {
            warn!("ignoring unknown key `{key}` in {config_file}");
        }
    }
}

/// The user config file. Every setting is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    #[serde(default)]
    session: DeserializedSession,
    #[serde(default)]
    display: DeserializedDisplay,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedSession {
    #[serde(default)]
    verbose: Option<bool>,
    #[serde(default)]
    missing_spec: Option<MissingSpecPolicy>,
    #[serde(default)]
    runner_source: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedDisplay {
    #[serde(default)]
    show_durations: Option<bool>,
}

impl DeserializedConfig {
    fn from_location(
        location: ConfigLocation<'_>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        match location {
            ConfigLocation::Isolated => {
                debug!("config: skipping (isolated)");
                Ok(None)
            }
            ConfigLocation::Explicit(path) => match Self::from_path(path, warnings)? {
                Some(config) => Ok(Some(config)),
                None => Err(ConfigError::FileNotFound {
                    path: path.to_owned(),
                }),
            },
            ConfigLocation::Default => match default_config_path()? {
                Some(path) => Self::from_path(&path, warnings),
                None => {
                    debug!("config: could not determine config directory");
                    Ok(None)
                }
            },
        }
    }

    /// Returns `Ok(None)` if the file does not exist.
    fn from_path(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        debug!("config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            deserialize_tracking_unknown::<Self>(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("config: loaded successfully from {path}");
        Ok(Some(config))
    }
}

/// The embedded defaults. Every setting is required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultConfig {
    session: DefaultSession,
    display: DefaultDisplay,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultSession {
    verbose: bool,
    missing_spec: MissingSpecPolicy,
    runner_source: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultDisplay {
    show_durations: bool,
}

impl DefaultConfig {
    const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Panics if the embedded TOML is invalid or contains unknown keys.
    fn from_embedded() -> Self {
        let (config, unknown) = deserialize_tracking_unknown::<Self>(Self::DEFAULT_CONFIG)
            .expect("embedded default config is valid");
        assert!(
            unknown.is_empty(),
            "embedded default config has unknown keys: {unknown:?}"
        );
        config
    }
}

/// Deserializes `contents`, collecting the paths of keys that were not recognized.
fn deserialize_tracking_unknown<'de, T: Deserialize<'de>>(
    contents: &'de str,
) -> Result<(T, BTreeSet<String>), toml::de::Error> {
    let deserializer = toml::Deserializer::parse(contents)?;
    let mut unknown = BTreeSet::new();
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.insert(path.to_string());
    })?;
    Ok((value, unknown))
}
