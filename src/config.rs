// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/config.rs

// Interpreter settings, read from a TOML file. Every field has a
// default, so an empty file is a valid configuration.

// <>

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Limits and switches for a task
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Function calls that may be nested before `stack-overflow`
    pub stack_limit: usize,
    /// Bytes of native stack an evaluation may use before
    /// `stack-overflow`; must stay below the running thread's stack size
    pub native_stack: usize,
    /// Function dispatches allowed per top-level evaluation before a
    /// halt; 0 for no limit
    pub eval_limit: u64,
    /// Deep-freeze the bodies of interpreted functions
    pub freeze_bodies: bool,
    /// Characters kept when molding for the console
    pub mold_limit: Option<usize>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stack_limit: 1024,
            native_stack: 1 << 20,
            eval_limit: 0,
            freeze_bodies: true,
            mold_limit: None,
            log_level: String::from("warn"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    BadLevel(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "cannot read {}: {}", path.display(), err),
            ConfigError::Parse(err) => write!(f, "invalid configuration: {}", err),
            ConfigError::BadLevel(level) => write!(f, "unknown log level {:?}", level),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.level()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Config::from_toml_str(&content)
    }

    /// The log level as a filter for the logger
    pub fn level(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::BadLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::default(), Config::from_toml_str("").unwrap());
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::from_toml_str(
            "stack_limit = 64\neval_limit = 1000\nmold_limit = 80\nlog_level = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(64, config.stack_limit);
        assert_eq!(1000, config.eval_limit);
        assert_eq!(Some(80), config.mold_limit);
        assert!(config.freeze_bodies);
        assert_eq!(Config::default().native_stack, config.native_stack);
        assert_eq!(log::LevelFilter::Debug, config.level().unwrap());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            Config::from_toml_str("stack_limit = \"deep\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("no_such_field = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("log_level = \"loud\""),
            Err(ConfigError::BadLevel(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "freeze_bodies = false").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert!(!config.freeze_bodies);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = Config::load(&missing).unwrap_err();
        assert!(err.to_string().starts_with("cannot read"));
    }
}
