// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Startup configuration (§6 "Configuration").
//!
//! The original loads a Lua-evaluable config file that reduces to a flat key→value
//! environment table. §6 explicitly licenses replacing that loader with any key-value
//! source provided the recognised keys are honoured; this crate uses `serde` + `toml`,
//! the pairing the rest of the pack reaches for when it needs a flat startup file
//! (grounded on the teacher's pervasive `serde` use and `toml`'s place as its natural
//! counterpart).

mod error;

pub use error::{ConfigError, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_thread() -> u32 { 8 }
fn default_module_path() -> String { "./service/?.so".to_string() }
fn default_logservice() -> String { "logger".to_string() }

/// The recognised keys from §6, deserialized straight off a TOML table. Every field has
/// a default so a config file only needs to mention what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_thread")]
    pub thread: u32,

    /// Node id for clustering; `0` means standalone (§3, §6).
    #[serde(default)]
    pub harbor: u8,

    #[serde(default)]
    pub profile: bool,

    /// Optional pidfile path; presence means "daemonize".
    #[serde(default)]
    pub daemon: Option<PathBuf>,

    /// Semicolon-separated list of path templates; each must contain exactly one `?`
    /// standing in for the module name (e.g. `"./service/?.so;./service/?/mod.so"`).
    #[serde(default = "default_module_path")]
    pub module_path: String,

    /// `"module args"` for the first service launched at startup, if any.
    #[serde(default)]
    pub bootstrap: Option<String>,

    /// Optional log file path, handed to `hive-log` as `LogConfig::target`.
    #[serde(default)]
    pub logger: Option<PathBuf>,

    #[serde(default = "default_logservice")]
    pub logservice: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thread: default_thread(),
            harbor: 0,
            profile: false,
            daemon: None,
            module_path: default_module_path(),
            bootstrap: None,
            logger: None,
            logservice: default_logservice(),
        }
    }
}

impl Config {
    pub fn from_str(toml_text: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.thread == 0 {
            return Err(ConfigError::ZeroThreads(self.thread));
        }
        for entry in self.module_path_entries() {
            if !entry.contains('?') {
                return Err(ConfigError::MissingPlaceholder(entry.to_string()));
            }
        }
        Ok(())
    }

    /// Splits `module_path` on `;`, skipping empty segments (a trailing separator is
    /// common in hand-written configs).
    pub fn module_path_entries(&self) -> impl Iterator<Item = &str> {
        self.module_path.split(';').filter(|s| !s.is_empty())
    }

    /// Resolves `name` against every `module_path` template in order, substituting `?`,
    /// returning the first candidate that exists on disk.
    #[must_use]
    pub fn resolve_module_path(&self, name: &str) -> Option<PathBuf> {
        self.module_path_entries()
            .map(|template| PathBuf::from(template.replace('?', name)))
            .find(|candidate| candidate.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_recognised_keys_with_no_input() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.thread, 8);
        assert_eq!(config.harbor, 0);
        assert_eq!(config.logservice, "logger");
    }

    #[test]
    fn overrides_only_the_keys_present() {
        let config = Config::from_str(
            r#"
            thread = 4
            harbor = 3
            bootstrap = "app start"
            "#,
        )
        .unwrap();
        assert_eq!(config.thread, 4);
        assert_eq!(config.harbor, 3);
        assert_eq!(config.bootstrap.as_deref(), Some("app start"));
        assert_eq!(config.module_path, default_module_path());
    }

    #[test]
    fn zero_threads_is_rejected() {
        let err = Config::from_str("thread = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroThreads(0)));
    }

    #[test]
    fn module_path_without_placeholder_is_rejected() {
        let err = Config::from_str(r#"module_path = "./service/mod.so""#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPlaceholder(_)));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = Config::from_str("not_a_real_key = 1");
        assert!(err.is_err());
    }

    #[test]
    fn module_path_entries_splits_on_semicolon_and_skips_empties() {
        let config = Config::from_str(r#"module_path = "./a/?.so;./b/?.so;""#).unwrap();
        let entries: Vec<&str> = config.module_path_entries().collect();
        assert_eq!(entries, vec!["./a/?.so", "./b/?.so"]);
    }

    #[test]
    fn resolve_module_path_returns_none_when_nothing_exists() {
        let config = Config::from_str(r#"module_path = "/no/such/dir/?.so""#).unwrap();
        assert_eq!(config.resolve_module_path("widget"), None);
    }
}
