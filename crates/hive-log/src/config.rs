// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;

/// Where formatted events are written. Mirrors the teacher's `WriterConfig`, collapsed
/// to the two targets `hive-config`'s `logger` key actually distinguishes: a path, or
/// nothing (stdout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

/// Logging setup handed to [`crate::LogHandle::init`]. Built from `hive-config`'s
/// recognised `logger` key: `Some(path)` becomes [`LogTarget::File`], `None` becomes
/// [`LogTarget::Stdout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// An `EnvFilter` directive string, e.g. `"info"` or `"hive_dispatch=debug,warn"`.
    /// Overridden at startup by the `HIVE_LOG` environment variable when set.
    pub filter: String,
    pub target: LogTarget,
}

impl Default for LogConfig {
    fn default() -> Self { LogConfig { filter: "info".to_string(), target: LogTarget::Stdout } }
}

impl LogConfig {
    #[must_use]
    pub fn from_logger_path(logger: Option<PathBuf>) -> Self {
        match logger {
            Some(path) => LogConfig { target: LogTarget::File(path), ..Self::default() },
            None => Self::default(),
        }
    }
}
