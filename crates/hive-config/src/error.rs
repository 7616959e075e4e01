// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read { path: std::path::PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("`thread` must be at least 1, got {0}")]
    ZeroThreads(u32),
    #[error("`module_path` entry {0:?} has no `?` module-name placeholder")]
    MissingPlaceholder(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
