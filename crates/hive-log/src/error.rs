// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log file path {0:?} has no parent directory")]
    NoParentDirectory(PathBuf),
    #[error("log file path {0:?} has no file name")]
    NoFileName(PathBuf),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
    #[error("invalid `HIVE_LOG` filter directive: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to reload the logging layer: {0}")]
    Reload(#[from] tracing_subscriber::reload::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;
