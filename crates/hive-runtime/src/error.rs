// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Top-level error type (§AMBIENT/Error handling): wraps every subsystem's own error
//! enum so `main` has one thing to convert into a [`miette::Report`], matching the
//! teacher's `network_io::handshake` `miette::bail!` usage at its own binary boundary.

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] hive_config::ConfigError),

    #[error(transparent)]
    Log(#[from] hive_log::LogError),

    #[error(transparent)]
    Module(#[from] hive_module::ModuleError),

    #[error("bootstrap service {module:?} failed to start")]
    BootstrapFailed { module: String },

    #[error("environment key {0:?} is already bound")]
    EnvAlreadyBound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
