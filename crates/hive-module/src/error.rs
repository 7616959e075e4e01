// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module {0:?} is not registered")]
    NotFound(String),
    #[error("module {0:?} was not found on the configured `module_path`")]
    NotFoundOnPath(String),
    #[error("failed to load dynamic module {name:?} from {path:?}: {source}")]
    DynamicLoad { name: String, path: std::path::PathBuf, #[source] source: libloading::Error },
    #[error("dynamic module {name:?} is missing the required `{symbol}` symbol")]
    MissingSymbol { name: String, symbol: &'static str },
    #[error("module {0:?} `init` returned a non-zero status: {1}")]
    InitFailed(String, i32),
}

pub type Result<T> = std::result::Result<T, ModuleError>;
