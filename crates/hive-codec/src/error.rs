// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("invalid type tag {0:#04x}")]
    InvalidTag(u8),

    #[error("table nesting exceeds the maximum depth of {0}")]
    DepthExceeded(u32),
}

pub type Result<T> = std::result::Result<T, CodecError>;
