// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame shorter than its fixed header ({needed} bytes needed, {actual} available)")]
    Truncated { needed: usize, actual: usize },

    #[error("unknown request frame type {0:#04x}")]
    UnknownRequestType(u8),

    #[error("unknown response frame type {0:#04x}")]
    UnknownResponseType(u8),

    #[error("service name length {0} is out of the valid 1-255 range")]
    InvalidNameLength(usize),

    #[error("session must be strictly positive, got {0}")]
    NonPositiveSession(i64),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
