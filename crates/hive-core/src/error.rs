// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Error kinds for the handle registry, mailbox, and dispatch layer - see §7 of the
//! spec's error table for the kinds this enum surfaces.

use crate::handle::Handle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A `send` targeted handle `0`, or a handle whose service has already retired.
    #[error("invalid target handle {0}")]
    InvalidTarget(Handle),

    /// The 24-bit local id space is exhausted. The spec treats this as a design
    /// assumption that never triggers in a running node; we still surface it rather
    /// than panic, since a long-lived test runtime is exactly the place this could
    /// happen first.
    #[error("handle id space exhausted")]
    HandleSpaceExhausted,

    /// `REG .name` for a name that is already bound to a different, still-live handle.
    #[error("name '{0}' is already registered")]
    NameAlreadyBound(String),

    /// Payload exceeds the encodable size for its message type.
    #[error("payload of {actual} bytes exceeds the {limit} byte limit")]
    OverlargePayload { actual: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
