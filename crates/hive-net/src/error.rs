// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("the reactor thread has already shut down")]
    ReactorStopped,

    #[error("socket {0:?} is not known to the reactor")]
    UnknownSocket(crate::socket::SocketId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;
