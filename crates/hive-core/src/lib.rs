// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Core data structures for the hive actor runtime: handles and sessions, the service
//! registry, the per-service mailbox, the global run queue, and the service context
//! that ties them together.
//!
//! This crate has no knowledge of threads, sockets, or the wire protocol - those live in
//! [`hive_dispatch`], [`hive_net`], and [`hive_cluster`] respectively, each built on top
//! of the types here.

pub mod atomic_ext;
pub mod context;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod queue;
pub mod registry;
pub mod spinlock;

pub use context::{Context, Disposition, MessageHandler};
pub use error::{Error, Result};
pub use handle::{Handle, Session, SessionCounter};
pub use mailbox::{Mailbox, Message, MessageType};
pub use queue::GlobalQueue;
pub use registry::Registry;
pub use spinlock::{Spinlock, SpinlockGuard};
