// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The hive actor runtime: startup/shutdown, the command surface, and the bundled
//! services. Exposed as a library chiefly so integration tests under `tests/` can
//! drive a [`Runtime`] end to end; the `hive` binary is a thin CLI wrapper over it.

pub mod bootstrap;
pub mod command_surface;
pub mod env;
pub mod error;
pub mod logfile;

pub use bootstrap::Runtime;
pub use command_surface::CommandSurface;
pub use env::Env;
pub use error::{Result, RuntimeError};
