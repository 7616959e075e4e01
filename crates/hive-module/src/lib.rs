// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Module loading (§6 "Module ABI", §9 "Dynamic module loading").

pub mod dynamic;
mod error;
mod module;

pub use dynamic::{load_from_path, DynamicModule};
pub use error::{ModuleError, Result};
pub use module::{FnModule, ModuleFactory, ModuleRegistry};
