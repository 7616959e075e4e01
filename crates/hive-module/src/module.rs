// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! In-process module registration (§9 "Dynamic module loading", the in-process half).
//!
//! Grounded on `skynet_module.c`'s `skynet_module_query`/`_create`/`_init`: a name
//! looked up in a table yields something that can produce and initialise a service
//! instance. The original's separate `create()` (returns an opaque pointer) then
//! `init(instance, ctx, args)` collapses here into one call, since a
//! [`hive_core::MessageHandler`] is already the safe Rust stand-in for "instance plus
//! its vtable" - there is no meaningful uninitialised-instance state to model in
//! between.

use crate::error::{ModuleError, Result};
use hive_core::{Context, MessageHandler};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// Something that can build a [`MessageHandler`] for a freshly created service,
/// analogous to `struct skynet_module`'s `create`/`init` pair.
pub trait ModuleFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Builds and initialises a handler for a new instance of this module. `args` is
    /// the free-form string following the module name in a `LAUNCH module args`
    /// command (§6).
    fn init(&self, ctx: &Context, args: &str) -> Result<Box<dyn MessageHandler>>;
}

/// Blanket impl so a bare closure can act as a `ModuleFactory` without a dedicated
/// type - convenient for tests and small bundled demo services.
pub struct FnModule<F> {
    name: String,
    build: F,
}

impl<F> FnModule<F>
where
    F: Fn(&Context, &str) -> Result<Box<dyn MessageHandler>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, build: F) -> Self {
        FnModule { name: name.into(), build }
    }
}

impl<F> ModuleFactory for FnModule<F>
where
    F: Fn(&Context, &str) -> Result<Box<dyn MessageHandler>> + Send + Sync,
{
    fn name(&self) -> &str { &self.name }

    fn init(&self, ctx: &Context, args: &str) -> Result<Box<dyn MessageHandler>> {
        (self.build)(ctx, args)
    }
}

/// The process-wide table of known in-process modules, keyed by name. Mirrors
/// `skynet_module.c`'s `struct modules` array, replacing its `spinlock` with a
/// `parking_lot::RwLock` (read-mostly: lookups vastly outnumber registrations, which
/// only happen at startup).
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<dyn ModuleFactory>>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("registered", &self.modules.read().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn register(&self, factory: Arc<dyn ModuleFactory>) {
        self.modules.write().insert(factory.name().to_string(), factory);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.modules.read().get(name).cloned()
    }

    /// Looks up `name` and runs its `init`, installing the resulting handler on `ctx`.
    /// This is the in-process half of the `LAUNCH module args` command surface entry.
    pub fn launch(&self, name: &str, ctx: &Context, args: &str) -> Result<()> {
        let factory = self.get(name).ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        let handler = factory.init(ctx, args)?;
        ctx.install_handler(handler);
        Ok(())
    }
}
