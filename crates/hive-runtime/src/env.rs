// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The process-wide string environment table (§6 `GETENV`/`SETENV`).
//!
//! Grounded on `skynet_env.c`: a single global table, read far more than written, guarded
//! there by a spinlock around a Lua state used purely as a string-keyed dictionary. We
//! drop the Lua indirection - it bought the original dynamic typing it never otherwise
//! uses - and keep a plain `HashMap<String, String>` behind a `parking_lot::RwLock`. The
//! original's `assert(lua_isnil(L, -1))` encodes "a key may only be set once"; here that
//! becomes a recoverable [`RuntimeError::EnvAlreadyBound`] rather than a debug-only abort.

use crate::error::{Result, RuntimeError};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Env {
    vars: RwLock<HashMap<String, String>>,
}

impl Env {
    #[must_use]
    pub fn new() -> Self { Env::default() }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> { self.vars.read().get(key).cloned() }

    /// Binds `key` to `value`. Fails if `key` is already bound - environment keys are
    /// write-once, matching the original's assertion.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut vars = self.vars.write();
        if vars.contains_key(key) {
            return Err(RuntimeError::EnvAlreadyBound(key.to_string()));
        }
        vars.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
