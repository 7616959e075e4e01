// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The handle registry: `local_id -> Context`, plus a sorted `name -> handle` index for
//! `REG .name` / `QUERY .name` (§4.1).
//!
//! Grounded on `skynet_handle.c`'s open-addressed slot table (power-of-two size,
//! linear-probe insert, full-table rehash on resize) and its separate sorted name array
//! searched by binary search. We use `parking_lot::RwLock` rather than a hand-rolled
//! reader/writer spinlock: the registry is read far more often than written (every
//! `send` does a `grab`), so a park-on-contention lock is the right tradeoff, unlike the
//! spin-only primitives in [`crate::spinlock`] that guard hot per-message paths.

use crate::{context::Context, error::{Error, Result}, handle::Handle};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug)]
struct Inner {
    /// `local_id -> Context`. A `HashMap` plays the role of the original's
    /// power-of-two open-addressed slot array: Rust's std map already amortizes
    /// resizing the way the C code's explicit `rehash` does, so there's no
    /// correctness-relevant reason to hand-roll the probing sequence here - the
    /// observable contract (register/grab/retire) is what the spec actually pins down.
    slots: HashMap<u32, Arc<Context>>,
    next_local_id: u32,
    node: u8,
    /// Sorted `(name, handle)` pairs, searched by binary search - mirrors
    /// `skynet_handle.c`'s `_handle_storage.name` array exactly.
    names: Vec<(String, Handle)>,
}

/// The service registry for one node. Maps handles to contexts and names to handles.
#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    #[must_use]
    pub fn new(node: u8) -> Self {
        Registry {
            inner: RwLock::new(Inner {
                slots: HashMap::new(),
                next_local_id: 1,
                node,
                names: Vec::new(),
            }),
        }
    }

    /// Registers a freshly created context, returning its assigned handle. Only fails
    /// (per §4.1) if the 24-bit local id space is entirely exhausted.
    pub fn register(&self, make_context: impl FnOnce(Handle) -> Arc<Context>) -> Result<Arc<Context>> {
        let mut inner = self.inner.write();
        let node = inner.node;

        let start = inner.next_local_id;
        let mut candidate = start;
        loop {
            let handle = Handle::from_parts(node, candidate);
            if handle.raw() != 0 && !inner.slots.contains_key(&handle.local_id()) {
                let ctx = make_context(handle);
                inner.slots.insert(handle.local_id(), Arc::clone(&ctx));
                inner.next_local_id = candidate.wrapping_add(1);
                if inner.next_local_id == 0 {
                    inner.next_local_id = 1;
                }
                return Ok(ctx);
            }
            candidate = candidate.wrapping_add(1);
            if candidate == 0 {
                candidate = 1;
            }
            if candidate == start {
                return Err(Error::HandleSpaceExhausted);
            }
        }
    }

    /// Looks up a context and bumps its reference count. Returns `None` ("not found")
    /// if the slot is empty or already holds a context whose `handle` doesn't match
    /// (can't happen with this map-based implementation, but the check documents the
    /// invariant the original's generation-tagged slots enforce).
    pub fn grab(&self, handle: Handle) -> Option<Arc<Context>> {
        let inner = self.inner.read();
        let ctx = inner.slots.get(&handle.local_id())?;
        if ctx.handle != handle {
            return None;
        }
        Some(ctx.grab())
    }

    /// Removes the handle's slot and every name bound to it, then drops the registry's
    /// own strong reference (the other half of the initial `ref = 2`, §5).
    pub fn retire(&self, handle: Handle) {
        let mut inner = self.inner.write();
        inner.slots.remove(&handle.local_id());
        inner.names.retain(|(_, h)| *h != handle);
    }

    /// Binds `name` to `handle`. Fails if the name is already bound (names bind once,
    /// §4.1).
    pub fn register_name(&self, name: &str, handle: Handle) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.names.binary_search_by(|(n, _)| n.as_str().cmp(name)) {
            Ok(_) => Err(Error::NameAlreadyBound(name.to_string())),
            Err(idx) => {
                inner.names.insert(idx, (name.to_string(), handle));
                Ok(())
            }
        }
    }

    /// Binary search over the sorted name array (§4.1).
    pub fn find_name(&self, name: &str) -> Option<Handle> {
        let inner = self.inner.read();
        inner
            .names
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|idx| inner.names[idx].1)
    }

    pub fn live_count(&self) -> usize { self.inner.read().slots.len() }

    /// Retires every live handle at once (§6 `ABORT`). Mirrors
    /// `skynet_handle.c`'s `skynet_handle_retireall`: slots and names are cleared
    /// without notifying anyone, unlike [`Registry::retire`] used one handle at a time by
    /// the ordinary exit path - callers already own a grab on whatever they're doing, so
    /// this does not touch reference counts.
    pub fn retire_all(&self) -> Vec<Handle> {
        let mut inner = self.inner.write();
        inner.names.clear();
        inner.slots.drain().map(|(_, ctx)| ctx.handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn register_assigns_increasing_handles() {
        let reg = Registry::new(0);
        let a = reg.register(|h| Context::new(h, "a")).unwrap();
        let b = reg.register(|h| Context::new(h, "b")).unwrap();
        assert_ne!(a.handle, b.handle);
    }

    #[test]
    fn grab_returns_none_for_unregistered_handle() {
        let reg = Registry::new(0);
        assert!(reg.grab(Handle::from_parts(0, 999)).is_none());
    }

    #[test]
    fn grab_increments_ref_count() {
        let reg = Registry::new(0);
        let ctx = reg.register(|h| Context::new(h, "a")).unwrap();
        let before = ctx.ref_count();
        let grabbed = reg.grab(ctx.handle).unwrap();
        assert_eq!(grabbed.ref_count(), before + 1);
    }

    #[test]
    fn retire_removes_slot_and_names() {
        let reg = Registry::new(0);
        let ctx = reg.register(|h| Context::new(h, "a")).unwrap();
        reg.register_name(".a", ctx.handle).unwrap();
        reg.retire(ctx.handle);
        assert!(reg.grab(ctx.handle).is_none());
        assert!(reg.find_name(".a").is_none());
    }

    #[test]
    fn name_binds_once() {
        let reg = Registry::new(0);
        let a = reg.register(|h| Context::new(h, "a")).unwrap();
        let b = reg.register(|h| Context::new(h, "b")).unwrap();
        reg.register_name(".svc", a.handle).unwrap();
        assert!(reg.register_name(".svc", b.handle).is_err());
    }

    #[test]
    fn find_name_binary_search() {
        let reg = Registry::new(0);
        let names = ["zeta", "alpha", "mike", "bravo"];
        for (i, n) in names.iter().enumerate() {
            let ctx = reg.register(|h| Context::new(h, *n)).unwrap();
            reg.register_name(n, ctx.handle).unwrap();
            let _ = i;
        }
        for n in names {
            assert!(reg.find_name(n).is_some());
        }
        assert!(reg.find_name("missing").is_none());
    }

    #[test]
    fn retire_all_clears_every_slot_and_name() {
        let reg = Registry::new(0);
        let a = reg.register(|h| Context::new(h, "a")).unwrap();
        let b = reg.register(|h| Context::new(h, "b")).unwrap();
        reg.register_name(".a", a.handle).unwrap();
        let retired = reg.retire_all();
        assert_eq!(retired.len(), 2);
        assert!(reg.grab(a.handle).is_none());
        assert!(reg.grab(b.handle).is_none());
        assert!(reg.find_name(".a").is_none());
    }

    #[test]
    fn live_count_tracks_registrations_and_retirements() {
        let reg = Registry::new(0);
        let a = reg.register(|h| Context::new(h, "a")).unwrap();
        assert_eq!(reg.live_count(), 1);
        reg.retire(a.handle);
        assert_eq!(reg.live_count(), 0);
    }
}
