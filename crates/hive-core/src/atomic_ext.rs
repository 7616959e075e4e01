// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Ergonomic extension traits over [`std::sync::atomic`] integers, hiding the ordering
//! choice and the `fetch_add` "returns the old value" quirk.
//!
//! All operations use [`SeqCst`](Ordering::SeqCst). This runtime never needs anything
//! weaker: contention is low (one increment per message/session/ref-count change) and
//! getting the ordering wrong here would be a very expensive bug to chase.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// See [the `fetch_add` quirk](self#the-fetch_add-quirk) below.
///
/// ## The `fetch_add` quirk
///
/// [`fetch_add`] returns the **old** value. [`increment`](AtomicU32Ext::increment) works
/// around this with [`wrapping_add`] on the locally observed old value instead of a
/// second `load`, which would race with other threads' increments.
///
/// [`fetch_add`]: std::sync::atomic::AtomicU32::fetch_add
/// [`wrapping_add`]: u32::wrapping_add
pub trait AtomicU32Ext {
    /// Atomically increments and returns the **new** value. Wraps at `u32::MAX`.
    fn increment(&self) -> u32;
    fn get(&self) -> u32;
    fn set(&self, value: u32);
    /// Atomically decrements and returns the **new** value. Wraps at `0`.
    fn decrement(&self) -> u32;
}

impl AtomicU32Ext for AtomicU32 {
    fn increment(&self) -> u32 { self.fetch_add(1, Ordering::SeqCst).wrapping_add(1) }

    fn get(&self) -> u32 { self.load(Ordering::SeqCst) }

    fn set(&self, value: u32) { self.store(value, Ordering::SeqCst); }

    fn decrement(&self) -> u32 { self.fetch_sub(1, Ordering::SeqCst).wrapping_sub(1) }
}

/// Same rationale as [`AtomicU32Ext`], for the signed counters used by
/// [`crate::handle::SessionCounter`]-adjacent bookkeeping that can go negative
/// transiently (e.g. CPU cost deltas).
pub trait AtomicI32Ext {
    fn get(&self) -> i32;
    fn set(&self, value: i32);
    fn add(&self, delta: i32) -> i32;
}

impl AtomicI32Ext for AtomicI32 {
    fn get(&self) -> i32 { self.load(Ordering::SeqCst) }

    fn set(&self, value: i32) { self.store(value, Ordering::SeqCst); }

    fn add(&self, delta: i32) -> i32 { self.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta) }
}
