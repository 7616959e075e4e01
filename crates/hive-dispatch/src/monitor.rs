// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Per-worker stuck-service detection (§4.6) plus the watchdog thread that checks every
//! monitor every 5 s.
//!
//! Grounded on `skynet_monitor.c`'s `(version, check_version, source, destination)`
//! quadruple: `trigger` bumps `version` and records who's being dispatched to, `check`
//! compares `version` against the value it saw last time - no change in 5 s means the
//! worker has been stuck on that one message the whole interval.

use hive_core::{atomic_ext::AtomicU32Ext, Handle, Registry};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// How often the watchdog thread wakes to compare versions (§4.6).
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// One worker's liveness counter. `trigger` is called on the hot dispatch path, so it's
/// just a handful of atomic stores - the watchdog thread does all the comparing.
#[derive(Debug, Default)]
pub struct ServiceMonitor {
    version: AtomicU32,
    check_version: AtomicU32,
    last_source: AtomicU32,
    last_dest: AtomicU32,
}

impl ServiceMonitor {
    #[must_use]
    pub fn new() -> Self { ServiceMonitor::default() }

    /// Records that this worker is now dispatching `source -> dest`, or (when both are
    /// [`Handle::NONE`]) that it has just finished and is idle/picking its next mailbox.
    pub fn trigger(&self, source: Handle, dest: Handle) {
        self.last_source.store(source.raw(), Ordering::Relaxed);
        self.last_dest.store(dest.raw(), Ordering::Relaxed);
        self.version.increment();
    }

    /// Compares the current version against the one observed on the previous check. If
    /// unchanged, the worker has been dispatching the same message for a full interval;
    /// the target is marked `endless` and a warning is logged. Otherwise just records the
    /// new version to compare against next time.
    pub fn check(&self, registry: &Registry) {
        let version = self.version.get();
        if version == self.check_version.get() {
            let dest = Handle::from(self.last_dest.load(Ordering::Relaxed));
            if dest.is_none() {
                return;
            }
            let source = Handle::from(self.last_source.load(Ordering::Relaxed));
            if let Some(ctx) = registry.grab(dest) {
                ctx.mark_endless();
                ctx.release_ref();
            }
            tracing::warn!(%source, %dest, version, "message may be in an endless loop");
        } else {
            self.check_version.set(version);
        }
    }
}

/// Runs on a dedicated thread (§5 "Thread roles"): wakes every [`CHECK_INTERVAL`] and
/// checks every worker's monitor, until told to shut down.
#[derive(Debug)]
pub struct MonitorWatchdog {
    monitors: Vec<Arc<ServiceMonitor>>,
    registry: Arc<Registry>,
    shutdown: Arc<AtomicBool>,
}

impl MonitorWatchdog {
    #[must_use]
    pub fn new(monitors: Vec<Arc<ServiceMonitor>>, registry: Arc<Registry>, shutdown: Arc<AtomicBool>) -> Self {
        MonitorWatchdog { monitors, registry, shutdown }
    }

    pub fn run(&self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            thread::sleep(CHECK_INTERVAL);
            for monitor in &self.monitors {
                monitor.check(&self.registry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_without_trigger_twice_in_a_row_marks_endless() {
        let registry = Registry::new(0);
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();
        let monitor = ServiceMonitor::new();

        monitor.trigger(Handle::NONE, ctx.handle);
        monitor.check(&registry); // first check: just records check_version
        assert!(!ctx.endless());

        monitor.check(&registry); // second check with no intervening trigger: stuck
        assert!(ctx.endless());
    }

    #[test]
    fn trigger_between_checks_prevents_false_positive() {
        let registry = Registry::new(0);
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();
        let monitor = ServiceMonitor::new();

        monitor.trigger(Handle::NONE, ctx.handle);
        monitor.check(&registry);
        monitor.trigger(Handle::NONE, ctx.handle);
        monitor.check(&registry);
        assert!(!ctx.endless());
    }

    #[test]
    fn quiescent_trigger_with_none_dest_is_never_flagged() {
        let registry = Registry::new(0);
        let monitor = ServiceMonitor::new();
        monitor.trigger(Handle::NONE, Handle::NONE);
        monitor.check(&registry);
        monitor.check(&registry);
        // No panic, no lookup attempted against handle 0.
        assert_eq!(registry.live_count(), 0);
    }
}
