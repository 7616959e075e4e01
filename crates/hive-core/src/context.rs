// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The per-service [`Context`]: owns the mailbox, the message handler, reference count,
//! and profiling counters (§3 "Service context").
//!
//! DESIGN NOTES §9 replaces the original `(context, userdata, type, session, source,
//! payload, size) -> int` callback pointer with the [`MessageHandler`] trait below: one
//! method, an owned payload in, a [`Disposition`] out.

use crate::{
    atomic_ext::{AtomicI32Ext, AtomicU32Ext},
    handle::{Handle, Session, SessionCounter},
    mailbox::{Mailbox, Message},
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicU32},
    Arc,
};

/// What a [`MessageHandler`] wants done with the payload it was given.
///
/// This is the Rust-safe replacement for the original callback's `int` return value
/// ("0/1 = free the message, non-zero in some modules = the callback took ownership").
/// Since [`Message::payload`] is an `Arc<[u8]>`, "keep" and "free" are really just about
/// whether the handler stashed a clone somewhere for later use; dropping the last `Arc`
/// reference frees the bytes either way, so this enum exists mostly to preserve the
/// spec's vocabulary and to let a handler signal "do not log this as having been
/// dropped".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Free,
    Keep,
}

/// The trait a native service implements to receive messages (§9 "Callback
/// polymorphism"). Registered on a [`Context`] once, at `init` time, via
/// [`Context::install_handler`].
pub trait MessageHandler: Send {
    fn handle(&mut self, ctx: &Context, msg: Message) -> Disposition;

    /// Delivered for the `SIGNAL handle n` command surface entry (§6). Most handlers
    /// never need this; default is a no-op, matching the original's `mod->signal ==
    /// NULL` short-circuit in `skynet_module_instance_signal`.
    fn signal(&mut self, _ctx: &Context, _signal: i32) {}
}

/// Owns per-service mutable state that isn't already covered by the [`Mailbox`]:
/// session counter, ref count, message/CPU accounting, the `endless` watchdog flag, and
/// whether `init` has completed.
#[derive(Debug)]
pub struct Context {
    pub handle: Handle,
    pub module: String,
    pub mailbox: Arc<Mailbox>,
    sessions: Mutex<SessionCounter>,
    handler: Mutex<Option<Box<dyn MessageHandler>>>,
    ref_count: AtomicU32,
    message_count: AtomicU32,
    cpu_cost_us: AtomicI32,
    endless: AtomicBool,
    init_done: AtomicBool,
    profile_enabled: AtomicBool,
}

impl Context {
    /// Every context starts with `ref = 2`: one for the handle table's own strong
    /// reference, one for the creator (§5 "Reference counting").
    const INITIAL_REF_COUNT: u32 = 2;

    #[must_use]
    pub fn new(handle: Handle, module: impl Into<String>) -> Arc<Self> {
        Arc::new(Context {
            handle,
            module: module.into(),
            mailbox: Arc::new(Mailbox::new(handle)),
            sessions: Mutex::new(SessionCounter::new()),
            handler: Mutex::new(None),
            ref_count: AtomicU32::new(Self::INITIAL_REF_COUNT),
            message_count: AtomicU32::new(0),
            cpu_cost_us: AtomicI32::new(0),
            endless: AtomicBool::new(false),
            init_done: AtomicBool::new(false),
            profile_enabled: AtomicBool::new(false),
        })
    }

    pub fn install_handler(&self, handler: Box<dyn MessageHandler>) {
        *self.handler.lock() = Some(handler);
        self.init_done.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn init_done(&self) -> bool { self.init_done.load(std::sync::atomic::Ordering::SeqCst) }

    pub fn next_session(&self) -> Session { self.sessions.lock().next() }

    pub fn grab(self: &Arc<Self>) -> Arc<Self> {
        self.ref_count.increment();
        Arc::clone(self)
    }

    /// Returns the new ref count; `0` means the caller should drop this context from the
    /// registry.
    pub fn release_ref(&self) -> u32 { self.ref_count.decrement() }

    pub fn ref_count(&self) -> u32 { self.ref_count.get() }

    pub fn message_count(&self) -> u32 { self.message_count.get() }

    pub fn set_profile_enabled(&self, on: bool) {
        self.profile_enabled.store(on, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn profile_enabled(&self) -> bool {
        self.profile_enabled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn cpu_cost_us(&self) -> i32 { self.cpu_cost_us.get() }

    pub fn endless(&self) -> bool { self.endless.load(std::sync::atomic::Ordering::SeqCst) }

    /// Set by the monitor thread when this service stays on one message too long.
    pub fn mark_endless(&self) { self.endless.store(true, std::sync::atomic::Ordering::SeqCst); }

    /// Cleared by the `STAT endless` command surface handler (§6).
    pub fn clear_endless(&self) { self.endless.store(false, std::sync::atomic::Ordering::SeqCst); }

    /// Dispatches one message to the installed handler, accounting CPU cost if
    /// profiling is enabled. Returns `None` if no handler has been installed yet (the
    /// message is then treated by the caller as undeliverable).
    pub fn dispatch(&self, msg: Message) -> Option<Disposition> {
        self.message_count.increment();
        let started = self.profile_enabled();
        let start = started.then(std::time::Instant::now);

        let mut guard = self.handler.lock();
        let handler = guard.as_mut()?;
        // `Context` fields used by `handle()` (sessions, mailbox) don't require the
        // handler lock, so we only need `self` by reference here, not a re-entrant
        // borrow of `handler`.
        let disposition = handler.handle(self, msg);

        if let Some(start) = start {
            let elapsed_us = start.elapsed().as_micros().min(i32::MAX as u128) as i32;
            self.cpu_cost_us.add(elapsed_us);
        }
        Some(disposition)
    }

    /// Forwards a `SIGNAL` command to the installed handler, if any; a no-op before
    /// `init` completes or after the handler has been torn down.
    pub fn signal(&self, signal: i32) {
        let mut guard = self.handler.lock();
        if let Some(handler) = guard.as_mut() {
            handler.signal(self, signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MessageType;
    use pretty_assertions::assert_eq;

    struct Echo;
    impl MessageHandler for Echo {
        fn handle(&mut self, _ctx: &Context, _msg: Message) -> Disposition { Disposition::Free }
    }

    struct SignalCounter(Arc<AtomicI32>);
    impl MessageHandler for SignalCounter {
        fn handle(&mut self, _ctx: &Context, _msg: Message) -> Disposition { Disposition::Free }
        fn signal(&mut self, _ctx: &Context, signal: i32) {
            self.0.store(signal, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn new_context_has_ref_count_two() {
        let ctx = Context::new(Handle::from(1), "echo");
        assert_eq!(ctx.ref_count(), 2);
    }

    #[test]
    fn grab_increments_release_decrements() {
        let ctx = Context::new(Handle::from(1), "echo");
        let _held = ctx.grab();
        assert_eq!(ctx.ref_count(), 3);
        assert_eq!(ctx.release_ref(), 2);
    }

    #[test]
    fn dispatch_without_handler_returns_none() {
        let ctx = Context::new(Handle::from(1), "echo");
        let msg = Message::new(Handle::NONE, Session::PUSH, MessageType::Text, vec![]);
        assert!(ctx.dispatch(msg).is_none());
    }

    #[test]
    fn dispatch_increments_message_count() {
        let ctx = Context::new(Handle::from(1), "echo");
        ctx.install_handler(Box::new(Echo));
        let msg = Message::new(Handle::NONE, Session::PUSH, MessageType::Text, vec![]);
        assert_eq!(ctx.dispatch(msg), Some(Disposition::Free));
        assert_eq!(ctx.message_count(), 1);
    }

    #[test]
    fn endless_flag_set_and_cleared() {
        let ctx = Context::new(Handle::from(1), "echo");
        assert!(!ctx.endless());
        ctx.mark_endless();
        assert!(ctx.endless());
        ctx.clear_endless();
        assert!(!ctx.endless());
    }

    #[test]
    fn signal_before_init_is_a_silent_no_op() {
        let ctx = Context::new(Handle::from(1), "echo");
        ctx.signal(7); // no handler installed yet
    }

    #[test]
    fn signal_after_init_reaches_the_installed_handler() {
        let ctx = Context::new(Handle::from(1), "echo");
        let observed = Arc::new(AtomicI32::new(0));
        ctx.install_handler(Box::new(SignalCounter(Arc::clone(&observed))));
        ctx.signal(7);
        assert_eq!(observed.load(std::sync::atomic::Ordering::SeqCst), 7);
    }

    #[test]
    fn next_session_is_monotonic() {
        let ctx = Context::new(Handle::from(1), "echo");
        let a = ctx.next_session();
        let b = ctx.next_session();
        assert!(b.get() > a.get());
    }
}
