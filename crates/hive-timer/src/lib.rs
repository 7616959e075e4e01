// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The timer service: a dedicated thread that advances a [`wheel::TimingWheel`] every
//! 10 ms and delivers fired timeouts as `Response`-type messages (§4.4).
//!
//! Grounded on `skynet_timer.c`'s `thread_timer` loop: sleep one tick, call
//! `skynet_updatetime`/`timer_update`, dispatch whatever fired. We fold "what to do with
//! a fired timer" into [`TimerService::deliver`] rather than a raw callback pointer, same
//! treatment [`hive_core::context`] gives service callbacks.

pub mod wheel;

use hive_core::{GlobalQueue, Handle, Message, MessageType, Registry, Session, Spinlock};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use wheel::TimingWheel;

/// How often the timer thread wakes up. Matches skynet's fixed 10 ms tick (§3).
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Owns the timing wheel and the handles needed to deliver fired timeouts into the rest
/// of the runtime: the registry (to find a still-live target's mailbox) and the global
/// queue (to make that mailbox visible to dispatcher workers).
#[derive(Debug)]
pub struct TimerService {
    wheel: Spinlock<TimingWheel>,
    registry: Arc<Registry>,
    queue: Arc<GlobalQueue>,
    shutdown: AtomicBool,
}

impl TimerService {
    #[must_use]
    pub fn new(registry: Arc<Registry>, queue: Arc<GlobalQueue>) -> Arc<Self> {
        Arc::new(TimerService {
            wheel: Spinlock::new(TimingWheel::new()),
            registry,
            queue,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn current_tick(&self) -> u64 { self.wheel.lock().current_tick() }

    /// §4.4 `timeout`: schedules a `Response` message carrying `session` to be delivered
    /// to `handle` after `ticks` ticks. `ticks <= 0` delivers immediately, without ever
    /// touching the wheel - mirrors the C source's early-return for `time <= 0`.
    pub fn timeout(&self, handle: Handle, session: Session, ticks: i32) {
        if ticks <= 0 {
            self.deliver(handle, session);
        } else {
            self.wheel.lock().schedule(handle, session, ticks as u64);
        }
    }

    /// Runs the tick loop on the calling thread until [`TimerService::request_shutdown`]
    /// is observed. Intended to be the sole body of a dedicated OS thread (§5 "Thread
    /// roles").
    pub fn run(self: &Arc<Self>) {
        while !self.shutdown.load(Ordering::SeqCst) {
            thread::sleep(TICK_INTERVAL);
            let fired = self.wheel.lock().tick();
            for f in fired {
                self.deliver(f.handle, f.session);
            }
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.wake_all();
    }

    /// Delivers one fired (or immediate) timeout. A target that has since retired is not
    /// an error - timers outlive nothing, per the Open Question resolution recorded in
    /// the design ledger - so this only logs at `debug`, matching `skynet_timer.c`
    /// silently dropping the event when `skynet_context_grab` returns NULL.
    fn deliver(&self, handle: Handle, session: Session) {
        let Some(ctx) = self.registry.grab(handle) else {
            tracing::debug!(%handle, %session, "timer fired for a retired service, dropping");
            return;
        };
        let msg = Message::new(Handle::NONE, session, MessageType::Response, Vec::new());
        ctx.mailbox.push(msg, &self.queue);
        ctx.release_ref();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::Context;
    use pretty_assertions::assert_eq;
    use std::{thread, time::Duration as StdDuration};

    #[test]
    fn immediate_timeout_delivers_without_advancing_wheel() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();

        let timer = TimerService::new(Arc::clone(&registry), Arc::clone(&queue));
        timer.timeout(ctx.handle, Session::new(5), 0);

        assert_eq!(queue.len(), 1);
        let mb = queue.try_pop().unwrap();
        let msg = mb.pop().unwrap();
        assert_eq!(msg.session, Session::new(5));
        assert_eq!(msg.kind, MessageType::Response);
    }

    #[test]
    fn timeout_to_retired_handle_does_not_panic() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let timer = TimerService::new(Arc::clone(&registry), Arc::clone(&queue));
        timer.timeout(Handle::from_parts(0, 999), Session::new(1), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn run_loop_delivers_after_enough_ticks_and_stops_on_shutdown() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();

        let timer = TimerService::new(Arc::clone(&registry), Arc::clone(&queue));
        timer.timeout(ctx.handle, Session::new(1), 2);

        let handle = Arc::clone(&timer);
        let thread_handle = thread::spawn(move || handle.run());

        thread::sleep(StdDuration::from_millis(200));
        timer.request_shutdown();
        thread_handle.join().unwrap();

        assert_eq!(queue.len(), 1);
    }
}
