// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The global run queue: a FIFO of mailboxes that have unhandled work, shared by every
//! worker thread (§4.2, §5). One spinlock protects both ends, same as `skynet_mq.c`'s
//! `global_queue`; we use a `VecDeque` of `Arc<Mailbox>` rather than hand-rolling an
//! intrusive linked list, since Rust's ownership model makes an `Arc`-based FIFO both
//! simpler and just as cheap for this workload (push/pop are O(1) either way).

use crate::{mailbox::Mailbox, spinlock::Spinlock};
use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
};

/// FIFO of mailboxes with pending work, plus the condition variable workers sleep on
/// when they observe it empty (§5 "Suspension points").
#[derive(Debug)]
pub struct GlobalQueue {
    inner: Spinlock<VecDeque<Arc<Mailbox>>>,
    /// Paired with a dummy `Mutex<()>` purely so `Condvar::wait` has something to
    /// reacquire; the actual queue state lives in `inner`, guarded by the spinlock.
    wake: (Mutex<()>, Condvar),
}

impl Default for GlobalQueue {
    fn default() -> Self { Self::new() }
}

impl GlobalQueue {
    #[must_use]
    pub fn new() -> Self {
        GlobalQueue {
            inner: Spinlock::new(VecDeque::new()),
            wake: (Mutex::new(()), Condvar::new()),
        }
    }

    /// Appends `mailbox` and wakes one sleeping worker.
    pub fn push(&self, mailbox: Arc<Mailbox>) {
        self.inner.lock().push_back(mailbox);
        // Notifying while not holding `wake.0` is fine: the guard in `pop_blocking`
        // reacquires it before checking `inner` again, so no wakeup is lost.
        self.wake.1.notify_one();
    }

    /// Non-blocking pop; `None` means the queue was empty at the instant of the check.
    pub fn try_pop(&self) -> Option<Arc<Mailbox>> { self.inner.lock().pop_front() }

    pub fn len(&self) -> usize { self.inner.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Pops a mailbox, sleeping on the condition variable while the queue is empty and
    /// `should_wake` (checked under the condvar's mutex on every spurious/real wakeup)
    /// returns `true`. Workers pass a closure that checks "has the runtime been told to
    /// shut down?" so the timer thread's shutdown broadcast (§4.3 "Shutdown") can wake
    /// every sleeping worker without anyone missing the exit signal.
    pub fn pop_blocking(&self, mut should_wake: impl FnMut() -> bool) -> Option<Arc<Mailbox>> {
        loop {
            if let Some(mb) = self.try_pop() {
                return Some(mb);
            }
            let guard = self.wake.0.lock().unwrap();
            if !should_wake() && self.is_empty() {
                let _unused = self.wake.1.wait(guard).unwrap();
            }
            if let Some(mb) = self.try_pop() {
                return Some(mb);
            }
            if should_wake() {
                return None;
            }
        }
    }

    /// Wakes every worker sleeping on this queue, used by the timer thread on shutdown
    /// (§4.3).
    pub fn wake_all(&self) { self.wake.1.notify_all(); }
}
