// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The worker dispatch loop: pops a mailbox off the global queue, drains an
//! adaptively-sized batch of messages into its context, and re-links the mailbox if work
//! remains (§4.2, §4.6).
//!
//! Grounded on `skynet_server.c`'s `skynet_context_message_dispatch` for the batching
//! rule and on the teacher's `rrt_worker.rs` for the "own thread, poll a shared
//! shutdown flag, exit cleanly" shape.

use crate::{monitor::ServiceMonitor, send::send};
use hive_core::{GlobalQueue, Handle, Mailbox, MessageType, Registry};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Static per-worker batch weight table (§4.2, §5): `-1` processes one message at a
/// time, `0` drains the whole queue, `1..=3` process a halving fraction of it. Assigned
/// round-robin to the configured worker count; workers past the 32nd default to weight
/// `0`, same as `skynet_start.c`.
pub const WEIGHT_TABLE: [i32; 32] = [
    -1, -1, -1, -1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3,
];

/// Looks up `worker_index`'s batch weight from [`WEIGHT_TABLE`], defaulting to `0` past
/// the table's end.
#[must_use]
pub fn weight_for(worker_index: usize) -> i32 {
    WEIGHT_TABLE.get(worker_index).copied().unwrap_or(0)
}

/// One worker thread's state. `run` is the entire thread body.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    weight: i32,
    queue: Arc<GlobalQueue>,
    registry: Arc<Registry>,
    monitor: Arc<ServiceMonitor>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    #[must_use]
    pub fn new(
        id: usize,
        weight: i32,
        queue: Arc<GlobalQueue>,
        registry: Arc<Registry>,
        monitor: Arc<ServiceMonitor>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Worker { id, weight, queue, registry, monitor, shutdown }
    }

    pub fn id(&self) -> usize { self.id }

    /// Runs until the shared shutdown flag is set, at which point the timer thread's
    /// final [`GlobalQueue::wake_all`] (§4.3 "Shutdown") unblocks this worker's
    /// `pop_blocking` call and it returns.
    pub fn run(&self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            let Some(mailbox) = self.queue.pop_blocking(|| self.shutdown.load(Ordering::SeqCst)) else {
                continue;
            };
            self.dispatch_one(&mailbox);
        }
    }

    /// Processes exactly one mailbox pulled off the global queue: a release (the owning
    /// service has exited), an orphaned mailbox (context already gone), or a batch of
    /// live messages.
    fn dispatch_one(&self, mailbox: &Arc<Mailbox>) {
        let handle = mailbox.handle;

        let Some(ctx) = self.registry.grab(handle) else {
            while mailbox.pop().is_some() {}
            return;
        };

        if mailbox.should_release() {
            mailbox.drain_on_release(|msg| {
                if !msg.session.is_push() {
                    let _ = send(
                        &self.registry,
                        &self.queue,
                        Handle::NONE,
                        msg.source,
                        msg.session,
                        MessageType::Error,
                        Vec::new(),
                    );
                }
            });
            ctx.release_ref();
            self.registry.retire(handle);
            return;
        }

        let mut batch_len = 1usize;
        let mut processed = 0usize;
        while processed < batch_len {
            let Some(msg) = mailbox.pop() else { break };
            if processed == 0 && self.weight >= 0 {
                batch_len = (mailbox.len() >> self.weight).max(1);
            }
            self.monitor.trigger(msg.source, handle);
            ctx.dispatch(msg);
            self.monitor.trigger(Handle::NONE, Handle::NONE);
            processed += 1;
        }

        // `pop()` only clears `in_global` once the mailbox drains to empty; if our batch
        // stopped short with work still queued, the flag is still set but the mailbox is
        // no longer linked (we detached it via `pop_blocking`), so we must relink it
        // ourselves.
        if !mailbox.is_empty() {
            self.queue.push(Arc::clone(mailbox));
        }

        ctx.release_ref();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{Context, Disposition, Message, MessageHandler, Session};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Counter(Arc<Mutex<Vec<i32>>>);
    impl MessageHandler for Counter {
        fn handle(&mut self, _ctx: &Context, msg: Message) -> Disposition {
            self.0.lock().unwrap().push(msg.session.get());
            Disposition::Free
        }
    }

    fn worker(weight: i32, registry: Arc<Registry>, queue: Arc<GlobalQueue>) -> Worker {
        Worker::new(0, weight, queue, registry, Arc::new(ServiceMonitor::new()), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn weight_table_matches_documented_shape() {
        assert_eq!(weight_for(0), -1);
        assert_eq!(weight_for(3), -1);
        assert_eq!(weight_for(4), 0);
        assert_eq!(weight_for(7), 0);
        assert_eq!(weight_for(8), 1);
        assert_eq!(weight_for(16), 2);
        assert_eq!(weight_for(24), 3);
        assert_eq!(weight_for(100), 0);
    }

    #[test]
    fn dispatch_one_with_weight_minus_one_processes_single_message() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();
        ctx.install_handler(Box::new(Counter(Arc::clone(&seen))));

        for i in 0..5 {
            ctx.mailbox.push(Message::new(Handle::NONE, Session::new(i), MessageType::Text, vec![]), &queue);
        }

        let w = worker(-1, Arc::clone(&registry), Arc::clone(&queue));
        let mb = queue.try_pop().unwrap();
        w.dispatch_one(&mb);

        assert_eq!(seen.lock().unwrap().len(), 1, "weight -1 processes exactly one message per pass");
        assert!(mb.in_global(), "leftover work must stay visible on the global queue");
    }

    #[test]
    fn dispatch_one_with_weight_zero_drains_everything() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ctx = registry.register(|h| Context::new(h, "svc")).unwrap();
        ctx.install_handler(Box::new(Counter(Arc::clone(&seen))));

        for i in 0..5 {
            ctx.mailbox.push(Message::new(Handle::NONE, Session::new(i), MessageType::Text, vec![]), &queue);
        }

        let w = worker(0, Arc::clone(&registry), Arc::clone(&queue));
        let mb = queue.try_pop().unwrap();
        w.dispatch_one(&mb);

        assert_eq!(seen.lock().unwrap().len(), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn release_drains_and_replies_error_for_non_push_messages() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let svc = registry.register(|h| Context::new(h, "svc")).unwrap();
        let caller = registry.register(|h| Context::new(h, "caller")).unwrap();

        svc.mailbox.push(Message::new(caller.handle, Session::new(7), MessageType::Text, vec![]), &queue);
        svc.mailbox.mark_release(&queue);

        let w = worker(0, Arc::clone(&registry), Arc::clone(&queue));
        let mb = queue.try_pop().unwrap();
        w.dispatch_one(&mb);

        assert!(registry.grab(svc.handle).is_none(), "released service must be retired");
        let reply_mb = queue.try_pop().unwrap();
        let reply = reply_mb.pop().unwrap();
        assert_eq!(reply.kind, MessageType::Error);
        assert_eq!(reply.session, Session::new(7));
    }
}
