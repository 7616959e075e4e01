// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The `send` primitive (§4.2, §7 "InvalidTarget"): every other crate - the reactor, the
//! cluster decoder, the module loader - reaches a mailbox through this function rather
//! than poking `Registry`/`GlobalQueue` directly.

use hive_core::{Error, GlobalQueue, Handle, Message, MessageType, Registry, Result, Session};

/// Delivers `payload` to `target`. On success, bumps `target`'s mailbox and (if it was
/// idle) links it into `queue` for a worker to pick up.
///
/// If `target` is handle `0` or no longer registered, this is [`Error::InvalidTarget`]
/// (§7): unless `session` is a push, an `ERROR` pseudo-message carrying the same session
/// is delivered back to `source` so a caller waiting on a response doesn't hang forever.
pub fn send(
    registry: &Registry,
    queue: &GlobalQueue,
    source: Handle,
    target: Handle,
    session: Session,
    kind: MessageType,
    payload: Vec<u8>,
) -> Result<()> {
    let Some(ctx) = registry.grab(target) else {
        if !session.is_push() {
            reply_invalid_target(registry, queue, source, session);
        }
        return Err(Error::InvalidTarget(target));
    };

    let msg = Message::new(source, session, kind, payload);
    if let Some(len) = ctx.mailbox.push(msg, queue) {
        tracing::warn!(%target, len, "service mailbox may be overloaded");
    }
    ctx.release_ref();
    Ok(())
}

fn reply_invalid_target(registry: &Registry, queue: &GlobalQueue, source: Handle, session: Session) {
    let Some(ctx) = registry.grab(source) else { return };
    let msg = Message::new(Handle::NONE, session, MessageType::Error, Vec::new());
    ctx.mailbox.push(msg, queue);
    ctx.release_ref();
}
