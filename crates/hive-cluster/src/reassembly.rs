// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Multi-part reassembly: accumulates a sequence of body chunks sharing one session
//! into a contiguous payload (§4.7).
//!
//! Grounded on `service-src`'s `databuffer`/`hashid` pairing: a small int-keyed slot
//! table holding partially-received buffers. We use a plain `HashMap` rather than the
//! original's open-addressed `hashid` table for the same reason `hive-core::registry`
//! does - the observable contract is what's pinned down, not the probing strategy.
//!
//! Intended to be owned per-connection: dropping the owning connection's
//! [`ReassemblyBuffer`] reclaims every partially-assembled session it was still holding,
//! with no explicit cleanup call needed.

use std::collections::HashMap;

#[derive(Debug)]
struct Pending {
    total_len: u32,
    received: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    pending: HashMap<u32, Pending>,
}

impl ReassemblyBuffer {
    #[must_use]
    pub fn new() -> Self { ReassemblyBuffer::default() }

    /// Registers a multi-part announcement: `total_len` bytes of body chunks will follow
    /// under `session`.
    pub fn begin(&mut self, session: u32, total_len: u32) {
        self.pending.insert(session, Pending { total_len, received: Vec::with_capacity(total_len as usize) });
    }

    /// Appends one body chunk. Returns the reassembled payload once `is_last` chunk for
    /// this session has arrived; the session's slot is freed at that point.
    ///
    /// A chunk for a session with no prior [`ReassemblyBuffer::begin`] call still
    /// accumulates - this tolerates a multi-part header and its first body chunk arriving
    /// out of the caller's expected order without losing bytes, though in practice the
    /// wire format always sends the header first.
    pub fn push_chunk(&mut self, session: u32, chunk: &[u8], is_last: bool) -> Option<Vec<u8>> {
        let pending = self.pending.entry(session).or_insert_with(|| Pending { total_len: 0, received: Vec::new() });
        pending.received.extend_from_slice(chunk);
        if is_last {
            self.pending.remove(&session).map(|p| p.received)
        } else {
            None
        }
    }

    /// Declared total length for a session still being reassembled, if known.
    pub fn expected_len(&self, session: u32) -> Option<u32> { self.pending.get(&session).map(|p| p.total_len) }

    pub fn pending_sessions(&self) -> usize { self.pending.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reassembles_chunks_in_order() {
        let mut buf = ReassemblyBuffer::new();
        buf.begin(1, 6);
        assert!(buf.push_chunk(1, b"foo", false).is_none());
        let result = buf.push_chunk(1, b"bar", true);
        assert_eq!(result, Some(b"foobar".to_vec()));
        assert_eq!(buf.pending_sessions(), 0);
    }

    #[test]
    fn independent_sessions_do_not_interleave() {
        let mut buf = ReassemblyBuffer::new();
        buf.begin(1, 3);
        buf.begin(2, 3);
        buf.push_chunk(2, b"xyz", false);
        buf.push_chunk(1, b"abc", false);
        let a = buf.push_chunk(1, b"!", true).unwrap();
        assert_eq!(a, b"abc!");
        assert_eq!(buf.pending_sessions(), 1);
    }

    #[test]
    fn dropping_the_buffer_reclaims_partial_sessions() {
        let mut buf = ReassemblyBuffer::new();
        buf.begin(1, 1000);
        buf.push_chunk(1, b"partial", false);
        assert_eq!(buf.pending_sessions(), 1);
        drop(buf);
        // No explicit cleanup API exists - ownership alone reclaims the memory.
    }
}
