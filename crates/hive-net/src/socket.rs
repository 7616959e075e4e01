// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Socket bookkeeping: ids, states, and the priority write queue (§4.5 "Socket object").
//! Grounded on `socket_server.c`'s `struct socket` and its `wb_list` pair.

use hive_core::Handle;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::sync::Arc;

/// `MAX_SOCKET_P` in the original: the socket table holds at most `2^16` live sockets.
pub const MAX_SOCKET_SHIFT: u32 = 16;
pub const MAX_SOCKETS: usize = 1 << MAX_SOCKET_SHIFT;

/// A socket id, generation-tagged the way [`hive_core::Handle`] tags its local id: the
/// low 16 bits select a slot in the reactor's socket table, the high 16 bits are a
/// generation counter bumped every time that slot is recycled. A `'W'`/send command
/// racing a closed-then-reopened slot carries the stale generation and is discarded
/// rather than landing on the wrong socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(u32);

impl SocketId {
    #[must_use]
    pub const fn from_parts(slot: u16, generation: u16) -> Self {
        SocketId(((generation as u32) << 16) | slot as u32)
    }

    #[must_use]
    pub const fn slot(self) -> usize { (self.0 & 0xFFFF) as usize }

    #[must_use]
    pub const fn generation(self) -> u16 { (self.0 >> 16) as u16 }

    #[must_use]
    pub const fn raw(self) -> u32 { self.0 }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self { SocketId(raw) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    UdpV4,
    UdpV6,
}

/// Socket lifecycle state (§4.5's state diagram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Invalid,
    Reserved,
    Listening,
    PendingListen,
    Connecting,
    Connected,
    PendingAccept,
    Bound,
    HalfCloseRead,
    HalfCloseWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Low,
}

/// One buffered, possibly partially-sent, outbound chunk.
#[derive(Debug)]
pub struct PendingWrite {
    pub data: Vec<u8>,
    pub offset: usize,
}

impl PendingWrite {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self { PendingWrite { data, offset: 0 } }

    #[must_use]
    pub fn remaining(&self) -> &[u8] { &self.data[self.offset..] }

    #[must_use]
    pub fn is_partially_sent(&self) -> bool { self.offset > 0 }

    #[must_use]
    pub fn is_fully_sent(&self) -> bool { self.offset >= self.data.len() }
}

const WARNING_SIZE: usize = 1024 * 1024;

/// The `high`/`low` write lists plus pending-byte accounting (§4.5 "Send path").
#[derive(Debug)]
pub struct WriteQueue {
    high: VecDeque<PendingWrite>,
    low: VecDeque<PendingWrite>,
    pending_bytes: usize,
    warn_size: usize,
}

impl Default for WriteQueue {
    fn default() -> Self { Self::new() }
}

impl WriteQueue {
    #[must_use]
    pub fn new() -> Self { WriteQueue { high: VecDeque::new(), low: VecDeque::new(), pending_bytes: 0, warn_size: 0 } }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.high.is_empty() && self.low.is_empty() }

    #[must_use]
    pub fn pending_bytes(&self) -> usize { self.pending_bytes }

    /// Enqueues `data` at `priority`. Returns `true` the first time `pending_bytes`
    /// crosses [`WARNING_SIZE`] (and each time it crosses the doubled threshold
    /// thereafter), signalling the caller to emit a `WARNING` pseudo-message.
    pub fn push(&mut self, priority: Priority, data: Vec<u8>) -> bool {
        self.pending_bytes += data.len();
        match priority {
            Priority::High => self.high.push_back(PendingWrite::new(data)),
            Priority::Low => self.low.push_back(PendingWrite::new(data)),
        }
        if self.pending_bytes >= WARNING_SIZE && self.pending_bytes >= self.warn_size.max(WARNING_SIZE) {
            self.warn_size = if self.warn_size == 0 { WARNING_SIZE * 2 } else { self.warn_size * 2 };
            true
        } else {
            false
        }
    }

    /// The next buffer to attempt a write against: `high`'s front if non-empty,
    /// otherwise `low`'s front, promoting a partially-sent `low` head into `high` first
    /// so a half-written buffer is never starved behind a fresh `high` push (§4.5).
    pub fn promote_and_front_mut(&mut self) -> Option<&mut PendingWrite> {
        if !self.high.is_empty() {
            return self.high.front_mut();
        }
        if let Some(front) = self.low.front() {
            if front.is_partially_sent() {
                let promoted = self.low.pop_front().unwrap();
                self.high.push_back(promoted);
                return self.high.front_mut();
            }
        }
        self.low.front_mut()
    }

    /// Splices a direct-write fast path's unsent remainder onto the very front of
    /// `high`, ahead of anything already buffered (§4.5): a short write from
    /// [`crate::reactor::ReactorHandle::send`] must reach the wire before any send
    /// queued behind it, not just before sends still waiting on the command channel.
    pub fn requeue_front_high(&mut self, data: Vec<u8>) {
        self.pending_bytes += data.len();
        self.high.push_front(PendingWrite::new(data));
    }

    /// Drops the fully-sent head of whichever list [`WriteQueue::promote_and_front_mut`]
    /// last returned, after the caller confirms `is_fully_sent()`.
    pub fn pop_sent_front(&mut self) {
        if let Some(front) = self.high.front() {
            if front.is_fully_sent() {
                let gone = self.high.pop_front().unwrap();
                self.pending_bytes -= gone.data.len();
                if self.is_empty() {
                    self.warn_size = 0;
                }
                return;
            }
        }
        if let Some(front) = self.low.front() {
            if front.is_fully_sent() {
                let gone = self.low.pop_front().unwrap();
                self.pending_bytes -= gone.data.len();
                if self.is_empty() {
                    self.warn_size = 0;
                }
            }
        }
    }
}

/// Per-socket state shared between [`crate::reactor::ReactorHandle::send`]'s
/// direct-write fast path, which runs on whichever application thread calls `send`,
/// and the reactor thread that owns the [`Socket`] itself. The lock around this struct
/// is the "per-socket lock" of §4.5: a fast-path write holds it for the duration of the
/// `write(2)` call, so a second fast-path send for the same socket - even from another
/// thread - either waits behind it or sees `stash` already populated and falls back to
/// the ordinary queued send, rather than racing a direct write past an unflushed one.
#[derive(Debug, Default)]
pub struct FastPath {
    pub fd: Option<RawFd>,
    /// The unsent remainder of a short direct write, staged here until the reactor
    /// thread splices it onto the front of `write_queue`'s `high` list.
    pub stash: Option<Vec<u8>>,
}

/// Reactor-owned bookkeeping for one socket. The live `mio` source (`TcpStream`,
/// `TcpListener`, `UdpSocket`) is kept in a separate table inside
/// [`crate::reactor::Reactor`] keyed by the same [`SocketId`] slot, since swapping
/// source types per-state (listener -> stream on accept) is simpler as an enum the
/// reactor owns directly than as a field here.
#[derive(Debug)]
pub struct Socket {
    pub id: SocketId,
    pub state: SocketState,
    pub protocol: Protocol,
    pub opaque: Handle,
    pub write_queue: WriteQueue,
    pub fast_path: Arc<Mutex<FastPath>>,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub udp_address: Option<[u8; crate::udp_addr::UDP_ADDRESS_SIZE]>,
    pub read_window: usize,
    pub read_enabled: bool,
}

const MIN_READ_BUFFER: usize = 64;

impl Socket {
    #[must_use]
    pub fn new(id: SocketId, protocol: Protocol, opaque: Handle) -> Self {
        Socket {
            id,
            state: SocketState::Reserved,
            protocol,
            opaque,
            write_queue: WriteQueue::new(),
            fast_path: Arc::new(Mutex::new(FastPath::default())),
            bytes_read: 0,
            bytes_written: 0,
            udp_address: None,
            read_window: MIN_READ_BUFFER,
            read_enabled: true,
        }
    }

    /// Adaptive read window: doubles on a read that fills the buffer, halves (floored at
    /// [`MIN_READ_BUFFER`]) on a read under half capacity (§4.5 "Receive path").
    pub fn adjust_read_window(&mut self, bytes_read: usize) {
        if bytes_read >= self.read_window {
            self.read_window *= 2;
        } else if self.read_window > MIN_READ_BUFFER && bytes_read * 2 < self.read_window {
            self.read_window = (self.read_window / 2).max(MIN_READ_BUFFER);
        }
    }

    #[must_use]
    pub fn should_enable_write_interest(&self) -> bool {
        !self.write_queue.is_empty() || self.fast_path.lock().stash.is_some()
    }
}
