// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Control-channel commands submitted by application threads and drained by the
//! reactor thread (§4.5). Grounded on `socket_server.c`'s `request_*` union and its
//! single-byte command dispatch in `ctrl_cmd`.
//!
//! The original multiplexes these over an anonymous pipe as `{type_byte, length_byte,
//! body}`; here each variant is just an enum case sent over an `mpsc::Sender<Command>`
//! (see the Open Question resolution recorded in `DESIGN.md`), so there is no wire
//! encoding to get wrong and no `PIPE_BUF` atomicity to reason about.

use crate::socket::{Priority, Protocol, SocketId};
use hive_core::Handle;
use std::net::SocketAddr;
use std::os::fd::RawFd;

#[derive(Debug)]
pub enum Command {
    /// `'O'` - connect to `addr`, reserving `id` synchronously before this command was
    /// even sent.
    Connect { id: SocketId, addr: SocketAddr, opaque: Handle },
    /// `'L'` - take over an already-listening fd.
    Listen { id: SocketId, fd: RawFd, opaque: Handle },
    /// `'B'` - take over an arbitrary already-connected fd.
    Bind { id: SocketId, fd: RawFd, opaque: Handle },
    /// `'K'` - close, optionally shutting down the write half first.
    Close { id: SocketId, shutdown: bool },
    /// `'R'` - resume reading (enable read interest).
    ResumeRead { id: SocketId },
    /// `'S'` - pause reading (disable read interest; backpressure).
    PauseRead { id: SocketId },
    /// `'U'` - attach a UDP fd.
    UdpAttach { id: SocketId, fd: RawFd, protocol: Protocol, opaque: Handle },
    /// `'N'` - attach a UDP fd and dial a default peer in one step.
    UdpDial { id: SocketId, fd: RawFd, peer: SocketAddr, opaque: Handle },
    /// `'C'` - set (or replace) the default peer for a UDP socket.
    UdpSetDefault { id: SocketId, peer: SocketAddr },
    /// `'D'`/`'P'` - send on a connected TCP (or default-peer UDP) socket.
    Send { id: SocketId, priority: Priority, data: Vec<u8> },
    /// `'A'` - UDP `sendto` a specific peer.
    UdpSendTo { id: SocketId, peer: SocketAddr, data: Vec<u8> },
    /// `'W'` - re-enable writable interest after the direct-write fast path stashed a
    /// partial send in the socket's `FastPath::stash`.
    EnableWrite { id: SocketId },
    /// `'X'` - shut the reactor thread down.
    Exit,
}
