// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The reactor thread: one dedicated OS thread owning an `mio::Poll`, a socket table,
//! and a control channel drained between poll ticks (§4.5). Grounded on
//! `socket_server.c`'s `socket_server_poll` dispatch loop for the state machine and send
//! path, and on `tui/src/core/resilient_reactor_thread/rrt_worker.rs` for the Rust shape
//! of "one thread, woken out-of-band, processing commands before touching readiness
//! events" - though unlike `RRTWorker` this reactor has no restart policy: a poll error
//! here is fatal to the thread, matching the original's single long-lived I/O thread.

use crate::{
    command::Command,
    error::{NetError, Result},
    event::SocketEvent,
    socket::{FastPath, Priority, Protocol, Socket, SocketId, SocketState, MAX_SOCKETS},
};
use hive_core::{GlobalQueue, Handle, Message, MessageType, Registry, Session};
use mio::{
    net::{TcpListener, TcpStream, UdpSocket},
    Events, Interest, Poll, Token, Waker,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{self, Read, Write},
    net::SocketAddr,
    os::fd::{AsRawFd, FromRawFd, RawFd},
    sync::{mpsc, Arc},
    thread::JoinHandle,
};

const CONTROL_TOKEN: Token = Token(usize::MAX);
const MAX_UDP_PACKET: usize = 65535;

struct IdAllocatorState {
    next_fresh: u32,
    free_slots: Vec<u16>,
    generations: Vec<u16>,
}

/// Allocates and recycles [`SocketId`]s (§4.5 "Id recycling"): a fresh slot off a
/// monotonic counter, or a recycled one off the free list with its generation bumped so
/// a stale command referencing the old generation is silently ignored.
#[derive(Debug)]
pub struct IdAllocator {
    inner: Mutex<IdAllocatorState>,
}

impl Default for IdAllocator {
    fn default() -> Self { Self::new() }
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        IdAllocator { inner: Mutex::new(IdAllocatorState { next_fresh: 0, free_slots: Vec::new(), generations: vec![0; MAX_SOCKETS] }) }
    }

    #[must_use]
    pub fn reserve(&self) -> SocketId {
        let mut st = self.inner.lock();
        let slot = if let Some(s) = st.free_slots.pop() {
            s
        } else {
            let s = st.next_fresh as u16;
            st.next_fresh = (st.next_fresh + 1) % MAX_SOCKETS as u32;
            s
        };
        let generation = st.generations[slot as usize];
        SocketId::from_parts(slot, generation)
    }

    pub fn release(&self, id: SocketId) {
        let mut st = self.inner.lock();
        let slot = id.slot();
        st.generations[slot] = st.generations[slot].wrapping_add(1);
        st.free_slots.push(slot as u16);
    }
}

enum Source {
    Listener(TcpListener),
    Stream(TcpStream),
    Udp(UdpSocket),
}

struct Entry {
    socket: Socket,
    source: Source,
    udp_peer: Option<SocketAddr>,
}

enum DirectWrite {
    Full,
    Partial(usize),
    WouldBlock,
    Error,
}

fn direct_write(fd: RawFd, data: &[u8]) -> DirectWrite {
    if data.is_empty() {
        return DirectWrite::Full;
    }
    let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
    if n < 0 {
        if io::Error::last_os_error().kind() == io::ErrorKind::WouldBlock {
            DirectWrite::WouldBlock
        } else {
            DirectWrite::Error
        }
    } else if n as usize == data.len() {
        DirectWrite::Full
    } else {
        DirectWrite::Partial(n as usize)
    }
}

/// A cloneable, `Send + Sync` handle application threads use to submit commands to the
/// reactor thread. Owns no socket state itself - every mutation funnels through
/// `command_tx` and wakes the reactor's `Poll::poll` via `waker` (§4.5), except for the
/// direct-write fast path in [`ReactorHandle::send`], which reaches across to a
/// per-socket [`FastPath`] lock shared with the reactor thread.
#[derive(Clone)]
pub struct ReactorHandle {
    command_tx: mpsc::Sender<Command>,
    waker: Arc<Waker>,
    ids: Arc<IdAllocator>,
    fast_path_fds: Arc<Mutex<HashMap<u32, Arc<Mutex<FastPath>>>>>,
}

impl ReactorHandle {
    #[must_use]
    pub fn reserve_id(&self) -> SocketId { self.ids.reserve() }

    pub fn connect(&self, id: SocketId, addr: SocketAddr, opaque: Handle) -> Result<()> {
        self.submit(Command::Connect { id, addr, opaque })
    }

    pub fn listen(&self, id: SocketId, fd: RawFd, opaque: Handle) -> Result<()> {
        self.submit(Command::Listen { id, fd, opaque })
    }

    pub fn bind(&self, id: SocketId, fd: RawFd, opaque: Handle) -> Result<()> {
        self.submit(Command::Bind { id, fd, opaque })
    }

    pub fn close(&self, id: SocketId, shutdown: bool) -> Result<()> {
        self.submit(Command::Close { id, shutdown })
    }

    pub fn pause_read(&self, id: SocketId) -> Result<()> { self.submit(Command::PauseRead { id }) }

    pub fn resume_read(&self, id: SocketId) -> Result<()> { self.submit(Command::ResumeRead { id }) }

    pub fn udp_attach(&self, id: SocketId, fd: RawFd, protocol: Protocol, opaque: Handle) -> Result<()> {
        self.submit(Command::UdpAttach { id, fd, protocol, opaque })
    }

    pub fn udp_dial(&self, id: SocketId, fd: RawFd, peer: SocketAddr, opaque: Handle) -> Result<()> {
        self.submit(Command::UdpDial { id, fd, peer, opaque })
    }

    pub fn udp_set_default(&self, id: SocketId, peer: SocketAddr) -> Result<()> {
        self.submit(Command::UdpSetDefault { id, peer })
    }

    pub fn udp_sendto(&self, id: SocketId, peer: SocketAddr, data: Vec<u8>) -> Result<()> {
        self.submit(Command::UdpSendTo { id, peer, data })
    }

    /// Sends `data` on a connected socket. High-priority sends first try the
    /// direct-write fast path (§4.5): if `id` has a [`FastPath`] slot on file, its lock
    /// is taken for the rest of this call - this is the per-socket lock, not the table
    /// lock, which is only held long enough to clone the `Arc` - and, provided no
    /// earlier short write is still waiting to be spliced back in, a non-blocking
    /// `write(2)` is attempted right here with no command crossing the channel at all.
    ///
    /// A short write stashes the unsent remainder in the slot and wakes the reactor with
    /// [`Command::EnableWrite`] rather than re-submitting the remainder as an ordinary
    /// send: the reactor thread pulls the stash onto the very front of the write queue
    /// (see [`Reactor::splice_fast_path_stash`]) before it lets anything else for this
    /// socket reach the wire, so a second `send` call - even one that arrives here while
    /// the stash is still in flight and falls back to [`Command::Send`] - can never
    /// overtake it. Without holding the lock across the write and checking the stash
    /// first, a concurrent direct write on the same socket could land on the wire ahead
    /// of an already-short-written chunk and reorder the stream.
    pub fn send(&self, id: SocketId, priority: Priority, data: Vec<u8>) -> Result<()> {
        if priority == Priority::High {
            let slot = self.fast_path_fds.lock().get(&id.raw()).cloned();
            if let Some(slot) = slot {
                let mut guard = slot.lock();
                if guard.stash.is_none() {
                    if let Some(fd) = guard.fd {
                        match direct_write(fd, &data) {
                            DirectWrite::Full => return Ok(()),
                            DirectWrite::Partial(sent) => {
                                guard.stash = Some(data[sent..].to_vec());
                                drop(guard);
                                return self.submit(Command::EnableWrite { id });
                            }
                            DirectWrite::WouldBlock | DirectWrite::Error => {}
                        }
                    }
                }
            }
        }
        self.submit(Command::Send { id, priority, data })
    }

    pub fn exit(&self) -> Result<()> { self.submit(Command::Exit) }

    fn submit(&self, cmd: Command) -> Result<()> {
        self.command_tx.send(cmd).map_err(|_| NetError::ReactorStopped)?;
        self.waker.wake().map_err(NetError::from)
    }
}

/// Owns the reactor's `mio::Poll`, socket table, and command queue. Lives entirely on
/// the thread [`spawn`] creates for it.
pub struct Reactor {
    poll: Poll,
    command_rx: mpsc::Receiver<Command>,
    registry: Arc<Registry>,
    queue: Arc<GlobalQueue>,
    ids: Arc<IdAllocator>,
    fast_path_fds: Arc<Mutex<HashMap<u32, Arc<Mutex<FastPath>>>>>,
    entries: HashMap<usize, Entry>,
}

/// Spawns the reactor thread and returns a handle application threads can clone freely,
/// plus the thread's `JoinHandle` for orderly shutdown.
pub fn spawn(registry: Arc<Registry>, queue: Arc<GlobalQueue>) -> io::Result<(ReactorHandle, JoinHandle<()>)> {
    let poll = Poll::new()?;
    let waker = Arc::new(Waker::new(poll.registry(), CONTROL_TOKEN)?);
    let (command_tx, command_rx) = mpsc::channel();
    let ids = Arc::new(IdAllocator::new());
    let fast_path_fds = Arc::new(Mutex::new(HashMap::new()));

    let reactor = Reactor {
        poll,
        command_rx,
        registry,
        queue,
        ids: Arc::clone(&ids),
        fast_path_fds: Arc::clone(&fast_path_fds),
        entries: HashMap::new(),
    };
    let handle = ReactorHandle { command_tx, waker, ids, fast_path_fds };

    let join = std::thread::Builder::new()
        .name("hive-reactor".into())
        .spawn(move || reactor.run())
        .expect("failed to spawn hive-net reactor thread");
    Ok((handle, join))
}

impl Reactor {
    fn run(mut self) {
        let mut events = Events::with_capacity(1024);
        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                tracing::error!(error = %e, "reactor poll failed, shutting down");
                break;
            }

            let mut exit = false;
            for event in events.iter() {
                if event.token() == CONTROL_TOKEN {
                    if self.drain_commands() {
                        exit = true;
                    }
                    continue;
                }
                self.handle_socket_event(event);
            }
            if exit {
                break;
            }
        }
        tracing::debug!("reactor thread exiting");
    }

    fn drain_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(Command::Exit) => return true,
                Ok(cmd) => self.apply(cmd),
                Err(mpsc::TryRecvError::Empty) => return false,
                Err(mpsc::TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { id, addr, opaque } => self.do_connect(id, addr, opaque),
            Command::Listen { id, fd, opaque } => self.do_listen(id, fd, opaque),
            Command::Bind { id, fd, opaque } => self.do_bind(id, fd, opaque),
            Command::Close { id, shutdown } => self.do_close(id, shutdown),
            Command::ResumeRead { id } => self.set_read_enabled(id, true),
            Command::PauseRead { id } => self.set_read_enabled(id, false),
            Command::UdpAttach { id, fd, protocol, opaque } => self.do_udp_attach(id, fd, protocol, opaque, None),
            Command::UdpDial { id, fd, peer, opaque } => {
                let protocol = if peer.is_ipv6() { Protocol::UdpV6 } else { Protocol::UdpV4 };
                self.do_udp_attach(id, fd, protocol, opaque, Some(peer));
            }
            Command::UdpSetDefault { id, peer } => {
                if let Some(entry) = self.entries.get_mut(&id.slot()) {
                    entry.udp_peer = Some(peer);
                }
            }
            Command::Send { id, priority, data } => self.enqueue_send(id, priority, data),
            Command::UdpSendTo { id, peer, data } => self.udp_sendto(id, peer, data),
            Command::EnableWrite { id } => self.try_flush(id),
            Command::Exit => unreachable!("Exit is handled by drain_commands before reaching apply"),
        }
    }

    fn do_connect(&mut self, id: SocketId, addr: SocketAddr, opaque: Handle) {
        match TcpStream::connect(addr) {
            Ok(mut stream) => {
                let token = Token(id.slot());
                if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE | Interest::WRITABLE) {
                    self.deliver_error(id, opaque, &e);
                    return;
                }
                let mut socket = Socket::new(id, Protocol::Tcp, opaque);
                socket.state = SocketState::Connecting;
                self.entries.insert(id.slot(), Entry { socket, source: Source::Stream(stream), udp_peer: None });
            }
            Err(e) => self.deliver_error(id, opaque, &e),
        }
    }

    fn do_listen(&mut self, id: SocketId, fd: RawFd, opaque: Handle) {
        let std_listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };
        if let Err(e) = std_listener.set_nonblocking(true) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut listener = TcpListener::from_std(std_listener);
        let token = Token(id.slot());
        if let Err(e) = self.poll.registry().register(&mut listener, token, Interest::READABLE) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut socket = Socket::new(id, Protocol::Tcp, opaque);
        socket.state = SocketState::Listening;
        self.entries.insert(id.slot(), Entry { socket, source: Source::Listener(listener), udp_peer: None });
    }

    fn do_bind(&mut self, id: SocketId, fd: RawFd, opaque: Handle) {
        let std_stream = unsafe { std::net::TcpStream::from_raw_fd(fd) };
        if let Err(e) = std_stream.set_nonblocking(true) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut stream = TcpStream::from_std(std_stream);
        let token = Token(id.slot());
        if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut socket = Socket::new(id, Protocol::Tcp, opaque);
        socket.state = SocketState::Connected;
        self.entries.insert(id.slot(), Entry { socket, source: Source::Stream(stream), udp_peer: None });
        self.deliver(opaque, SocketEvent::Connect { id });
        self.update_fast_path(id);
    }

    fn do_udp_attach(&mut self, id: SocketId, fd: RawFd, protocol: Protocol, opaque: Handle, peer: Option<SocketAddr>) {
        let std_udp = unsafe { std::net::UdpSocket::from_raw_fd(fd) };
        if let Err(e) = std_udp.set_nonblocking(true) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut udp = UdpSocket::from_std(std_udp);
        if let Some(peer) = peer {
            if let Err(e) = udp.connect(peer) {
                self.deliver_error(id, opaque, &e);
                return;
            }
        }
        let token = Token(id.slot());
        if let Err(e) = self.poll.registry().register(&mut udp, token, Interest::READABLE) {
            self.deliver_error(id, opaque, &e);
            return;
        }
        let mut socket = Socket::new(id, protocol, opaque);
        socket.state = SocketState::Connected;
        self.entries.insert(id.slot(), Entry { socket, source: Source::Udp(udp), udp_peer: peer });
    }

    fn do_close(&mut self, id: SocketId, shutdown: bool) {
        if let Some(mut entry) = self.entries.remove(&id.slot()) {
            let opaque = entry.socket.opaque;
            match &mut entry.source {
                Source::Stream(s) => {
                    let _ = self.poll.registry().deregister(s);
                    if shutdown {
                        let _ = s.shutdown(std::net::Shutdown::Write);
                    }
                }
                Source::Listener(l) => {
                    let _ = self.poll.registry().deregister(l);
                }
                Source::Udp(u) => {
                    let _ = self.poll.registry().deregister(u);
                }
            }
            entry.socket.fast_path.lock().fd = None;
            self.fast_path_fds.lock().remove(&id.raw());
            self.ids.release(id);
            self.deliver(opaque, SocketEvent::Close { id });
        }
    }

    fn set_read_enabled(&mut self, id: SocketId, enabled: bool) {
        let write_enabled = {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            entry.socket.read_enabled = enabled;
            entry.socket.should_enable_write_interest()
        };
        self.reregister_for(id, write_enabled);
    }

    fn enqueue_send(&mut self, id: SocketId, priority: Priority, data: Vec<u8>) {
        let warned = {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            entry.socket.write_queue.push(priority, data)
        };
        if warned {
            let (opaque, pending) = {
                let Some(entry) = self.entries.get(&id.slot()) else { return };
                (entry.socket.opaque, entry.socket.write_queue.pending_bytes() as u64)
            };
            self.deliver(opaque, SocketEvent::Warning { id, pending_bytes: pending });
        }
        self.try_flush(id);
    }

    fn udp_sendto(&mut self, id: SocketId, peer: SocketAddr, data: Vec<u8>) {
        let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
        if let Source::Udp(u) = &entry.source {
            if let Err(e) = u.send_to(&data, peer) {
                if e.kind() != io::ErrorKind::WouldBlock {
                    tracing::warn!(error = %e, ?id, "udp sendto failed");
                }
            }
        }
    }

    fn handle_socket_event(&mut self, event: &mio::event::Event) {
        let id = {
            let Some(entry) = self.entries.get(&event.token().0) else { return };
            entry.socket.id
        };
        if event.is_writable() {
            self.on_writable(id);
        }
        if event.is_readable() {
            self.on_readable(id);
        }
    }

    fn on_writable(&mut self, id: SocketId) {
        let transition = {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            if entry.socket.state != SocketState::Connecting {
                None
            } else {
                let err = match &entry.source {
                    Source::Stream(s) => s.take_error().unwrap_or(None),
                    _ => None,
                };
                Some((err, entry.socket.opaque))
            }
        };

        if let Some((err, opaque)) = transition {
            match err {
                None => {
                    if let Some(entry) = self.entries.get_mut(&id.slot()) {
                        entry.socket.state = SocketState::Connected;
                    }
                    self.deliver(opaque, SocketEvent::Connect { id });
                }
                Some(e) => {
                    self.deliver(opaque, SocketEvent::Error { id, message: e.to_string() });
                    self.do_close(id, false);
                    return;
                }
            }
        }

        self.try_flush(id);
    }

    fn on_readable(&mut self, id: SocketId) {
        let info = {
            let Some(entry) = self.entries.get(&id.slot()) else { return };
            (entry.socket.protocol, entry.socket.state)
        };
        match info {
            (Protocol::Tcp, SocketState::Listening) => self.accept_loop(id),
            (Protocol::Tcp, _) => self.read_tcp(id),
            (Protocol::UdpV4, _) | (Protocol::UdpV6, _) => self.read_udp(id),
        }
    }

    fn accept_loop(&mut self, id: SocketId) {
        loop {
            let accepted = {
                let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
                match &mut entry.source {
                    Source::Listener(l) => l.accept(),
                    _ => return,
                }
            };
            let mut new_stream = match accepted {
                Ok((stream, _peer)) => stream,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            };

            let opaque = match self.entries.get(&id.slot()) {
                Some(entry) => entry.socket.opaque,
                None => return,
            };
            let new_id = self.ids.reserve();
            let token = Token(new_id.slot());
            if self.poll.registry().register(&mut new_stream, token, Interest::READABLE).is_err() {
                self.ids.release(new_id);
                continue;
            }
            let mut socket = Socket::new(new_id, Protocol::Tcp, opaque);
            socket.state = SocketState::Connected;
            self.entries.insert(new_id.slot(), Entry { socket, source: Source::Stream(new_stream), udp_peer: None });
            self.deliver(opaque, SocketEvent::Accept { id, new_id });
            self.update_fast_path(new_id);
        }
    }

    fn read_tcp(&mut self, id: SocketId) {
        let window = {
            let Some(entry) = self.entries.get(&id.slot()) else { return };
            entry.socket.read_window
        };
        let mut buf = vec![0u8; window];
        let (result, opaque) = {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            let opaque = entry.socket.opaque;
            let result = match &mut entry.source {
                Source::Stream(s) => s.read(&mut buf),
                _ => return,
            };
            (result, opaque)
        };
        match result {
            Ok(0) => {
                self.deliver(opaque, SocketEvent::Close { id });
                self.do_close(id, false);
            }
            Ok(n) => {
                buf.truncate(n);
                if let Some(entry) = self.entries.get_mut(&id.slot()) {
                    entry.socket.bytes_read += n as u64;
                    entry.socket.adjust_read_window(n);
                }
                self.deliver(opaque, SocketEvent::Data { id, bytes: buf });
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                self.deliver(opaque, SocketEvent::Error { id, message: e.to_string() });
                self.do_close(id, false);
            }
        }
    }

    fn read_udp(&mut self, id: SocketId) {
        let mut buf = vec![0u8; MAX_UDP_PACKET];
        let (result, opaque) = {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            let opaque = entry.socket.opaque;
            let result = match &mut entry.source {
                Source::Udp(u) => u.recv_from(&mut buf),
                _ => return,
            };
            (result, opaque)
        };
        match result {
            Ok((n, peer)) => {
                buf.truncate(n);
                if let Some(entry) = self.entries.get_mut(&id.slot()) {
                    entry.socket.bytes_read += n as u64;
                }
                self.deliver(opaque, SocketEvent::Udp { id, bytes: buf, peer });
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => self.deliver(opaque, SocketEvent::Error { id, message: e.to_string() }),
        }
    }

    fn try_flush(&mut self, id: SocketId) {
        self.splice_fast_path_stash(id);

        let opaque;
        let needs_write_interest;
        let mut pending_error: Option<String> = None;

        {
            let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
            opaque = entry.socket.opaque;
            loop {
                let Some(front) = entry.socket.write_queue.promote_and_front_mut() else { break };
                let chunk = front.remaining().to_vec();
                let write_result = match &mut entry.source {
                    Source::Stream(s) => s.write(&chunk),
                    Source::Udp(u) => match entry.udp_peer {
                        Some(peer) => u.send_to(&chunk, peer),
                        None => u.send(&chunk),
                    },
                    Source::Listener(_) => break,
                };
                match write_result {
                    Ok(n) => {
                        entry.socket.bytes_written += n as u64;
                        if let Some(front) = entry.socket.write_queue.promote_and_front_mut() {
                            front.offset += n;
                        }
                        if n == chunk.len() {
                            entry.socket.write_queue.pop_sent_front();
                        } else {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        pending_error = Some(e.to_string());
                        entry.socket.state = SocketState::HalfCloseWrite;
                        break;
                    }
                }
            }
            needs_write_interest = entry.socket.should_enable_write_interest();
        }

        if let Some(message) = pending_error {
            self.deliver(opaque, SocketEvent::Error { id, message });
            self.do_close(id, false);
            return;
        }
        self.reregister_for(id, needs_write_interest);
        self.update_fast_path(id);
    }

    fn reregister_for(&mut self, id: SocketId, write_enabled: bool) {
        let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
        let token = Token(id.slot());
        let interest = match (entry.socket.read_enabled, write_enabled) {
            (true, true) => Interest::READABLE | Interest::WRITABLE,
            (true, false) => Interest::READABLE,
            (false, true) => Interest::WRITABLE,
            (false, false) => return,
        };
        let result = match &mut entry.source {
            Source::Stream(s) => self.poll.registry().reregister(s, token, interest),
            Source::Listener(l) => self.poll.registry().reregister(l, token, interest),
            Source::Udp(u) => self.poll.registry().reregister(u, token, interest),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, ?id, "failed to reregister socket interest");
        }
    }

    /// Keeps `fast_path_fds` in sync with whether `id` is currently a good candidate for
    /// [`ReactorHandle::send`]'s direct-write shortcut: a connected TCP socket with
    /// nothing already queued. Eligibility only ever grants a lock to try the fast path
    /// through, not a bare fd - the socket's [`FastPath::stash`] is the per-socket
    /// re-check that actually gates whether a given attempt is let through.
    fn update_fast_path(&mut self, id: SocketId) {
        let Some(entry) = self.entries.get(&id.slot()) else {
            self.fast_path_fds.lock().remove(&id.raw());
            return;
        };
        let eligible = entry.socket.state == SocketState::Connected && entry.socket.write_queue.is_empty();
        match &entry.source {
            Source::Stream(s) if eligible => {
                entry.socket.fast_path.lock().fd = Some(s.as_raw_fd());
                self.fast_path_fds.lock().insert(id.raw(), Arc::clone(&entry.socket.fast_path));
            }
            _ => {
                self.fast_path_fds.lock().remove(&id.raw());
            }
        }
    }

    /// Pulls a fast-path short write's stashed remainder, if any, onto the front of
    /// `id`'s `high` list before anything else for this socket is allowed to flush
    /// (§4.5). Called at the top of [`Reactor::try_flush`] so it runs no matter which
    /// command - [`Command::EnableWrite`] or a plain [`Command::Send`] queued behind the
    /// stash - is what triggers the next flush attempt.
    fn splice_fast_path_stash(&mut self, id: SocketId) {
        let Some(entry) = self.entries.get_mut(&id.slot()) else { return };
        let stashed = entry.socket.fast_path.lock().stash.take();
        if let Some(data) = stashed {
            entry.socket.write_queue.requeue_front_high(data);
        }
    }

    fn deliver_error(&mut self, id: SocketId, opaque: Handle, err: &io::Error) {
        self.ids.release(id);
        self.deliver(opaque, SocketEvent::Error { id, message: err.to_string() });
    }

    /// Pushes a socket pseudo-message to `opaque`'s mailbox. A target that has already
    /// retired is dropped silently (§4.4's same policy for timer deliveries: no error
    /// reply, to avoid reply cascades during shutdown).
    fn deliver(&mut self, opaque: Handle, event: SocketEvent) {
        let Some(ctx) = self.registry.grab(opaque) else {
            tracing::debug!(?opaque, "socket event target already retired, dropping silently");
            return;
        };
        let msg = Message::new(Handle::NONE, Session::PUSH, MessageType::Socket, event.encode());
        ctx.mailbox.push(msg, &self.queue);
        ctx.release_ref();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn id_allocator_hands_out_fresh_slots_before_recycling() {
        let alloc = IdAllocator::new();
        let a = alloc.reserve();
        let b = alloc.reserve();
        assert_ne!(a.slot(), b.slot());
        assert_eq!(a.generation(), 0);
    }

    #[test]
    fn released_slot_is_recycled_with_bumped_generation() {
        let alloc = IdAllocator::new();
        let a = alloc.reserve();
        alloc.release(a);
        let b = alloc.reserve();
        assert_eq!(a.slot(), b.slot());
        assert_eq!(b.generation(), a.generation() + 1);
    }

    #[test]
    fn spawn_and_exit_joins_cleanly() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let (handle, join) = spawn(registry, queue).expect("reactor spawn");
        handle.exit().expect("submit exit");
        join.join().expect("reactor thread panicked");
    }

    /// A sender whose writes always fit never touches the command channel (§8 scenario
    /// E5). Built directly against `ReactorHandle::send` rather than a running
    /// [`Reactor`], since the property under test is about what crosses `command_tx`,
    /// not about anything the reactor thread does with it.
    #[test]
    fn fast_path_carries_full_writes_without_crossing_the_command_channel() {
        use std::os::unix::net::UnixStream;

        let (app, mut peer) = UnixStream::pair().expect("socketpair");
        app.set_nonblocking(true).expect("nonblocking");
        let fd = app.as_raw_fd();

        let (command_tx, command_rx) = mpsc::channel();
        let poll = Poll::new().expect("poll");
        let waker = Arc::new(Waker::new(poll.registry(), CONTROL_TOKEN).expect("waker"));
        let fast_path_fds = Arc::new(Mutex::new(HashMap::new()));
        let id = SocketId::from_parts(0, 0);
        fast_path_fds.lock().insert(id.raw(), Arc::new(Mutex::new(FastPath { fd: Some(fd), stash: None })));
        let handle = ReactorHandle { command_tx, waker, ids: Arc::new(IdAllocator::new()), fast_path_fds };

        const WRITES: usize = 100_000;
        let reader = std::thread::spawn(move || {
            let mut buf = [0u8; 8192];
            let mut total = 0usize;
            while total < WRITES {
                match peer.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(e) => panic!("peer read failed: {e}"),
                }
            }
            total
        });

        for i in 0..WRITES {
            handle.send(id, Priority::High, vec![(i % 256) as u8]).expect("fast-path send");
        }
        drop(app);

        assert_eq!(reader.join().expect("reader thread panicked"), WRITES);
        assert!(command_rx.try_recv().is_err(), "a write that always fits must never reach the command channel");
    }

    /// Regression test for the reorder this fixes: a short direct write followed by a
    /// second high-priority send on the same socket must still land on the wire in
    /// order, not as `[header-prefix][body][header-suffix]`.
    #[test]
    fn partial_fast_path_write_is_not_overtaken_by_the_next_send() {
        use std::net::{TcpListener, TcpStream};
        use std::os::fd::IntoRawFd;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let sender = TcpStream::connect(addr).expect("connect sender");
        let (mut receiver, _) = listener.accept().expect("accept receiver");
        receiver.set_read_timeout(Some(std::time::Duration::from_secs(5))).expect("read timeout");

        // Shrink the sender's kernel buffer so the first, large write is guaranteed to
        // come back short instead of completing in one shot.
        let sender_fd = sender.as_raw_fd();
        let tiny: libc::c_int = 1;
        unsafe {
            libc::setsockopt(
                sender_fd,
                libc::SOL_SOCKET,
                libc::SO_SNDBUF,
                (&tiny as *const libc::c_int).cast(),
                std::mem::size_of::<libc::c_int>() as u32,
            );
        }
        let fd = sender.into_raw_fd();

        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let (handle, join) = spawn(registry, queue).expect("reactor spawn");
        let id = handle.reserve_id();
        handle.bind(id, fd, Handle::NONE).expect("bind");

        let header = vec![b'A'; 64 * 1024];
        let body = vec![b'B'; 4 * 1024];
        handle.send(id, Priority::High, header.clone()).expect("send header");
        handle.send(id, Priority::High, body.clone()).expect("send body");

        let expected_len = header.len() + body.len();
        let mut received = Vec::with_capacity(expected_len);
        let mut buf = [0u8; 8192];
        while received.len() < expected_len {
            let n = receiver.read(&mut buf).expect("receiver read");
            assert_ne!(n, 0, "connection closed before all bytes arrived");
            received.extend_from_slice(&buf[..n]);
        }

        let mut expected = header;
        expected.extend_from_slice(&body);
        assert_eq!(received, expected, "the reactor must never reorder bytes on the wire");

        handle.exit().expect("submit exit");
        join.join().expect("reactor thread panicked");
    }
}
