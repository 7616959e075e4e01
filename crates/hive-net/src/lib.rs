// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Asynchronous socket reactor with an out-of-band control channel (§4.5).

mod command;
mod error;
mod event;
mod reactor;
mod socket;
mod udp_addr;

pub use command::Command;
pub use error::{NetError, Result};
pub use event::SocketEvent;
pub use reactor::{spawn, IdAllocator, Reactor, ReactorHandle};
pub use socket::{Priority, Protocol, Socket, SocketId, SocketState, MAX_SOCKETS};
pub use udp_addr::{decode as decode_udp_addr, encode as encode_udp_addr, UDP_ADDRESS_SIZE};

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{GlobalQueue, MessageType, Registry};
    use pretty_assertions::assert_eq;
    use std::{
        net::TcpListener as StdTcpListener,
        os::fd::IntoRawFd,
        sync::Arc,
        time::Duration,
    };

    /// E5: a TCP listener is handed over to the reactor, a peer connects, sends one
    /// frame, and the owning service observes `Accept`, `Connect`, and `Data` socket
    /// pseudo-messages in order - without ever touching a mailbox directly.
    #[test]
    fn e5_listener_handoff_accept_and_data_are_observed_by_the_owning_service() {
        let registry = Arc::new(Registry::new(0));
        let queue = Arc::new(GlobalQueue::new());
        let (net, join) = spawn(Arc::clone(&registry), Arc::clone(&queue)).expect("reactor spawn");

        let ctx = registry.register(|h| hive_core::Context::new(h, "owner")).unwrap();
        let owner = ctx.handle;

        let std_listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        let listener_id = net.reserve_id();
        net.listen(listener_id, std_listener.into_raw_fd(), owner).unwrap();

        // Give the reactor thread a moment to register the listener before connecting.
        std::thread::sleep(Duration::from_millis(50));

        let client = std::net::TcpStream::connect(addr).unwrap();
        let client_id = net.reserve_id();
        net.bind(client_id, client.into_raw_fd(), owner).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        net.send(client_id, Priority::High, b"hello".to_vec()).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let mut observed = Vec::new();
        while let Some(msg) = ctx.mailbox.pop() {
            assert_eq!(msg.kind, MessageType::Socket);
            observed.push(SocketEvent::decode(&msg.payload).expect("valid socket event"));
        }

        assert!(observed.iter().any(|e| matches!(e, SocketEvent::Accept { .. })), "missing Accept: {observed:?}");
        assert!(observed.iter().any(|e| matches!(e, SocketEvent::Connect { .. })), "missing Connect: {observed:?}");
        assert!(
            observed.iter().any(|e| matches!(e, SocketEvent::Data { bytes, .. } if bytes == b"hello")),
            "missing Data(\"hello\"): {observed:?}"
        );

        net.exit().unwrap();
        join.join().unwrap();
    }
}
