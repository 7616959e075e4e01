// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The 19-byte UDP peer address encoding appended to every inbound `UDP` pseudo-message
//! payload (§4 "Socket object", `UDP_ADDRESS_SIZE`). Grounded on `socket_server.c`'s
//! `udp_socket_address`/`socket_server_udp_send`.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

/// Fixed wire width: 1 type byte + 2 port bytes + 16 bytes of address (IPv4 addresses
/// are left-padded with zero into the 16-byte field).
pub const UDP_ADDRESS_SIZE: usize = 19;

const TYPE_IPV4: u8 = 4;
const TYPE_IPV6: u8 = 6;

/// Encodes `addr` into the fixed 19-byte wire form carried after a UDP payload.
#[must_use]
pub fn encode(addr: SocketAddr) -> [u8; UDP_ADDRESS_SIZE] {
    let mut out = [0u8; UDP_ADDRESS_SIZE];
    match addr {
        SocketAddr::V4(v4) => {
            out[0] = TYPE_IPV4;
            out[1..3].copy_from_slice(&v4.port().to_be_bytes());
            out[3..7].copy_from_slice(&v4.ip().octets());
        }
        SocketAddr::V6(v6) => {
            out[0] = TYPE_IPV6;
            out[1..3].copy_from_slice(&v6.port().to_be_bytes());
            out[3..19].copy_from_slice(&v6.ip().octets());
        }
    }
    out
}

/// Decodes a 19-byte wire address back into a [`SocketAddr`]. Returns `None` for an
/// unrecognized type byte or a short buffer - callers treat this as a malformed frame.
#[must_use]
pub fn decode(raw: &[u8]) -> Option<SocketAddr> {
    if raw.len() < UDP_ADDRESS_SIZE {
        return None;
    }
    let port = u16::from_be_bytes([raw[1], raw[2]]);
    match raw[0] {
        TYPE_IPV4 => {
            let octets: [u8; 4] = raw[3..7].try_into().unwrap();
            Some(SocketAddr::from((Ipv4Addr::from(octets), port)))
        }
        TYPE_IPV6 => {
            let octets: [u8; 16] = raw[3..19].try_into().unwrap();
            Some(SocketAddr::from((Ipv6Addr::from(octets), port)))
        }
        _ => None,
    }
}
