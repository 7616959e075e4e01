// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The socket pseudo-message subtypes the reactor delivers (§3 "Network data arrives on
//! the reactor thread..."). `hive_core::mailbox::MessageType::Socket` only says "this
//! came from a socket"; the subtype and its per-kind payload are encoded here and carried
//! inside [`hive_core::mailbox::Message::payload`].

use crate::socket::SocketId;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Connect { id: SocketId },
    Accept { id: SocketId, new_id: SocketId },
    Close { id: SocketId },
    Error { id: SocketId, message: String },
    Warning { id: SocketId, pending_bytes: u64 },
    Data { id: SocketId, bytes: Vec<u8> },
    Udp { id: SocketId, bytes: Vec<u8>, peer: SocketAddr },
}

const TAG_CONNECT: u8 = 0;
const TAG_ACCEPT: u8 = 1;
const TAG_CLOSE: u8 = 2;
const TAG_ERROR: u8 = 3;
const TAG_WARNING: u8 = 4;
const TAG_DATA: u8 = 5;
const TAG_UDP: u8 = 6;

impl SocketEvent {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            SocketEvent::Connect { id } => {
                let mut out = vec![TAG_CONNECT];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out
            }
            SocketEvent::Accept { id, new_id } => {
                let mut out = vec![TAG_ACCEPT];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out.extend_from_slice(&new_id.raw().to_le_bytes());
                out
            }
            SocketEvent::Close { id } => {
                let mut out = vec![TAG_CLOSE];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out
            }
            SocketEvent::Error { id, message } => {
                let mut out = vec![TAG_ERROR];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out.extend_from_slice(message.as_bytes());
                out
            }
            SocketEvent::Warning { id, pending_bytes } => {
                let mut out = vec![TAG_WARNING];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out.extend_from_slice(&pending_bytes.to_le_bytes());
                out
            }
            SocketEvent::Data { id, bytes } => {
                let mut out = vec![TAG_DATA];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out.extend_from_slice(bytes);
                out
            }
            SocketEvent::Udp { id, bytes, peer } => {
                let mut out = vec![TAG_UDP];
                out.extend_from_slice(&id.raw().to_le_bytes());
                out.extend_from_slice(&crate::udp_addr::encode(*peer));
                out.extend_from_slice(bytes);
                out
            }
        }
    }

    #[must_use]
    pub fn decode(raw: &[u8]) -> Option<SocketEvent> {
        if raw.len() < 5 {
            return None;
        }
        let raw_id = u32::from_le_bytes(raw[1..5].try_into().ok()?);
        let id = SocketId::from_raw(raw_id);
        let rest = &raw[5..];
        match raw[0] {
            TAG_CONNECT => Some(SocketEvent::Connect { id }),
            TAG_ACCEPT => {
                let new_id = SocketId::from_raw(u32::from_le_bytes(rest.get(0..4)?.try_into().ok()?));
                Some(SocketEvent::Accept { id, new_id })
            }
            TAG_CLOSE => Some(SocketEvent::Close { id }),
            TAG_ERROR => Some(SocketEvent::Error { id, message: String::from_utf8_lossy(rest).into_owned() }),
            TAG_WARNING => {
                let pending_bytes = u64::from_le_bytes(rest.get(0..8)?.try_into().ok()?);
                Some(SocketEvent::Warning { id, pending_bytes })
            }
            TAG_DATA => Some(SocketEvent::Data { id, bytes: rest.to_vec() }),
            TAG_UDP => {
                let peer = crate::udp_addr::decode(rest)?;
                let bytes = rest.get(crate::udp_addr::UDP_ADDRESS_SIZE..)?.to_vec();
                Some(SocketEvent::Udp { id, bytes, peer })
            }
            _ => None,
        }
    }
}
