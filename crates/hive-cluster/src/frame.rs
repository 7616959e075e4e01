// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Cluster wire frame types (§4.7, §3). Grounded on `lualib-src/lua-cluster.c`'s packing
//! comment block: a target is either a numeric handle or a 1-255 byte service name, and
//! a request/response either fits under the 32 KiB multi-part threshold in one frame or
//! is split into a header frame plus a chain of body frames.
//!
//! Frames here never carry the 2-byte big-endian length prefix the original packs
//! alongside each frame - that belongs to the stream framing layer (`hive-net`'s
//! length-prefixed protocol), not to frame content.

/// Threshold above which a request or response body is split into multiple frames.
pub const MULTI_PART: usize = 0x8000;

/// Wire type bytes (§3).
pub mod wire_type {
    pub const REQUEST_SMALL_ID: u8 = 0x00;
    pub const REQUEST_MULTI_ID: u8 = 0x01;
    pub const MULTI_BODY: u8 = 0x02;
    pub const MULTI_BODY_LAST: u8 = 0x03;
    pub const TRACE: u8 = 0x04;
    pub const REQUEST_SMALL_NAME: u8 = 0x80;
    pub const REQUEST_MULTI_NAME: u8 = 0x81;
    pub const REQUEST_MULTI_ID_PUSH: u8 = 0x41;
    pub const REQUEST_MULTI_NAME_PUSH: u8 = 0xC1;
}

/// Response status byte (§4.7 "The response package").
pub mod response_type {
    pub const ERROR: u8 = 0;
    pub const OK: u8 = 1;
    pub const MULTI_BEGIN: u8 = 2;
    pub const MULTI_PART: u8 = 3;
    pub const MULTI_END: u8 = 4;
}

/// A request's destination: a numeric node-local handle, or a 1-255 byte service name
/// bound on the remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Id(u32),
    Name(Vec<u8>),
}

/// One decoded request frame. A caller reassembling a multi-part request accumulates
/// `MultiBody`/`MultiBodyLast` frames keyed by `session` (see
/// [`crate::reassembly::ReassemblyBuffer`]) until it has the header's declared
/// `total_len` bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestFrame {
    /// A complete request, under the multi-part threshold.
    Small { addr: Address, session: u32, is_push: bool, payload: Vec<u8> },
    /// Announces a multi-part request: `total_len` bytes of payload follow as a chain of
    /// [`RequestFrame::MultiBody`]/[`RequestFrame::MultiBodyLast`] frames sharing this
    /// `session`.
    MultiHeader { addr: Address, session: u32, total_len: u32, is_push: bool },
    MultiBody { session: u32, chunk: Vec<u8> },
    MultiBodyLast { session: u32, chunk: Vec<u8> },
    Trace { tag: Vec<u8> },
}

/// One decoded response frame (§4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFrame {
    Error { session: u32, message: Vec<u8> },
    Ok { session: u32, payload: Vec<u8> },
    MultiBegin { session: u32, total_len: u32 },
    MultiPart { session: u32, chunk: Vec<u8> },
    MultiEnd { session: u32, chunk: Vec<u8> },
}
