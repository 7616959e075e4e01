// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Cluster wire protocol: request/response framing and multi-part reassembly for
//! cross-node calls (§4.7).

mod decode;
mod encode;
mod error;
mod frame;
mod reassembly;

pub use decode::{decode_request, decode_response};
pub use encode::{encode_request, encode_response};
pub use error::{DecodeError, Result};
pub use frame::{response_type, wire_type, Address, RequestFrame, ResponseFrame, MULTI_PART};
pub use reassembly::ReassemblyBuffer;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A 1 MiB payload round-trips through multi-part request and response framing
    /// without byte loss or reordering.
    #[test]
    fn one_megabyte_payload_roundtrips_through_request_and_response_framing() {
        let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

        let request_frames = encode_request(&Address::Id(7), 1, false, &payload).unwrap();
        let header = match decode_request(&request_frames[0][2..]).unwrap() {
            RequestFrame::MultiHeader { total_len, .. } => total_len,
            other => panic!("expected MultiHeader, got {other:?}"),
        };
        assert_eq!(header as usize, payload.len());

        let mut reassembler = ReassemblyBuffer::new();
        reassembler.begin(1, header);
        let mut result = None;
        for raw in &request_frames[1..] {
            let (chunk, is_last) = match decode_request(&raw[2..]).unwrap() {
                RequestFrame::MultiBody { chunk, .. } => (chunk, false),
                RequestFrame::MultiBodyLast { chunk, .. } => (chunk, true),
                other => panic!("unexpected frame {other:?}"),
            };
            result = reassembler.push_chunk(1, &chunk, is_last);
        }
        assert_eq!(result.unwrap(), payload);

        let response_frames = encode_response(1, true, &payload);
        let mut reassembler = ReassemblyBuffer::new();
        let mut result = None;
        for raw in &response_frames {
            match decode_response(&raw[2..]).unwrap() {
                ResponseFrame::MultiBegin { total_len, .. } => reassembler.begin(1, total_len),
                ResponseFrame::MultiPart { chunk, .. } => {
                    result = reassembler.push_chunk(1, &chunk, false);
                }
                ResponseFrame::MultiEnd { chunk, .. } => {
                    result = reassembler.push_chunk(1, &chunk, true);
                }
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(result.unwrap(), payload);
    }

    /// E3: a node sends a multi-part request, the peer's connection drops mid-stream
    /// before the last chunk arrives - the reassembly buffer must hold only the partial
    /// bytes received so far and never panic or silently complete early.
    #[test]
    fn e3_dropped_connection_mid_multipart_leaves_no_spurious_completion() {
        let payload = vec![9u8; MULTI_PART * 3];
        let frames = encode_request(&Address::Id(1), 5, false, &payload).unwrap();

        let mut reassembler = ReassemblyBuffer::new();
        let header_total = match decode_request(&frames[0][2..]).unwrap() {
            RequestFrame::MultiHeader { total_len, .. } => total_len,
            other => panic!("expected MultiHeader, got {other:?}"),
        };
        reassembler.begin(5, header_total);

        // Simulate receiving all but the final frame before the peer disconnects.
        for raw in &frames[1..frames.len() - 1] {
            let chunk = match decode_request(&raw[2..]).unwrap() {
                RequestFrame::MultiBody { chunk, .. } => chunk,
                other => panic!("unexpected frame {other:?}"),
            };
            let result = reassembler.push_chunk(5, &chunk, false);
            assert!(result.is_none(), "must not complete before the last chunk");
        }

        assert_eq!(reassembler.pending_sessions(), 1);
        assert_eq!(reassembler.expected_len(5), Some(header_total));
        drop(reassembler); // connection teardown reclaims the partial session
    }
}
