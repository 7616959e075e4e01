// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Encoding requests and responses into wire frames, each already carrying its 2-byte
//! big-endian length prefix (§4.7, §3). Grounded on `lua-cluster.c`'s `packreq_number`/
//! `packreq_string`/`packreq_multi`/`lpackresponse`.

use crate::{
    error::{DecodeError, Result},
    frame::{response_type, wire_type, Address, MULTI_PART},
};

fn with_length_prefix(body: Vec<u8>) -> Vec<u8> {
    let len = u16::try_from(body.len()).expect("frame bodies are bounded well under u16::MAX by MULTI_PART");
    let mut out = Vec::with_capacity(2 + body.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend(body);
    out
}

fn encode_multi_body(session: u32, payload: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut remaining = payload;
    loop {
        let take = remaining.len().min(MULTI_PART);
        let chunk = &remaining[..take];
        let is_last = remaining.len() <= MULTI_PART;
        let mut body = Vec::with_capacity(5 + chunk.len());
        body.push(if is_last { wire_type::MULTI_BODY_LAST } else { wire_type::MULTI_BODY });
        body.extend_from_slice(&session.to_le_bytes());
        body.extend_from_slice(chunk);
        frames.push(with_length_prefix(body));
        remaining = &remaining[take..];
        if is_last {
            break;
        }
    }
    frames
}

/// Encodes a request to `addr`. `session` must be strictly positive even for a push
/// (§4.7) - only the wire-level session field collapses to `0` when `is_push` is set.
pub fn encode_request(addr: &Address, session: u32, is_push: bool, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    if session == 0 {
        return Err(DecodeError::NonPositiveSession(0));
    }
    match addr {
        Address::Id(id) => Ok(encode_request_id(*id, session, is_push, payload)),
        Address::Name(name) => encode_request_name(name, session, is_push, payload),
    }
}

fn encode_request_id(addr: u32, session: u32, is_push: bool, payload: &[u8]) -> Vec<Vec<u8>> {
    let sz = payload.len();
    if sz < MULTI_PART {
        let mut body = Vec::with_capacity(9 + sz);
        body.push(wire_type::REQUEST_SMALL_ID);
        body.extend_from_slice(&addr.to_le_bytes());
        body.extend_from_slice(&(if is_push { 0 } else { session }).to_le_bytes());
        body.extend_from_slice(payload);
        vec![with_length_prefix(body)]
    } else {
        let mut header = Vec::with_capacity(13);
        header.push(if is_push { wire_type::REQUEST_MULTI_ID_PUSH } else { wire_type::REQUEST_MULTI_ID });
        header.extend_from_slice(&addr.to_le_bytes());
        header.extend_from_slice(&session.to_le_bytes());
        header.extend_from_slice(&(sz as u32).to_le_bytes());
        let mut frames = vec![with_length_prefix(header)];
        frames.extend(encode_multi_body(session, payload));
        frames
    }
}

fn encode_request_name(name: &[u8], session: u32, is_push: bool, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    if name.is_empty() || name.len() > 255 {
        return Err(DecodeError::InvalidNameLength(name.len()));
    }
    let sz = payload.len();
    if sz < MULTI_PART {
        let mut body = Vec::with_capacity(4 + name.len() + sz);
        body.push(wire_type::REQUEST_SMALL_NAME);
        body.push(name.len() as u8);
        body.extend_from_slice(name);
        body.extend_from_slice(&(if is_push { 0 } else { session }).to_le_bytes());
        body.extend_from_slice(payload);
        Ok(vec![with_length_prefix(body)])
    } else {
        let mut header = Vec::with_capacity(8 + name.len());
        header.push(if is_push { wire_type::REQUEST_MULTI_NAME_PUSH } else { wire_type::REQUEST_MULTI_NAME });
        header.push(name.len() as u8);
        header.extend_from_slice(name);
        header.extend_from_slice(&session.to_le_bytes());
        header.extend_from_slice(&(sz as u32).to_le_bytes());
        let mut frames = vec![with_length_prefix(header)];
        frames.extend(encode_multi_body(session, payload));
        Ok(frames)
    }
}

/// Encodes a response (§4.7 "The response package"). A failed call (`ok = false`)
/// truncates its error message at [`MULTI_PART`] rather than ever splitting it - the
/// original only spends multi-part framing on successful results.
#[must_use]
pub fn encode_response(session: u32, ok: bool, payload: &[u8]) -> Vec<Vec<u8>> {
    if !ok {
        let truncated = &payload[..payload.len().min(MULTI_PART)];
        return vec![with_length_prefix(response_body(session, response_type::ERROR, truncated))];
    }

    if payload.len() <= MULTI_PART {
        return vec![with_length_prefix(response_body(session, response_type::OK, payload))];
    }

    let mut frames = Vec::new();
    let mut header = Vec::with_capacity(9);
    header.extend_from_slice(&session.to_le_bytes());
    header.push(response_type::MULTI_BEGIN);
    header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frames.push(with_length_prefix(header));

    let mut remaining = payload;
    loop {
        let take = remaining.len().min(MULTI_PART);
        let chunk = &remaining[..take];
        let is_last = remaining.len() <= MULTI_PART;
        let status = if is_last { response_type::MULTI_END } else { response_type::MULTI_PART };
        frames.push(with_length_prefix(response_body(session, status, chunk)));
        remaining = &remaining[take..];
        if is_last {
            break;
        }
    }
    frames
}

fn response_body(session: u32, status: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(5 + payload.len());
    body.extend_from_slice(&session.to_le_bytes());
    body.push(status);
    body.extend_from_slice(payload);
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_request, decode_response};
    use crate::frame::{RequestFrame, ResponseFrame};
    use pretty_assertions::assert_eq;

    #[test]
    fn small_id_request_roundtrips() {
        let frames = encode_request(&Address::Id(42), 7, false, b"hello").unwrap();
        assert_eq!(frames.len(), 1);
        let body = &frames[0][2..];
        let decoded = decode_request(body).unwrap();
        assert_eq!(
            decoded,
            RequestFrame::Small { addr: Address::Id(42), session: 7, is_push: false, payload: b"hello".to_vec() }
        );
    }

    #[test]
    fn push_request_has_zero_wire_session_but_reports_original_session_as_push() {
        let frames = encode_request(&Address::Id(1), 99, true, b"x").unwrap();
        let decoded = decode_request(&frames[0][2..]).unwrap();
        match decoded {
            RequestFrame::Small { session, is_push, .. } => {
                assert_eq!(session, 0);
                assert!(is_push);
            }
            _ => panic!("expected Small"),
        }
    }

    #[test]
    fn large_id_request_splits_into_header_and_body_frames() {
        let payload = vec![7u8; MULTI_PART * 2 + 10];
        let frames = encode_request(&Address::Id(5), 3, false, &payload).unwrap();
        assert_eq!(frames.len(), 4, "one header + 3 body chunks for a 2x+10 payload");

        let header = decode_request(&frames[0][2..]).unwrap();
        assert_eq!(header, RequestFrame::MultiHeader { addr: Address::Id(5), session: 3, total_len: payload.len() as u32, is_push: false });

        let mut reassembled = Vec::new();
        for raw in &frames[1..] {
            match decode_request(&raw[2..]).unwrap() {
                RequestFrame::MultiBody { chunk, .. } => reassembled.extend(chunk),
                RequestFrame::MultiBodyLast { chunk, .. } => reassembled.extend(chunk),
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn name_request_roundtrips() {
        let frames = encode_request(&Address::Name(b"gate".to_vec()), 1, false, b"ping").unwrap();
        let decoded = decode_request(&frames[0][2..]).unwrap();
        assert_eq!(
            decoded,
            RequestFrame::Small { addr: Address::Name(b"gate".to_vec()), session: 1, is_push: false, payload: b"ping".to_vec() }
        );
    }

    #[test]
    fn oversized_name_is_rejected() {
        let name = vec![b'a'; 256];
        assert!(encode_request(&Address::Name(name), 1, false, b"").is_err());
    }

    #[test]
    fn zero_session_is_rejected() {
        assert!(encode_request(&Address::Id(1), 0, false, b"x").is_err());
    }

    #[test]
    fn ok_response_roundtrips() {
        let frames = encode_response(9, true, b"result");
        assert_eq!(frames.len(), 1);
        let decoded = decode_response(&frames[0][2..]).unwrap();
        assert_eq!(decoded, ResponseFrame::Ok { session: 9, payload: b"result".to_vec() });
    }

    #[test]
    fn error_response_truncates_overlong_message() {
        let message = vec![b'e'; MULTI_PART + 100];
        let frames = encode_response(1, false, &message);
        let decoded = decode_response(&frames[0][2..]).unwrap();
        match decoded {
            ResponseFrame::Error { message, .. } => assert_eq!(message.len(), MULTI_PART),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn large_ok_response_splits_and_reassembles() {
        let payload = vec![3u8; MULTI_PART * 3];
        let frames = encode_response(4, true, &payload);
        assert_eq!(frames.len(), 4);

        let begin = decode_response(&frames[0][2..]).unwrap();
        assert_eq!(begin, ResponseFrame::MultiBegin { session: 4, total_len: payload.len() as u32 });

        let mut reassembled = Vec::new();
        for raw in &frames[1..] {
            match decode_response(&raw[2..]).unwrap() {
                ResponseFrame::MultiPart { chunk, .. } | ResponseFrame::MultiEnd { chunk, .. } => reassembled.extend(chunk),
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(reassembled, payload);
    }
}
