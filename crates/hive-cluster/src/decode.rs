// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Decoding wire frames (without their 2-byte length prefix - the caller's framing
//! layer strips that before handing us `raw`). Mirrors the layouts `encode.rs` writes.

use crate::{
    error::{DecodeError, Result},
    frame::{response_type, wire_type, Address, RequestFrame, ResponseFrame},
};

fn require(actual: usize, needed: usize) -> Result<()> {
    if actual < needed {
        Err(DecodeError::Truncated { needed, actual })
    } else {
        Ok(())
    }
}

pub fn decode_request(raw: &[u8]) -> Result<RequestFrame> {
    require(raw.len(), 1)?;
    match raw[0] {
        wire_type::REQUEST_SMALL_ID => {
            require(raw.len(), 9)?;
            let addr = u32::from_le_bytes(raw[1..5].try_into().unwrap());
            let session = u32::from_le_bytes(raw[5..9].try_into().unwrap());
            Ok(RequestFrame::Small { addr: Address::Id(addr), session, is_push: session == 0, payload: raw[9..].to_vec() })
        }
        wire_type::REQUEST_MULTI_ID | wire_type::REQUEST_MULTI_ID_PUSH => {
            require(raw.len(), 13)?;
            let addr = u32::from_le_bytes(raw[1..5].try_into().unwrap());
            let session = u32::from_le_bytes(raw[5..9].try_into().unwrap());
            let total_len = u32::from_le_bytes(raw[9..13].try_into().unwrap());
            Ok(RequestFrame::MultiHeader { addr: Address::Id(addr), session, total_len, is_push: raw[0] == wire_type::REQUEST_MULTI_ID_PUSH })
        }
        wire_type::MULTI_BODY => {
            require(raw.len(), 5)?;
            let session = u32::from_le_bytes(raw[1..5].try_into().unwrap());
            Ok(RequestFrame::MultiBody { session, chunk: raw[5..].to_vec() })
        }
        wire_type::MULTI_BODY_LAST => {
            require(raw.len(), 5)?;
            let session = u32::from_le_bytes(raw[1..5].try_into().unwrap());
            Ok(RequestFrame::MultiBodyLast { session, chunk: raw[5..].to_vec() })
        }
        wire_type::TRACE => Ok(RequestFrame::Trace { tag: raw[1..].to_vec() }),
        wire_type::REQUEST_SMALL_NAME => {
            require(raw.len(), 2)?;
            let name_len = raw[1] as usize;
            require(raw.len(), 2 + name_len + 4)?;
            let name = raw[2..2 + name_len].to_vec();
            let session_off = 2 + name_len;
            let session = u32::from_le_bytes(raw[session_off..session_off + 4].try_into().unwrap());
            Ok(RequestFrame::Small { addr: Address::Name(name), session, is_push: session == 0, payload: raw[session_off + 4..].to_vec() })
        }
        wire_type::REQUEST_MULTI_NAME | wire_type::REQUEST_MULTI_NAME_PUSH => {
            require(raw.len(), 2)?;
            let name_len = raw[1] as usize;
            require(raw.len(), 2 + name_len + 8)?;
            let name = raw[2..2 + name_len].to_vec();
            let off = 2 + name_len;
            let session = u32::from_le_bytes(raw[off..off + 4].try_into().unwrap());
            let total_len = u32::from_le_bytes(raw[off + 4..off + 8].try_into().unwrap());
            Ok(RequestFrame::MultiHeader { addr: Address::Name(name), session, total_len, is_push: raw[0] == wire_type::REQUEST_MULTI_NAME_PUSH })
        }
        other => Err(DecodeError::UnknownRequestType(other)),
    }
}

pub fn decode_response(raw: &[u8]) -> Result<ResponseFrame> {
    require(raw.len(), 5)?;
    let session = u32::from_le_bytes(raw[0..4].try_into().unwrap());
    let status = raw[4];
    let body = &raw[5..];
    match status {
        response_type::ERROR => Ok(ResponseFrame::Error { session, message: body.to_vec() }),
        response_type::OK => Ok(ResponseFrame::Ok { session, payload: body.to_vec() }),
        response_type::MULTI_BEGIN => {
            require(body.len(), 4)?;
            let total_len = u32::from_le_bytes(body[0..4].try_into().unwrap());
            Ok(ResponseFrame::MultiBegin { session, total_len })
        }
        response_type::MULTI_PART => Ok(ResponseFrame::MultiPart { session, chunk: body.to_vec() }),
        response_type::MULTI_END => Ok(ResponseFrame::MultiEnd { session, chunk: body.to_vec() }),
        other => Err(DecodeError::UnknownResponseType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truncated_request_header_is_rejected() {
        let raw = [wire_type::REQUEST_SMALL_ID, 1, 2, 3];
        assert!(matches!(decode_request(&raw), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        assert!(matches!(decode_request(&[0xFE]), Err(DecodeError::UnknownRequestType(0xFE))));
    }

    #[test]
    fn unknown_response_type_is_rejected() {
        let mut raw = vec![0u8; 4];
        raw.push(0xFE);
        assert!(matches!(decode_response(&raw), Err(DecodeError::UnknownResponseType(0xFE))));
    }

    #[test]
    fn truncated_response_is_rejected() {
        assert!(matches!(decode_response(&[0, 0, 0]), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn trace_frame_carries_its_tag_bytes() {
        let mut raw = vec![wire_type::TRACE];
        raw.extend_from_slice(b"trace-id-1");
        let decoded = decode_request(&raw).unwrap();
        assert_eq!(decoded, RequestFrame::Trace { tag: b"trace-id-1".to_vec() });
    }
}
