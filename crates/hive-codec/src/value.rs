// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The dynamic value model and its recursive encode/decode (§4.8).
//!
//! Grounded on `lua-seri.c`'s `pack_one`/`unpack_one`: narrowest-form integers, the
//! short/long string split at [`crate::tag::MAX_COOKIE`], tables as an array part
//! followed by a nil-terminated hash part, and the depth cap applied on every recursive
//! descent into a nested table.

use crate::{
    error::{CodecError, Result},
    reader::Reader,
    tag::{self, MAX_COOKIE},
    writer::Writer,
};

/// The maximum nesting depth a [`Value::Table`] may reach before encode/decode refuses
/// to continue (§4.8).
pub const MAX_DEPTH: u32 = 32;

/// One dynamic value exchanged between services over a cluster link.
///
/// `Bytes` stands in for both Lua string variants (short and long differ only in wire
/// encoding, never in the value a caller sees); `Pointer` is the original's
/// `lightuserdata` case, serialised verbatim and meaningful only within one process.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Pointer(u64),
    Table { array: Vec<Value>, hash: Vec<(Value, Value)> },
}

/// Encodes `value` into a flat byte buffer.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    write_one(&mut writer, value, 0)?;
    Ok(writer.finish())
}

/// Decodes exactly one value from `buf`. Trailing bytes are not an error - callers that
/// expect a single value should check the caller-side length themselves, same as the
/// original (a cluster frame's payload is packed/unpacked as a whole).
pub fn decode(buf: &[u8]) -> Result<Value> {
    let mut reader = Reader::new(buf);
    read_one(&mut reader, 0)
}

fn write_one(w: &mut Writer, value: &Value, depth: u32) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(CodecError::DepthExceeded(MAX_DEPTH));
    }
    match value {
        Value::Nil => w.push_u8(tag::combine(tag::TYPE_NIL, 0)),
        Value::Bool(b) => w.push_u8(tag::combine(tag::TYPE_BOOLEAN, u8::from(*b))),
        Value::Int(i) => write_integer(w, *i),
        Value::Float(f) => {
            w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_REAL));
            w.push(&f.to_le_bytes());
        }
        Value::Pointer(p) => {
            w.push_u8(tag::TYPE_POINTER);
            w.push(&p.to_le_bytes());
        }
        Value::Bytes(bytes) => write_string(w, bytes),
        Value::Table { array, hash } => write_table(w, array, hash, depth)?,
    }
    Ok(())
}

fn write_integer(w: &mut Writer, v: i64) {
    if v == 0 {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_ZERO));
    } else if v != i64::from(v as i32) {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_QWORD));
        w.push(&v.to_le_bytes());
    } else if v < 0 {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_DWORD));
        w.push(&(v as i32).to_le_bytes());
    } else if v < 0x100 {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_BYTE));
        w.push_u8(v as u8);
    } else if v < 0x1_0000 {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_WORD));
        w.push(&(v as u16).to_le_bytes());
    } else {
        w.push_u8(tag::combine(tag::TYPE_NUMBER, tag::NUMBER_DWORD));
        w.push(&(v as u32).to_le_bytes());
    }
}

fn write_string(w: &mut Writer, bytes: &[u8]) {
    let len = bytes.len();
    if (len as u32) < MAX_COOKIE {
        w.push_u8(tag::combine(tag::TYPE_SHORT_STRING, len as u8));
    } else if len < 0x1_0000 {
        w.push_u8(tag::combine(tag::TYPE_LONG_STRING, 2));
        w.push(&(len as u16).to_le_bytes());
    } else {
        w.push_u8(tag::combine(tag::TYPE_LONG_STRING, 4));
        w.push(&(len as u32).to_le_bytes());
    }
    w.push(bytes);
}

fn write_table(w: &mut Writer, array: &[Value], hash: &[(Value, Value)], depth: u32) -> Result<()> {
    let array_size = array.len();
    if array_size as u32 >= MAX_COOKIE - 1 {
        w.push_u8(tag::combine(tag::TYPE_TABLE, (MAX_COOKIE - 1) as u8));
        write_integer(w, array_size as i64);
    } else {
        w.push_u8(tag::combine(tag::TYPE_TABLE, array_size as u8));
    }
    for item in array {
        write_one(w, item, depth + 1)?;
    }
    for (key, value) in hash {
        write_one(w, key, depth + 1)?;
        write_one(w, value, depth + 1)?;
    }
    // Nil-terminates the hash part, mirroring `wb_nil` after `wb_table_hash`.
    w.push_u8(tag::combine(tag::TYPE_NIL, 0));
    Ok(())
}

fn read_one(r: &mut Reader<'_>, depth: u32) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(CodecError::DepthExceeded(MAX_DEPTH));
    }
    let tag = r.read_u8()?;
    let major = tag::major_of(tag);
    let cookie = tag::cookie_of(tag);
    match major {
        tag::TYPE_NIL => Ok(Value::Nil),
        tag::TYPE_BOOLEAN => Ok(Value::Bool(cookie != 0)),
        tag::TYPE_NUMBER => read_number(r, cookie),
        tag::TYPE_POINTER => Ok(Value::Pointer(r.read_u64_le()?)),
        tag::TYPE_SHORT_STRING => Ok(Value::Bytes(r.read_exact(cookie as usize)?.to_vec())),
        tag::TYPE_LONG_STRING => read_long_string(r, cookie),
        tag::TYPE_TABLE => read_table(r, cookie, depth),
        _ => Err(CodecError::InvalidTag(tag)),
    }
}

fn read_number(r: &mut Reader<'_>, cookie: u8) -> Result<Value> {
    match cookie {
        tag::NUMBER_ZERO => Ok(Value::Int(0)),
        tag::NUMBER_BYTE => Ok(Value::Int(i64::from(r.read_u8()?))),
        tag::NUMBER_WORD => Ok(Value::Int(i64::from(r.read_u16_le()?))),
        tag::NUMBER_DWORD => Ok(Value::Int(i64::from(r.read_i32_le()?))),
        tag::NUMBER_QWORD => Ok(Value::Int(r.read_i64_le()?)),
        tag::NUMBER_REAL => Ok(Value::Float(r.read_f64_le()?)),
        other => Err(CodecError::InvalidTag(other)),
    }
}

fn read_long_string(r: &mut Reader<'_>, cookie: u8) -> Result<Value> {
    let len = match cookie {
        2 => usize::from(r.read_u16_le()?),
        4 => r.read_u32_le()? as usize,
        other => return Err(CodecError::InvalidTag(other)),
    };
    Ok(Value::Bytes(r.read_exact(len)?.to_vec()))
}

fn read_table(r: &mut Reader<'_>, cookie: u8, depth: u32) -> Result<Value> {
    let array_size = if u32::from(cookie) == MAX_COOKIE - 1 {
        match read_one(r, depth + 1)? {
            Value::Int(n) if n >= 0 => n as usize,
            _ => return Err(CodecError::InvalidTag(cookie)),
        }
    } else {
        cookie as usize
    };

    let mut array = Vec::with_capacity(array_size);
    for _ in 0..array_size {
        array.push(read_one(r, depth + 1)?);
    }

    let mut hash = Vec::new();
    loop {
        let key = read_one(r, depth + 1)?;
        if key == Value::Nil {
            break;
        }
        let value = read_one(r, depth + 1)?;
        hash.push((key, value));
    }

    Ok(Value::Table { array, hash })
}
