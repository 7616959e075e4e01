// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Flat-buffer cursor for decoding (§4.8). Grounded on `lua-seri.c`'s `struct
//! read_block`/`rb_read`: a single length check per read, `None`/error on underrun.

use crate::error::{CodecError, Result};

#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self { Reader { buf, pos: 0 } }

    pub fn remaining(&self) -> usize { self.buf.len() - self.pos }

    pub fn is_empty(&self) -> bool { self.remaining() == 0 }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> { Ok(self.read_exact(1)?[0]) }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_exact(2)?.try_into().unwrap()))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_f64_le(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_sequential_fields() {
        let buf = [0x2A, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 0x2A);
        assert_eq!(r.read_u16_le().unwrap(), 1);
        assert_eq!(r.read_i32_le().unwrap(), -1);
    }

    #[test]
    fn underrun_is_an_error() {
        let buf = [0x01];
        let mut r = Reader::new(&buf);
        assert!(matches!(r.read_u32_le(), Err(CodecError::UnexpectedEof)));
    }
}
