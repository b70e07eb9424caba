//! Little-endian writer producing EOSIO binary payloads.
//!
//! The connector only ever reads chain data; the writer exists to build
//! payloads for fixtures and for packing ABI JSON into its on-chain form.

use bytes::BufMut;

use crate::error::AbiError;
use crate::name::string_to_name;

#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16_le(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32_le(v);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64_le(v);
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64_le(v);
        self
    }

    pub fn varuint32(&mut self, mut v: u32) -> &mut Self {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.put_u8(byte);
                return self;
            }
            self.buf.put_u8(byte | 0x80);
        }
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.varuint32(bytes.len() as u32).raw(bytes)
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.bytes(s.as_bytes())
    }

    pub fn name(&mut self, name: &str) -> Result<&mut Self, AbiError> {
        Ok(self.u64(string_to_name(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::BinaryReader;

    #[test]
    fn varuint32_matches_reader() {
        let mut w = BinaryWriter::new();
        w.varuint32(0).varuint32(127).varuint32(128).varuint32(u32::MAX);
        let bytes = w.into_bytes();

        let mut r = BinaryReader::new(&bytes);
        for expected in [0, 127, 128, u32::MAX] {
            assert_eq!(r.read_varuint32().unwrap(), expected);
        }
    }
}
