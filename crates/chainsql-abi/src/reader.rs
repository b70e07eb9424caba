//! Bounds-checked little-endian reader for EOSIO binary payloads.

use bytes::Buf;

use crate::error::AbiError;
use crate::name::name_to_string;

/// A cursor over a borrowed byte slice.
///
/// Every read checks the remaining length first, so malformed input yields
/// [`AbiError::UnexpectedEof`] instead of a panic.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { buf: data }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn need(&self, needed: usize) -> Result<(), AbiError> {
        if self.buf.len() < needed {
            return Err(AbiError::UnexpectedEof {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, AbiError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8, AbiError> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_u16(&mut self) -> Result<u16, AbiError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, AbiError> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, AbiError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, AbiError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, AbiError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_i64(&mut self) -> Result<i64, AbiError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_u128(&mut self) -> Result<u128, AbiError> {
        self.need(16)?;
        Ok(self.buf.get_u128_le())
    }

    pub fn read_i128(&mut self) -> Result<i128, AbiError> {
        self.need(16)?;
        Ok(self.buf.get_i128_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, AbiError> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64, AbiError> {
        self.need(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_bool(&mut self) -> Result<bool, AbiError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(AbiError::InvalidData(format!("bool byte {other}"))),
        }
    }

    /// LEB128-encoded `u32` (at most 5 bytes).
    pub fn read_varuint32(&mut self) -> Result<u32, AbiError> {
        let mut value = 0u64;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return u32::try_from(value)
                    .map_err(|_| AbiError::InvalidData("varuint32 overflow".into()));
            }
        }
        Err(AbiError::InvalidData("varuint32 longer than 5 bytes".into()))
    }

    /// Zig-zag encoded `i32`.
    pub fn read_varint32(&mut self) -> Result<i32, AbiError> {
        let v = self.read_varuint32()?;
        Ok(((v >> 1) as i32) ^ -((v & 1) as i32))
    }

    /// Borrow the next `n` bytes.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8], AbiError> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// A length-prefixed byte vector.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, AbiError> {
        let len = self.read_varuint32()? as usize;
        Ok(self.read_slice(len)?.to_vec())
    }

    /// A length-prefixed string. Invalid UTF-8 is replaced, never rejected.
    pub fn read_string(&mut self) -> Result<String, AbiError> {
        let len = self.read_varuint32()? as usize;
        Ok(String::from_utf8_lossy(self.read_slice(len)?).into_owned())
    }

    pub fn read_name(&mut self) -> Result<String, AbiError> {
        Ok(name_to_string(self.read_u64()?))
    }

    /// A length-prefixed vector of `T`.
    pub fn read_vec<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, AbiError>,
    ) -> Result<Vec<T>, AbiError> {
        let len = self.read_varuint32()? as usize;
        // Each element takes at least one byte.
        self.need(len)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(item(self)?);
        }
        Ok(out)
    }
}
