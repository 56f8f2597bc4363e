use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;

/// Width of a fixed-size little-endian integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    /// Number of bytes this width occupies on the wire.
    pub fn size(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }

    /// Largest value representable in this width.
    pub fn max(self) -> u64 {
        match self {
            Width::U8 => u8::MAX as u64,
            Width::U16 => u16::MAX as u64,
            Width::U32 => u32::MAX as u64,
        }
    }
}

/// Sequential reader over a byte buffer.
///
/// Every read validates the remaining length first, so a crafted length
/// field can never drive an allocation past the end of the input.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn check(&self, n: usize) -> Result<(), ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::TruncatedInput {
                needed: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read a little-endian unsigned integer of the given width.
    pub fn read_uint(&mut self, width: Width) -> Result<u64, ProtocolError> {
        let n = width.size();
        self.check(n)?;
        let mut value: u64 = 0;
        for (i, b) in self.buf[self.pos..self.pos + n].iter().enumerate() {
            value |= (*b as u64) << (8 * i);
        }
        self.pos += n;
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_uint(Width::U8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(self.read_uint(Width::U16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.read_uint(Width::U32)? as u32)
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.check(n)?;
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consume and return everything left in the buffer.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

/// Sequential writer producing a byte buffer.
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a little-endian unsigned integer of the given width.
    ///
    /// Fails with `ValueOutOfRange` if the value does not fit: a 1-byte
    /// length prefix cannot encode more than 255.
    pub fn write_uint(&mut self, width: Width, value: u64) -> Result<(), ProtocolError> {
        if value > width.max() {
            return Err(ProtocolError::ValueOutOfRange {
                value,
                width: width.size(),
            });
        }
        match width {
            Width::U8 => self.buf.put_u8(value as u8),
            Width::U16 => self.buf.put_u16_le(value as u16),
            Width::U32 => self.buf.put_u32_le(value as u32),
        }
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_uint_little_endian() {
        let mut r = Reader::new(&[0x0E, 0x00, 0x00, 0x00]);
        assert_eq!(r.read_uint(Width::U32).unwrap(), 14);
        assert!(r.is_empty());
    }

    #[test]
    fn read_u16_little_endian() {
        let mut r = Reader::new(&[0x34, 0x12]);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
    }

    #[test]
    fn read_past_end_fails() {
        let mut r = Reader::new(&[0x01]);
        let err = r.read_uint(Width::U16).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedInput { needed: 2, remaining: 1 }
        ));
        // Position is untouched after a failed read.
        assert_eq!(r.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn read_bytes_exact() {
        let mut r = Reader::new(b"abcdef");
        assert_eq!(r.read_bytes(3).unwrap(), b"abc");
        assert_eq!(r.remaining(), 3);
        assert!(r.read_bytes(4).is_err());
        assert_eq!(r.take_rest(), b"def");
        assert!(r.is_empty());
    }

    #[test]
    fn write_uint_roundtrip() {
        let mut w = Writer::new();
        w.write_uint(Width::U8, 7).unwrap();
        w.write_uint(Width::U16, 0xBEEF).unwrap();
        w.write_uint(Width::U32, 0xDEADBEEF).unwrap();
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn write_uint_overflow_rejected() {
        let mut w = Writer::new();
        let err = w.write_uint(Width::U8, 256).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ValueOutOfRange { value: 256, width: 1 }
        ));

        let err = w.write_uint(Width::U16, 70_000).unwrap_err();
        assert!(matches!(err, ProtocolError::ValueOutOfRange { width: 2, .. }));
    }

    #[test]
    fn width_max_values() {
        assert_eq!(Width::U8.max(), 255);
        assert_eq!(Width::U16.max(), 65_535);
        assert_eq!(Width::U32.max(), 4_294_967_295);
    }
}
