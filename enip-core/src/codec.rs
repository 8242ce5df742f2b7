//! Little-endian byte codec for CIP data
//!
//! `CipEncoder` appends to an owned buffer and never fails. `CipDecoder`
//! reads from untrusted input and bounds-checks every access before
//! interpreting a length or a value.

use crate::error::{EipError, EipResult};

/// Encoder for CIP wire data (little-endian)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CipEncoder {
    buffer: Vec<u8>,
}

impl CipEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn encode_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn encode_u16(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn encode_u32(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn encode_u64(&mut self, value: u64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Encode a big-endian u16 (socket address items are network order)
    pub fn encode_u16_be(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Encode a big-endian u32
    pub fn encode_u32_be(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn encode_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Append `count` zero bytes
    pub fn encode_zeros(&mut self, count: usize) -> &mut Self {
        self.buffer.resize(self.buffer.len() + count, 0);
        self
    }

    /// Encode a STRING: 2-byte length followed by the raw bytes
    ///
    /// Text longer than `u16::MAX` bytes is cut at that length.
    pub fn encode_string(&mut self, text: &str) -> &mut Self {
        let bytes = text.as_bytes();
        let len = bytes.len().min(u16::MAX as usize);
        self.encode_u16(len as u16);
        self.encode_bytes(&bytes[..len])
    }

    /// Encode a SHORT_STRING: 1-byte length followed by the raw bytes
    pub fn encode_short_string(&mut self, text: &str) -> &mut Self {
        let bytes = text.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.encode_u8(len as u8);
        self.encode_bytes(&bytes[..len])
    }

    /// Overwrite a u16 previously written at `offset`
    ///
    /// Used for length fields that are only known after the body is encoded.
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> EipResult<()> {
        let slot = self
            .buffer
            .get_mut(offset..offset + 2)
            .ok_or_else(|| EipError::InvalidData(format!("No u16 to patch at offset {}", offset)))?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop everything written after `len` bytes
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Decoder for CIP wire data (little-endian)
#[derive(Debug, Clone)]
pub struct CipDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> CipDecoder<'a> {
    /// Create a new decoder
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    fn take(&mut self, count: usize) -> EipResult<&'a [u8]> {
        let available = self.remaining();
        if count > available {
            return Err(EipError::Truncated {
                needed: count,
                available,
            });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> EipResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn decode_u8(&mut self) -> EipResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn decode_u16(&mut self) -> EipResult<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn decode_u32(&mut self) -> EipResult<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn decode_u64(&mut self) -> EipResult<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn decode_u16_be(&mut self) -> EipResult<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn decode_u32_be(&mut self) -> EipResult<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    /// Borrow the next `count` bytes
    pub fn decode_bytes(&mut self, count: usize) -> EipResult<&'a [u8]> {
        self.take(count)
    }

    /// Decode a STRING (2-byte length prefix)
    pub fn decode_string(&mut self) -> EipResult<String> {
        let len = self.decode_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EipError::InvalidData(format!("STRING is not valid UTF-8: {}", e)))
    }

    /// Decode a SHORT_STRING (1-byte length prefix)
    pub fn decode_short_string(&mut self) -> EipResult<String> {
        let len = self.decode_u8()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EipError::InvalidData(format!("SHORT_STRING is not valid UTF-8: {}", e)))
    }

    pub fn skip(&mut self, count: usize) -> EipResult<()> {
        self.take(count).map(|_| ())
    }

    /// Everything not consumed yet
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.position..]
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_little_endian() {
        let mut enc = CipEncoder::new();
        enc.encode_u16(0x1234).encode_u32(0xAABBCCDD).encode_u8(7);
        assert_eq!(enc.as_slice(), &[0x34, 0x12, 0xDD, 0xCC, 0xBB, 0xAA, 0x07]);
    }

    #[test]
    fn test_string_has_no_terminator() {
        let mut enc = CipEncoder::new();
        enc.encode_string("plc");
        assert_eq!(enc.as_slice(), &[3, 0, b'p', b'l', b'c']);
    }

    #[test]
    fn test_patch_u16() {
        let mut enc = CipEncoder::new();
        enc.encode_u16(0).encode_bytes(&[1, 2, 3]);
        enc.patch_u16(0, 3).unwrap();
        assert_eq!(enc.as_slice(), &[3, 0, 1, 2, 3]);
        assert!(enc.patch_u16(4, 1).is_err());
    }

    #[test]
    fn test_decoder_bounds_checked() {
        let data = [0x01, 0x02, 0x03];
        let mut dec = CipDecoder::new(&data);
        assert_eq!(dec.decode_u16().unwrap(), 0x0201);
        match dec.decode_u32() {
            Err(EipError::Truncated { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 1);
            }
            other => panic!("Expected Truncated, got {:?}", other),
        }
        // A failed read consumes nothing
        assert_eq!(dec.decode_u8().unwrap(), 0x03);
        assert!(dec.is_empty());
    }

    #[test]
    fn test_decode_string_length_beyond_buffer() {
        let data = [0xFF, 0xFF, b'a'];
        let mut dec = CipDecoder::new(&data);
        assert!(matches!(dec.decode_string(), Err(EipError::Truncated { .. })));
    }
}
