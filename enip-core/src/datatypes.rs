//! CIP elementary data types and attribute storage values

use crate::codec::{CipDecoder, CipEncoder};
use crate::error::{EipError, EipResult};

/// Semantic type tag of an attribute
///
/// The tag decides the wire width and encoding used by the default codec.
/// Signed and floating point types share storage with the unsigned type of
/// the same width; only the tag differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipDataType {
    Bool,
    Sint,
    Int,
    Dint,
    Lint,
    Usint,
    Uint,
    Udint,
    Ulint,
    Real,
    Lreal,
    Byte,
    Word,
    Dword,
    Lword,
    /// STRING, 2-byte length prefix
    String,
    /// SHORT_STRING, 1-byte length prefix
    ShortString,
    /// Fixed-length byte string
    Bytes(usize),
}

impl CipDataType {
    /// Elementary data type code, `None` for fixed byte strings
    pub fn code(self) -> Option<u8> {
        let code = match self {
            Self::Bool => 0xC1,
            Self::Sint => 0xC2,
            Self::Int => 0xC3,
            Self::Dint => 0xC4,
            Self::Lint => 0xC5,
            Self::Usint => 0xC6,
            Self::Uint => 0xC7,
            Self::Udint => 0xC8,
            Self::Ulint => 0xC9,
            Self::Real => 0xCA,
            Self::Lreal => 0xCB,
            Self::String => 0xD0,
            Self::Byte => 0xD1,
            Self::Word => 0xD2,
            Self::Dword => 0xD3,
            Self::Lword => 0xD4,
            Self::ShortString => 0xDA,
            Self::Bytes(_) => return None,
        };
        Some(code)
    }

    /// Wire size for fixed-width types, `None` for length-prefixed strings
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Sint | Self::Usint | Self::Byte => Some(1),
            Self::Int | Self::Uint | Self::Word => Some(2),
            Self::Dint | Self::Udint | Self::Dword | Self::Real => Some(4),
            Self::Lint | Self::Ulint | Self::Lword | Self::Lreal => Some(8),
            Self::Bytes(len) => Some(len),
            Self::String | Self::ShortString => None,
        }
    }
}

/// Storage of a default-codec attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
    Text(String),
}

impl CipValue {
    /// Zero value with the storage shape required by `data_type`
    pub fn zero(data_type: CipDataType) -> Self {
        match data_type {
            CipDataType::String | CipDataType::ShortString => Self::Text(String::new()),
            CipDataType::Bytes(len) => Self::Bytes(vec![0; len]),
            other => match other.fixed_size() {
                Some(1) => Self::U8(0),
                Some(2) => Self::U16(0),
                Some(4) => Self::U32(0),
                _ => Self::U64(0),
            },
        }
    }

    /// Whether this value can be stored under `data_type`
    pub fn matches(&self, data_type: CipDataType) -> bool {
        match (self, data_type) {
            (Self::Text(_), CipDataType::String | CipDataType::ShortString) => true,
            (Self::Bytes(bytes), CipDataType::Bytes(len)) => bytes.len() == len,
            (Self::U8(_), t) => t.fixed_size() == Some(1) && !matches!(t, CipDataType::Bytes(_)),
            (Self::U16(_), t) => t.fixed_size() == Some(2) && !matches!(t, CipDataType::Bytes(_)),
            (Self::U32(_), t) => t.fixed_size() == Some(4) && !matches!(t, CipDataType::Bytes(_)),
            (Self::U64(_), t) => t.fixed_size() == Some(8) && !matches!(t, CipDataType::Bytes(_)),
            _ => false,
        }
    }

    /// Encode with the default codec of `data_type`
    pub fn encode(&self, data_type: CipDataType, enc: &mut CipEncoder) -> EipResult<()> {
        if !self.matches(data_type) {
            return Err(EipError::Config(format!(
                "Value {:?} cannot be encoded as {:?}",
                self, data_type
            )));
        }
        match (self, data_type) {
            (Self::U8(v), _) => enc.encode_u8(*v),
            (Self::U16(v), _) => enc.encode_u16(*v),
            (Self::U32(v), _) => enc.encode_u32(*v),
            (Self::U64(v), _) => enc.encode_u64(*v),
            (Self::Bytes(bytes), _) => enc.encode_bytes(bytes),
            (Self::Text(text), CipDataType::ShortString) => enc.encode_short_string(text),
            (Self::Text(text), _) => enc.encode_string(text),
        };
        Ok(())
    }

    /// Decode a value with the default codec of `data_type`
    pub fn decode(data_type: CipDataType, dec: &mut CipDecoder<'_>) -> EipResult<Self> {
        let value = match data_type {
            CipDataType::String => Self::Text(dec.decode_string()?),
            CipDataType::ShortString => Self::Text(dec.decode_short_string()?),
            CipDataType::Bytes(len) => Self::Bytes(dec.decode_bytes(len)?.to_vec()),
            other => match other.fixed_size() {
                Some(1) => Self::U8(dec.decode_u8()?),
                Some(2) => Self::U16(dec.decode_u16()?),
                Some(4) => Self::U32(dec.decode_u32()?),
                _ => Self::U64(dec.decode_u64()?),
            },
        };
        Ok(value)
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(CipDataType::Usint.fixed_size(), Some(1));
        assert_eq!(CipDataType::Word.fixed_size(), Some(2));
        assert_eq!(CipDataType::Dword.fixed_size(), Some(4));
        assert_eq!(CipDataType::Lword.fixed_size(), Some(8));
        assert_eq!(CipDataType::Bytes(6).fixed_size(), Some(6));
        assert_eq!(CipDataType::String.fixed_size(), None);
    }

    #[test]
    fn test_value_matches_type() {
        assert!(CipValue::U32(2).matches(CipDataType::Dword));
        assert!(!CipValue::U32(2).matches(CipDataType::Uint));
        assert!(CipValue::Bytes(vec![0; 6]).matches(CipDataType::Bytes(6)));
        assert!(!CipValue::Bytes(vec![0; 5]).matches(CipDataType::Bytes(6)));
        assert!(!CipValue::U8(1).matches(CipDataType::Bytes(1)));
        assert!(CipValue::zero(CipDataType::ShortString).matches(CipDataType::ShortString));
    }

    #[test]
    fn test_encode_rejects_mismatched_storage() {
        let mut enc = CipEncoder::new();
        assert!(CipValue::U8(1).encode(CipDataType::Udint, &mut enc).is_err());
        assert!(enc.is_empty());
    }

    #[test]
    fn test_short_string_prefix() {
        let mut enc = CipEncoder::new();
        CipValue::Text("ab".to_string())
            .encode(CipDataType::ShortString, &mut enc)
            .unwrap();
        assert_eq!(enc.as_slice(), &[2, b'a', b'b']);
    }
}
