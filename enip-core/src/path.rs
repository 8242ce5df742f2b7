//! Logical segment paths
//!
//! Only the logical class / instance / attribute / connection point
//! segments are understood. Each comes in an 8-bit form and a padded
//! 16-bit form; instance ids also have a padded 32-bit form.

use crate::codec::{CipDecoder, CipEncoder};
use crate::error::{EipError, EipResult};

const CLASS_8: u8 = 0x20;
const CLASS_16: u8 = 0x21;
const INSTANCE_8: u8 = 0x24;
const INSTANCE_16: u8 = 0x25;
const INSTANCE_32: u8 = 0x26;
const CONNECTION_POINT_8: u8 = 0x2C;
const CONNECTION_POINT_16: u8 = 0x2D;
const ATTRIBUTE_8: u8 = 0x30;
const ATTRIBUTE_16: u8 = 0x31;

/// One logical segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Class(u16),
    Instance(u32),
    ConnectionPoint(u16),
    Attribute(u16),
}

impl Segment {
    /// Encode using the shortest form that holds the value
    pub fn encode(&self, enc: &mut CipEncoder) {
        match *self {
            Segment::Class(id) => encode_16(enc, CLASS_8, CLASS_16, id),
            Segment::ConnectionPoint(id) => {
                encode_16(enc, CONNECTION_POINT_8, CONNECTION_POINT_16, id)
            }
            Segment::Attribute(id) => encode_16(enc, ATTRIBUTE_8, ATTRIBUTE_16, id),
            Segment::Instance(id) => {
                if id <= u16::MAX as u32 {
                    encode_16(enc, INSTANCE_8, INSTANCE_16, id as u16);
                } else {
                    enc.encode_u8(INSTANCE_32).encode_u8(0).encode_u32(id);
                }
            }
        }
    }

    /// Decode one segment
    pub fn decode(dec: &mut CipDecoder<'_>) -> EipResult<Self> {
        let kind = dec.decode_u8()?;
        let segment = match kind {
            CLASS_8 => Segment::Class(dec.decode_u8()? as u16),
            CLASS_16 => {
                dec.skip(1)?;
                Segment::Class(dec.decode_u16()?)
            }
            INSTANCE_8 => Segment::Instance(dec.decode_u8()? as u32),
            INSTANCE_16 => {
                dec.skip(1)?;
                Segment::Instance(dec.decode_u16()? as u32)
            }
            INSTANCE_32 => {
                dec.skip(1)?;
                Segment::Instance(dec.decode_u32()?)
            }
            CONNECTION_POINT_8 => Segment::ConnectionPoint(dec.decode_u8()? as u16),
            CONNECTION_POINT_16 => {
                dec.skip(1)?;
                Segment::ConnectionPoint(dec.decode_u16()?)
            }
            ATTRIBUTE_8 => Segment::Attribute(dec.decode_u8()? as u16),
            ATTRIBUTE_16 => {
                dec.skip(1)?;
                Segment::Attribute(dec.decode_u16()?)
            }
            other => {
                return Err(EipError::InvalidData(format!(
                    "Unsupported path segment type 0x{:02X}",
                    other
                )));
            }
        };
        Ok(segment)
    }
}

fn encode_16(enc: &mut CipEncoder, short: u8, long: u8, id: u16) {
    if id <= u8::MAX as u16 {
        enc.encode_u8(short).encode_u8(id as u8);
    } else {
        enc.encode_u8(long).encode_u8(0).encode_u16(id);
    }
}

/// Target of an explicit request: class, instance and optional attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalPath {
    pub class_id: u16,
    pub instance_id: u32,
    pub attribute_id: Option<u16>,
}

impl LogicalPath {
    pub fn new(class_id: u16, instance_id: u32) -> Self {
        Self {
            class_id,
            instance_id,
            attribute_id: None,
        }
    }

    pub fn with_attribute(mut self, attribute_id: u16) -> Self {
        self.attribute_id = Some(attribute_id);
        self
    }

    /// Encode as segments, returning the number of bytes written
    pub fn encode(&self, enc: &mut CipEncoder) -> usize {
        let start = enc.len();
        Segment::Class(self.class_id).encode(enc);
        Segment::Instance(self.instance_id).encode(enc);
        if let Some(attribute_id) = self.attribute_id {
            Segment::Attribute(attribute_id).encode(enc);
        }
        enc.len() - start
    }

    /// Decode a complete path
    ///
    /// A class segment is mandatory. A missing instance segment addresses
    /// the class itself (instance 0). A connection point segment is accepted
    /// in place of an instance.
    pub fn decode(bytes: &[u8]) -> EipResult<Self> {
        let mut dec = CipDecoder::new(bytes);
        let mut class_id = None;
        let mut instance_id = None;
        let mut attribute_id = None;

        while !dec.is_empty() {
            match Segment::decode(&mut dec)? {
                Segment::Class(id) if class_id.is_none() => class_id = Some(id),
                Segment::Instance(id) if class_id.is_some() && instance_id.is_none() => {
                    instance_id = Some(id)
                }
                Segment::ConnectionPoint(id) if class_id.is_some() && instance_id.is_none() => {
                    instance_id = Some(id as u32)
                }
                Segment::Attribute(id) if instance_id.is_some() && attribute_id.is_none() => {
                    attribute_id = Some(id)
                }
                other => {
                    return Err(EipError::InvalidData(format!(
                        "Unexpected segment {:?} in request path",
                        other
                    )));
                }
            }
        }

        let class_id =
            class_id.ok_or_else(|| EipError::InvalidData("Request path has no class segment".to_string()))?;

        Ok(Self {
            class_id,
            instance_id: instance_id.unwrap_or(0),
            attribute_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_short_form() {
        let mut enc = CipEncoder::new();
        let written = LogicalPath::new(0xF6, 1).encode(&mut enc);
        assert_eq!(written, 4);
        assert_eq!(enc.as_slice(), &[0x20, 0xF6, 0x24, 0x01]);
    }

    #[test]
    fn test_encode_padded_forms() {
        let mut enc = CipEncoder::new();
        LogicalPath::new(0x0300, 0x1_0000).with_attribute(0x0102).encode(&mut enc);
        assert_eq!(
            enc.as_slice(),
            &[0x21, 0x00, 0x00, 0x03, 0x26, 0x00, 0x00, 0x00, 0x01, 0x00, 0x31, 0x00, 0x02, 0x01]
        );
    }

    #[test]
    fn test_decode_class_instance_attribute() {
        let path = LogicalPath::decode(&[0x20, 0xF5, 0x24, 0x01, 0x30, 0x08]).unwrap();
        assert_eq!(path, LogicalPath::new(0xF5, 1).with_attribute(8));
    }

    #[test]
    fn test_decode_class_only_addresses_instance_zero() {
        let path = LogicalPath::decode(&[0x20, 0x01]).unwrap();
        assert_eq!(path.instance_id, 0);
        assert_eq!(path.attribute_id, None);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(LogicalPath::decode(&[0x24, 0x01]).is_err());
        assert!(LogicalPath::decode(&[0x20]).is_err());
        assert!(LogicalPath::decode(&[0x91, 0x03, b'a', b'b', b'c', 0]).is_err());
        assert!(LogicalPath::decode(&[]).is_err());
    }
}
