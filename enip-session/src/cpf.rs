//! Common packet format
//!
//! A CPF block is an item count followed by items of
//! (type id, length, data). SendRRData wraps it with an interface handle
//! and a timeout.

use enip_core::{CipDecoder, CipEncoder, EipError, EipResult};

pub const ITEM_NULL_ADDRESS: u16 = 0x0000;
pub const ITEM_LIST_IDENTITY: u16 = 0x000C;
pub const ITEM_CONNECTED_ADDRESS: u16 = 0x00A1;
pub const ITEM_CONNECTED_DATA: u16 = 0x00B1;
pub const ITEM_UNCONNECTED_DATA: u16 = 0x00B2;
pub const ITEM_LIST_SERVICES: u16 = 0x0100;

/// One CPF item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpfItem<'a> {
    pub type_id: u16,
    pub data: &'a [u8],
}

impl<'a> CpfItem<'a> {
    pub fn new(type_id: u16, data: &'a [u8]) -> Self {
        Self { type_id, data }
    }
}

/// A decoded CPF block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommonPacket<'a> {
    pub items: Vec<CpfItem<'a>>,
}

impl<'a> CommonPacket<'a> {
    pub fn new(items: Vec<CpfItem<'a>>) -> Self {
        Self { items }
    }

    /// Decode a CPF block; bytes after the last item are rejected
    pub fn decode(bytes: &'a [u8]) -> EipResult<Self> {
        let mut dec = CipDecoder::new(bytes);
        let count = dec.decode_u16()?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let type_id = dec.decode_u16()?;
            let length = dec.decode_u16()? as usize;
            items.push(CpfItem {
                type_id,
                data: dec.decode_bytes(length)?,
            });
        }
        if !dec.is_empty() {
            return Err(EipError::InvalidData(format!(
                "{} bytes after the last CPF item",
                dec.remaining()
            )));
        }
        Ok(Self { items })
    }

    pub fn encode(&self, enc: &mut CipEncoder) -> EipResult<()> {
        enc.encode_u16(self.items.len() as u16);
        for item in &self.items {
            let length = u16::try_from(item.data.len())
                .map_err(|_| EipError::InvalidData(format!("CPF item of {} bytes", item.data.len())))?;
            enc.encode_u16(item.type_id).encode_u16(length).encode_bytes(item.data);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> EipResult<Vec<u8>> {
        let mut enc = CipEncoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn find(&self, type_id: u16) -> Option<&CpfItem<'a>> {
        self.items.iter().find(|item| item.type_id == type_id)
    }
}

/// SendRRData / SendUnitData payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrData<'a> {
    pub interface_handle: u32,
    pub timeout: u16,
    pub packet: CommonPacket<'a>,
}

impl<'a> RrData<'a> {
    pub fn decode(payload: &'a [u8]) -> EipResult<Self> {
        let mut dec = CipDecoder::new(payload);
        let interface_handle = dec.decode_u32()?;
        let timeout = dec.decode_u16()?;
        let packet = CommonPacket::decode(dec.rest())?;
        Ok(Self {
            interface_handle,
            timeout,
            packet,
        })
    }

    /// The message router request of an unconnected exchange
    ///
    /// Exactly a null address item followed by an unconnected data item.
    pub fn unconnected_request(&self) -> EipResult<&'a [u8]> {
        match self.packet.items.as_slice() {
            [address, data]
                if address.type_id == ITEM_NULL_ADDRESS
                    && address.data.is_empty()
                    && data.type_id == ITEM_UNCONNECTED_DATA =>
            {
                Ok(data.data)
            }
            items => Err(EipError::Protocol(format!(
                "expected null address and unconnected data items, got {:?}",
                items.iter().map(|item| item.type_id).collect::<Vec<_>>()
            ))),
        }
    }

    /// Payload of an unconnected reply carrying `response`
    pub fn unconnected_reply(response: &[u8]) -> EipResult<Vec<u8>> {
        let mut enc = CipEncoder::with_capacity(16 + response.len());
        enc.encode_u32(0).encode_u16(0);
        CommonPacket::new(vec![
            CpfItem::new(ITEM_NULL_ADDRESS, &[]),
            CpfItem::new(ITEM_UNCONNECTED_DATA, response),
        ])
        .encode(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rr_payload(request: &[u8]) -> Vec<u8> {
        let mut enc = CipEncoder::new();
        enc.encode_u32(0).encode_u16(10);
        CommonPacket::new(vec![
            CpfItem::new(ITEM_NULL_ADDRESS, &[]),
            CpfItem::new(ITEM_UNCONNECTED_DATA, request),
        ])
        .encode(&mut enc)
        .unwrap();
        enc.into_bytes()
    }

    #[test]
    fn test_decode_unconnected_request() {
        let request = [0x0E, 0x03, 0x20, 0xF5, 0x24, 0x01, 0x30, 0x08];
        let payload = rr_payload(&request);
        assert_eq!(
            &payload[..12],
            &[0, 0, 0, 0, 10, 0, 2, 0, 0, 0, 0, 0]
        );

        let rr = RrData::decode(&payload).unwrap();
        assert_eq!(rr.timeout, 10);
        assert_eq!(rr.unconnected_request().unwrap(), &request);
    }

    #[test]
    fn test_wrong_items_rejected() {
        let mut enc = CipEncoder::new();
        enc.encode_u32(0).encode_u16(0);
        CommonPacket::new(vec![CpfItem::new(ITEM_UNCONNECTED_DATA, &[1])])
            .encode(&mut enc)
            .unwrap();
        let payload = enc.into_bytes();
        let rr = RrData::decode(&payload).unwrap();
        assert!(rr.unconnected_request().is_err());
    }

    #[test]
    fn test_truncated_item() {
        let mut payload = rr_payload(&[1, 2, 3]);
        payload.pop();
        assert!(RrData::decode(&payload).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut payload = rr_payload(&[1, 2, 3]);
        payload.push(0);
        assert!(RrData::decode(&payload).is_err());
    }

    #[test]
    fn test_unconnected_reply_layout() {
        let reply = RrData::unconnected_reply(&[0x8E, 0, 0, 0, 1]).unwrap();
        assert_eq!(
            reply,
            vec![0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0xB2, 0, 5, 0, 0x8E, 0, 0, 0, 1]
        );
    }
}
