//! Message router request/response framing
//!
//! Request: service, path size in 16-bit words, path, data.
//! Response: service | 0x80, reserved, general status, additional status
//! size in words, additional status words, data.

use enip_core::{CipDecoder, CipEncoder, EipError, EipResult, GeneralStatus, LogicalPath};

/// Bit set in the service code of every reply
pub const REPLY_FLAG: u8 = 0x80;

/// A decoded explicit request, borrowing its data from the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterRequest<'a> {
    pub service: u8,
    pub path: LogicalPath,
    pub data: &'a [u8],
}

impl<'a> MessageRouterRequest<'a> {
    pub fn new(service: u8, path: LogicalPath, data: &'a [u8]) -> Self {
        Self { service, path, data }
    }

    pub fn decode(bytes: &'a [u8]) -> EipResult<Self> {
        let mut dec = CipDecoder::new(bytes);
        let service = dec.decode_u8()?;
        let words = dec.decode_u8()? as usize;
        let path = LogicalPath::decode(dec.decode_bytes(words * 2)?)?;
        Ok(Self {
            service,
            path,
            data: dec.rest(),
        })
    }

    pub fn encode(&self, enc: &mut CipEncoder) -> EipResult<()> {
        let mut path = CipEncoder::new();
        let len = self.path.encode(&mut path);
        let words = u8::try_from(len / 2)
            .map_err(|_| EipError::InvalidData(format!("path of {} bytes is too long", len)))?;
        enc.encode_u8(self.service)
            .encode_u8(words)
            .encode_bytes(path.as_slice())
            .encode_bytes(self.data);
        Ok(())
    }
}

/// Response under construction by a service handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterResponse {
    pub reply_service: u8,
    pub general_status: GeneralStatus,
    pub additional_status: Vec<u16>,
    pub data: CipEncoder,
}

impl MessageRouterResponse {
    /// Empty successful reply to `service`
    pub fn for_service(service: u8) -> Self {
        Self {
            reply_service: service | REPLY_FLAG,
            general_status: GeneralStatus::Success,
            additional_status: Vec::new(),
            data: CipEncoder::new(),
        }
    }

    /// Reply carrying only an error status
    pub fn error(service: u8, status: GeneralStatus) -> Self {
        let mut response = Self::for_service(service);
        response.general_status = status;
        response
    }

    pub fn encode(&self, enc: &mut CipEncoder) {
        enc.encode_u8(self.reply_service)
            .encode_u8(0)
            .encode_u8(self.general_status.to_u8())
            .encode_u8(self.additional_status.len() as u8);
        for word in &self.additional_status {
            enc.encode_u16(*word);
        }
        enc.encode_bytes(self.data.as_slice());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = CipEncoder::with_capacity(4 + self.data.len());
        self.encode(&mut enc);
        enc.into_bytes()
    }
}
