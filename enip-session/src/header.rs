//! Encapsulation header
//!
//! Every EtherNet/IP frame starts with a 24-byte little-endian header:
//! command (2), length (2), session handle (4), status (4), sender
//! context (8), options (4). `length` counts the bytes after the header.

use enip_core::{CipDecoder, CipEncoder, EipError, EipResult, EncapStatus};

/// Encapsulation header length
pub const ENCAPSULATION_HEADER_LENGTH: usize = 24;

/// Encapsulation commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    Nop = 0x0000,
    ListServices = 0x0004,
    ListIdentity = 0x0063,
    ListInterfaces = 0x0064,
    RegisterSession = 0x0065,
    UnRegisterSession = 0x0066,
    SendRRData = 0x006F,
    SendUnitData = 0x0070,
}

impl Command {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::Nop),
            0x0004 => Some(Self::ListServices),
            0x0063 => Some(Self::ListIdentity),
            0x0064 => Some(Self::ListInterfaces),
            0x0065 => Some(Self::RegisterSession),
            0x0066 => Some(Self::UnRegisterSession),
            0x006F => Some(Self::SendRRData),
            0x0070 => Some(Self::SendUnitData),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Whether the header must carry a registered session handle
    pub fn requires_session(self) -> bool {
        matches!(
            self,
            Self::UnRegisterSession | Self::SendRRData | Self::SendUnitData
        )
    }

    /// Discovery commands, accepted without a session and over UDP
    pub fn is_sessionless(self) -> bool {
        matches!(
            self,
            Self::Nop | Self::ListServices | Self::ListIdentity | Self::ListInterfaces
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::ListServices => "ListServices",
            Self::ListIdentity => "ListIdentity",
            Self::ListInterfaces => "ListInterfaces",
            Self::RegisterSession => "RegisterSession",
            Self::UnRegisterSession => "UnRegisterSession",
            Self::SendRRData => "SendRRData",
            Self::SendUnitData => "SendUnitData",
        }
    }
}

/// Encapsulation header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncapsulationHeader {
    pub command: u16,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: [u8; 8],
    pub options: u32,
}

impl EncapsulationHeader {
    pub fn new(command: Command, session_handle: u32) -> Self {
        Self {
            command: command.to_u16(),
            session_handle,
            ..Self::default()
        }
    }

    pub fn with_sender_context(mut self, sender_context: [u8; 8]) -> Self {
        self.sender_context = sender_context;
        self
    }

    /// Known command, if any
    pub fn command(&self) -> Option<Command> {
        Command::from_u16(self.command)
    }

    pub fn encode(&self, enc: &mut CipEncoder) {
        enc.encode_u16(self.command)
            .encode_u16(self.length)
            .encode_u32(self.session_handle)
            .encode_u32(self.status)
            .encode_bytes(&self.sender_context)
            .encode_u32(self.options);
    }

    pub fn decode(data: &[u8]) -> EipResult<Self> {
        if data.len() < ENCAPSULATION_HEADER_LENGTH {
            return Err(EipError::Truncated {
                needed: ENCAPSULATION_HEADER_LENGTH,
                available: data.len(),
            });
        }
        let mut dec = CipDecoder::new(data);
        let command = dec.decode_u16()?;
        let length = dec.decode_u16()?;
        let session_handle = dec.decode_u32()?;
        let status = dec.decode_u32()?;
        let mut sender_context = [0u8; 8];
        sender_context.copy_from_slice(dec.decode_bytes(8)?);
        let options = dec.decode_u32()?;
        Ok(Self {
            command,
            length,
            session_handle,
            status,
            sender_context,
            options,
        })
    }

    /// Total frame size announced by the header
    pub fn frame_length(&self) -> usize {
        ENCAPSULATION_HEADER_LENGTH + self.length as usize
    }

    /// Header for the reply to this request: command, session handle and
    /// sender context are echoed
    pub fn reply(&self, status: EncapStatus) -> Self {
        Self {
            command: self.command,
            length: 0,
            session_handle: self.session_handle,
            status: status.to_u32(),
            sender_context: self.sender_context,
            options: 0,
        }
    }
}

/// A parsed frame borrowing its payload from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapsulationMessage<'a> {
    pub header: EncapsulationHeader,
    pub payload: &'a [u8],
}

impl<'a> EncapsulationMessage<'a> {
    /// Split a frame into header and payload
    ///
    /// The declared length is not checked here; see [`Self::length_matches`].
    pub fn parse(frame: &'a [u8]) -> EipResult<Self> {
        let header = EncapsulationHeader::decode(frame)?;
        Ok(Self {
            header,
            payload: &frame[ENCAPSULATION_HEADER_LENGTH..],
        })
    }

    pub fn length_matches(&self) -> bool {
        self.header.length as usize == self.payload.len()
    }

    /// Encode a reply frame echoing this request
    pub fn encode_reply(&self, status: EncapStatus, payload: &[u8]) -> EipResult<Vec<u8>> {
        encode_frame(self.header.reply(status), payload)
    }
}

/// Encode `header` followed by `payload`, filling in the length field
pub fn encode_frame(mut header: EncapsulationHeader, payload: &[u8]) -> EipResult<Vec<u8>> {
    header.length = u16::try_from(payload.len()).map_err(|_| {
        EipError::InvalidData(format!("payload of {} bytes does not fit a frame", payload.len()))
    })?;
    let mut enc = CipEncoder::with_capacity(ENCAPSULATION_HEADER_LENGTH + payload.len());
    header.encode(&mut enc);
    enc.encode_bytes(payload);
    Ok(enc.into_bytes())
}
