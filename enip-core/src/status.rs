//! Status vocabularies
//!
//! Two separate code spaces exist on the wire: the 32-bit status word of the
//! encapsulation header and the 8-bit general status of a message router
//! response. Values are mandated by the protocol and must not change.

use std::fmt;

/// Encapsulation header status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EncapStatus {
    Success = 0x0000,
    InvalidCommand = 0x0001,
    InsufficientMemory = 0x0002,
    IncorrectData = 0x0003,
    InvalidSessionHandle = 0x0064,
    InvalidLength = 0x0065,
    UnsupportedProtocol = 0x0069,
}

impl EncapStatus {
    /// Wire value
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Parse a wire value, `None` for legacy or reserved codes
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000 => Some(Self::Success),
            0x0001 => Some(Self::InvalidCommand),
            0x0002 => Some(Self::InsufficientMemory),
            0x0003 => Some(Self::IncorrectData),
            0x0064 => Some(Self::InvalidSessionHandle),
            0x0065 => Some(Self::InvalidLength),
            0x0069 => Some(Self::UnsupportedProtocol),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// General status of a message router response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeneralStatus {
    Success = 0x00,
    ConnectionFailure = 0x01,
    ResourceUnavailable = 0x02,
    InvalidParameterValue = 0x03,
    PathSegmentError = 0x04,
    PathDestinationUnknown = 0x05,
    PartialTransfer = 0x06,
    ServiceNotSupported = 0x08,
    InvalidAttributeValue = 0x09,
    AttributeListError = 0x0A,
    ObjectStateConflict = 0x0C,
    AttributeNotSettable = 0x0E,
    PrivilegeViolation = 0x0F,
    DeviceStateConflict = 0x10,
    ReplyDataTooLarge = 0x11,
    NotEnoughData = 0x13,
    AttributeNotSupported = 0x14,
    TooMuchData = 0x15,
    ObjectDoesNotExist = 0x16,
    InvalidParameter = 0x20,
}

impl GeneralStatus {
    /// Wire value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, self.to_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encap_status_wire_values() {
        assert_eq!(EncapStatus::InvalidSessionHandle.to_u32(), 0x64);
        assert_eq!(EncapStatus::InvalidLength.to_u32(), 0x65);
        assert_eq!(EncapStatus::UnsupportedProtocol.to_u32(), 0x69);
        assert_eq!(EncapStatus::from_u32(0x0003), Some(EncapStatus::IncorrectData));
        assert_eq!(EncapStatus::from_u32(0x0066), None);
    }

    #[test]
    fn test_general_status_wire_values() {
        assert_eq!(GeneralStatus::PathDestinationUnknown.to_u8(), 0x05);
        assert_eq!(GeneralStatus::AttributeNotSettable.to_u8(), 0x0E);
        assert_eq!(GeneralStatus::AttributeNotSupported.to_u8(), 0x14);
        assert!(GeneralStatus::Success.is_success());
    }
}
