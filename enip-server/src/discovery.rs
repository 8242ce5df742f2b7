//! Replies to the session-less discovery commands

use enip_core::{CipEncoder, EipResult, IdentityConfig};
use enip_session::cpf::{ITEM_LIST_IDENTITY, ITEM_LIST_SERVICES};
use enip_session::{CommonPacket, CpfItem};
use std::net::SocketAddrV4;

/// Encapsulation protocol version implemented by this server
pub const PROTOCOL_VERSION: u16 = 1;

/// ListServices capability: CIP encapsulation over TCP
pub const CAPABILITY_CIP_TCP: u16 = 1 << 5;
/// ListServices capability: class 0/1 connected data over UDP
pub const CAPABILITY_CIP_UDP_CLASS01: u16 = 1 << 8;

/// Upper bound of a ListIdentity reply delay, in milliseconds
pub const LIST_IDENTITY_MAX_DELAY_MS: u16 = 2000;

const AF_INET: u16 = 2;

/// ListServices reply payload: a single "Communications" service
pub fn list_services() -> EipResult<Vec<u8>> {
    let mut name = [0u8; 16];
    name[..14].copy_from_slice(b"Communications");

    let mut item = CipEncoder::with_capacity(20);
    item.encode_u16(PROTOCOL_VERSION)
        .encode_u16(CAPABILITY_CIP_TCP | CAPABILITY_CIP_UDP_CLASS01)
        .encode_bytes(&name);

    CommonPacket::new(vec![CpfItem::new(ITEM_LIST_SERVICES, item.as_slice())]).to_bytes()
}

/// ListInterfaces reply payload: no interfaces
pub fn list_interfaces() -> Vec<u8> {
    vec![0, 0]
}

/// ListIdentity reply payload
///
/// The socket address is encoded like a `sockaddr_in`, in network order.
pub fn list_identity(identity: &IdentityConfig, address: SocketAddrV4) -> EipResult<Vec<u8>> {
    let mut item = CipEncoder::with_capacity(40 + identity.product_name.len());
    item.encode_u16(PROTOCOL_VERSION)
        .encode_u16_be(AF_INET)
        .encode_u16_be(address.port())
        .encode_u32_be(u32::from(*address.ip()))
        .encode_zeros(8)
        .encode_u16(identity.vendor_id)
        .encode_u16(identity.device_type)
        .encode_u16(identity.product_code)
        .encode_u8(identity.major_revision)
        .encode_u8(identity.minor_revision)
        .encode_u16(identity.status)
        .encode_u32(identity.serial_number)
        .encode_short_string(&identity.product_name)
        .encode_u8(identity.state);

    CommonPacket::new(vec![CpfItem::new(ITEM_LIST_IDENTITY, item.as_slice())]).to_bytes()
}

/// Delay bound in milliseconds requested by a ListIdentity sender context
///
/// The first two context bytes carry the bound (little-endian); 0 means
/// the default and larger values are capped at `cap`.
pub fn list_identity_delay_bound(sender_context: &[u8; 8], cap: u16) -> u16 {
    let requested = u16::from_le_bytes([sender_context[0], sender_context[1]]);
    let requested = if requested == 0 {
        LIST_IDENTITY_MAX_DELAY_MS
    } else {
        requested
    };
    requested.min(cap).min(LIST_IDENTITY_MAX_DELAY_MS)
}
