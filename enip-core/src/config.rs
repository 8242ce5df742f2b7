//! Server and device configuration

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Registered EtherNet/IP port (0xAF12)
pub const ENIP_PORT: u16 = 44818;

/// Identity reported by ListIdentity
///
/// The Identity object itself lives outside this stack; these values are
/// what the embedding application declares about the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub vendor_id: u16,
    pub device_type: u16,
    pub product_code: u16,
    pub major_revision: u8,
    pub minor_revision: u8,
    pub status: u16,
    pub serial_number: u32,
    pub product_name: String,
    pub state: u8,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            vendor_id: 1,
            device_type: 0x0C,
            product_code: 65001,
            major_revision: 1,
            minor_revision: 2,
            status: 0,
            serial_number: 0x1234_5678,
            product_name: "enip_rs adapter".to_string(),
            state: 0xFF,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address of the TCP listener for explicit messaging
    pub tcp_address: SocketAddr,
    /// Address of the UDP socket answering unconnected datagrams
    pub udp_address: SocketAddr,
    /// Maximum number of concurrently registered sessions
    pub max_sessions: usize,
    /// Largest accepted encapsulation frame, header included
    pub max_frame_size: usize,
    /// Period of the deferred-response and inactivity sweep
    pub tick_interval: Duration,
    /// Upper bound for randomly delayed ListIdentity replies, in milliseconds
    pub list_identity_max_delay_ms: u16,
    /// Write timeout of accepted TCP connections
    pub connection_timeout: Duration,
    /// Identity reported by ListIdentity
    pub identity: IdentityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let any = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), ENIP_PORT);
        Self {
            tcp_address: any,
            udp_address: any,
            max_sessions: 20,
            max_frame_size: 4096,
            tick_interval: Duration::from_millis(10),
            list_identity_max_delay_ms: 2000,
            connection_timeout: Duration::from_secs(30),
            identity: IdentityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the TCP listener address
    pub fn with_tcp_address(mut self, address: SocketAddr) -> Self {
        self.tcp_address = address;
        self
    }

    /// Set the UDP socket address
    pub fn with_udp_address(mut self, address: SocketAddr) -> Self {
        self.udp_address = address;
        self
    }

    /// Set the session limit
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Set the largest accepted frame size
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Set the ListIdentity reply delay bound in milliseconds
    pub fn with_list_identity_max_delay(mut self, max_delay_ms: u16) -> Self {
        self.list_identity_max_delay_ms = max_delay_ms;
        self
    }

    /// Set the write timeout of accepted connections
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the sweep period
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Set the identity reported by ListIdentity
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.tcp_address.port(), 0xAF12);
        assert_eq!(config.max_sessions, 20);
        assert_eq!(config.list_identity_max_delay_ms, 2000);
    }

    #[test]
    fn test_builder() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .with_tcp_address(addr)
            .with_max_sessions(2);
        assert_eq!(config.tcp_address, addr);
        assert_eq!(config.max_sessions, 2);
    }
}
