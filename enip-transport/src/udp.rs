//! UDP socket creation
//!
//! Binding is kept behind the `UdpBinder` trait so that the socket pool can
//! be driven by something other than the operating system in tests.

use enip_core::{EipError, EipResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Maximum UDP payload size
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65507;

/// Options applied to every socket the binder creates
#[derive(Debug, Clone)]
pub struct UdpSettings {
    /// Allow sending to broadcast addresses
    pub broadcast: bool,
    /// TTL for multicast datagrams
    pub multicast_ttl: u32,
}

impl Default for UdpSettings {
    fn default() -> Self {
        Self {
            broadcast: true,
            multicast_ttl: 1,
        }
    }
}

/// Creates and binds datagram sockets
///
/// Closing is dropping the returned socket.
pub trait UdpBinder {
    type Socket;

    /// Create a socket bound to `address`
    fn bind(&mut self, address: SocketAddr) -> EipResult<Self::Socket>;
}

/// Binder producing non-blocking tokio sockets
#[derive(Debug, Clone, Default)]
pub struct TokioUdpBinder {
    settings: UdpSettings,
}

impl TokioUdpBinder {
    pub fn new(settings: UdpSettings) -> Self {
        Self { settings }
    }

    /// Change the multicast TTL used for sockets bound from now on
    pub fn set_multicast_ttl(&mut self, ttl: u32) {
        self.settings.multicast_ttl = ttl;
    }
}

impl UdpBinder for TokioUdpBinder {
    /// Shared so tasks can send and receive concurrently. A holder of a
    /// clone must drop it before releasing the pool handle; otherwise the
    /// descriptor outlives the pool entry.
    type Socket = Arc<UdpSocket>;

    fn bind(&mut self, address: SocketAddr) -> EipResult<Self::Socket> {
        // from_std needs a reactor; report its absence instead of panicking
        tokio::runtime::Handle::try_current().map_err(|e| {
            EipError::Connection(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;

        let socket = std::net::UdpSocket::bind(address)?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(self.settings.broadcast)?;
        if address.is_ipv4() {
            socket.set_multicast_ttl_v4(self.settings.multicast_ttl)?;
        }
        Ok(Arc::new(UdpSocket::from_std(socket)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let mut binder = TokioUdpBinder::default();
        let socket = binder.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let local = socket.local_addr().unwrap();
        assert_ne!(local.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let mut binder = TokioUdpBinder::default();
        let first = binder.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let taken = first.local_addr().unwrap();
        assert!(matches!(binder.bind(taken), Err(EipError::Connection(_))));
    }

    #[test]
    fn test_bind_outside_runtime_fails_cleanly() {
        let mut binder = TokioUdpBinder::default();
        assert!(binder.bind("127.0.0.1:0".parse().unwrap()).is_err());
    }
}
