//! Transport layer module for the EtherNet/IP stack
//!
//! This crate provides the TCP stream transport used for explicit messaging
//! and the shared UDP socket pool used by I/O connections.

pub mod pool;
pub mod stream;
pub mod tcp;
pub mod udp;

pub use enip_core::{EipError, EipResult};
pub use pool::{PooledSocket, Release, SocketHandle, SocketPool};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};
pub use udp::{MAX_UDP_PAYLOAD_SIZE, TokioUdpBinder, UdpBinder, UdpSettings};
