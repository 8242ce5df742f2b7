//! Rust implementation of an EtherNet/IP device
//!
//! # Architecture
//!
//! The library is organized as a workspace with multiple crates:
//!
//! - `enip-core`: error types, status codes, CIP codec, paths and configuration
//! - `enip-transport`: TCP stream transport and the shared UDP socket pool
//! - `enip-object`: CIP object model and the TCP/IP Interface object
//! - `enip-session`: encapsulation header, CPF, framing and session table
//! - `enip-server`: the device server and its network driver
//!
//! # Usage
//!
//! ```no_run
//! use enip::{EnipServer, NetworkHandler, ServerConfig};
//! use enip::transport::TokioUdpBinder;
//!
//! # async fn run() -> enip::EipResult<()> {
//! let mut server = EnipServer::new(ServerConfig::default(), TokioUdpBinder::default())?;
//! server.tcp_ip_mut()?.configure_network_interface(
//!     1,
//!     "192.168.1.10".parse().unwrap(),
//!     "255.255.255.0".parse().unwrap(),
//!     "192.168.1.1".parse().unwrap(),
//! )?;
//! NetworkHandler::bind(server).await?.run().await
//! # }
//! ```

pub use enip_core::{
    CipDataType, CipDecoder, CipEncoder, CipValue, EipError, EipResult, EncapStatus, GeneralStatus,
    IdentityConfig, LogicalPath, ServerConfig,
};
pub use enip_server::{ConnectedDataHandler, EnipServer, NetworkHandler};

pub mod transport {
    pub use enip_transport::*;
}

pub mod session {
    pub use enip_session::*;
}

pub mod object {
    pub use enip_object::*;
}

pub mod server {
    pub use enip_server::*;
}
