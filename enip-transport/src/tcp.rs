//! TCP transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use bytes::BytesMut;
use enip_core::config::ENIP_PORT;
use enip_core::{EipError, EipResult};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Peer address and I/O deadline of a TCP transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSettings {
    pub address: SocketAddr,
    /// Applies to connect and write; reads wait for the peer indefinitely
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Default deadline for connect and write
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Settings for a device's explicit messaging port
    pub fn device(ip: IpAddr) -> Self {
        Self::new(SocketAddr::new(ip, ENIP_PORT))
    }

    /// Replace the deadline; `None` waits forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    settings: TcpSettings,
    closed: bool,
}

fn not_connected() -> EipError {
    EipError::Connection(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "TCP stream not connected",
    ))
}

impl TcpTransport {
    /// Create a new, unopened TCP transport
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Wrap a stream accepted by a listener
    pub fn from_accepted(stream: TcpStream, timeout: Option<Duration>) -> EipResult<Self> {
        let address = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
            settings: TcpSettings { address, timeout },
            closed: false,
        })
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> EipResult<()> {
        if !self.closed {
            return Err(EipError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = match self.settings.timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| EipError::Timeout)??,
            None => TcpStream::connect(self.settings.address).await?,
        };
        stream.set_nodelay(true)?;

        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    fn peer_address(&self) -> Option<SocketAddr> {
        self.stream.as_ref().map(|_| self.settings.address)
    }

    async fn read_into(&mut self, buf: &mut BytesMut) -> EipResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;

        match stream.read_buf(buf).await {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(EipError::Connection(e))
            }
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> EipResult<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;

        match self.settings.timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.write_all(buf))
                .await
                .map_err(|_| EipError::Timeout)??,
            None => stream.write_all(buf).await?,
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> EipResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}
