//! Stream accessor trait for transport layer

use async_trait::async_trait;
use bytes::BytesMut;
use enip_core::{EipError, EipResult};
use std::net::SocketAddr;

/// Byte stream to a remote peer carrying encapsulation frames
///
/// Reads append to a caller-owned `BytesMut`, so a read that is dropped
/// before completion never loses bytes already received. This lets a
/// connection task race a read against its outbound queue.
#[async_trait]
pub trait StreamAccessor: Send {
    /// Address of the remote peer, if connected
    fn peer_address(&self) -> Option<SocketAddr>;

    /// Append whatever bytes are available to `buf`
    ///
    /// # Returns
    ///
    /// Number of bytes appended, or 0 on EOF
    async fn read_into(&mut self, buf: &mut BytesMut) -> EipResult<usize>;

    /// Keep reading until `buf` holds at least `needed` bytes
    async fn read_at_least(&mut self, buf: &mut BytesMut, needed: usize) -> EipResult<()> {
        while buf.len() < needed {
            if self.read_into(buf).await? == 0 {
                return Err(EipError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Stream closed with {} of {} bytes", buf.len(), needed),
                )));
            }
        }
        Ok(())
    }

    /// Write the whole buffer
    async fn write_all(&mut self, buf: &[u8]) -> EipResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> EipResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the connection to the configured peer
    async fn open(&mut self) -> EipResult<()>;
}
