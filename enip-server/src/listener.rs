//! Network driver for the EtherNet/IP server
//!
//! `NetworkHandler` owns the TCP listener, the UDP port socket and the
//! [`EnipServer`] core. Every accepted connection gets a task that reads
//! the stream, reassembles frames and forwards them to the handler over a
//! channel; replies travel back over a per-connection queue. The handler
//! itself is the only place the server core is touched, so no locking is
//! needed around it.
//!
//! The UDP port socket is acquired from the server's socket pool. The
//! handler keeps a clone of it for receiving and drops that clone before
//! releasing the pool handle, so the socket closes when the pool's count
//! reaches zero.
//!
//! # Usage Example
//! ```rust,no_run
//! use enip_core::ServerConfig;
//! use enip_server::{EnipServer, NetworkHandler};
//! use enip_transport::TokioUdpBinder;
//!
//! # async fn run() -> enip_core::EipResult<()> {
//! let server = EnipServer::new(ServerConfig::default(), TokioUdpBinder::default())?;
//! let handler = NetworkHandler::bind(server).await?;
//! handler.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::server::EnipServer;
use bytes::{Bytes, BytesMut};
use enip_core::{EipError, EipResult};
use enip_session::{ConnectionId, EncapsulationHeader, FrameAssembler, Framed, Peer};
use enip_transport::{MAX_UDP_PAYLOAD_SIZE, SocketHandle, StreamAccessor, TcpTransport, TokioUdpBinder};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Frames waiting to be written on one connection
const OUTBOUND_QUEUE: usize = 16;
/// Events waiting for the handler, across all connections
const EVENT_QUEUE: usize = 256;

/// What a connection task reports to the handler
#[derive(Debug)]
enum Event {
    Frame(ConnectionId, Bytes),
    Oversized(ConnectionId, EncapsulationHeader),
    Closed(ConnectionId),
}

/// Drives an [`EnipServer`] over TCP and UDP
pub struct NetworkHandler {
    server: EnipServer<TokioUdpBinder>,
    listener: TcpListener,
    udp: Arc<UdpSocket>,
    udp_handle: SocketHandle,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    connections: HashMap<ConnectionId, mpsc::Sender<Vec<u8>>>,
    next_connection: ConnectionId,
    tick: Interval,
    udp_buf: Vec<u8>,
}

impl NetworkHandler {
    /// Bind the TCP listener and the UDP port socket
    ///
    /// The UDP socket comes from the server's socket pool, so I/O
    /// connections on the same address share it.
    pub async fn bind(mut server: EnipServer<TokioUdpBinder>) -> EipResult<Self> {
        let config = server.config().clone();

        let ttl = server.tcp_ip()?.ttl(1)?;
        server.pool_mut().binder_mut().set_multicast_ttl(u32::from(ttl));

        let listener = TcpListener::bind(config.tcp_address).await.map_err(|e| {
            EipError::Connection(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("Failed to bind to {}: {}", config.tcp_address, e),
            ))
        })?;

        let udp_handle = server.pool_mut().acquire(config.udp_address)?;
        let udp = match server.pool().socket(udp_handle) {
            Some(socket) => socket.clone(),
            None => {
                return Err(EipError::StaleHandle(format!(
                    "UDP socket for {} vanished from the pool",
                    config.udp_address
                )));
            }
        };

        let mut tick = tokio::time::interval(config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

        log::info!(
            "EtherNet/IP server listening on {} (TCP) and {} (UDP)",
            listener.local_addr()?,
            udp.local_addr()?
        );

        Ok(Self {
            server,
            listener,
            udp,
            udp_handle,
            events_tx,
            events_rx,
            connections: HashMap::new(),
            next_connection: 1,
            tick,
            udp_buf: vec![0; MAX_UDP_PAYLOAD_SIZE],
        })
    }

    pub fn local_tcp_address(&self) -> EipResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn local_udp_address(&self) -> EipResult<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    pub fn server(&self) -> &EnipServer<TokioUdpBinder> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut EnipServer<TokioUdpBinder> {
        &mut self.server
    }

    /// Number of open TCP connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Wait for one event and process it
    ///
    /// An event is an accepted connection, a datagram, a frame or close
    /// from a connection task, or a timer tick.
    pub async fn process_once(&mut self) -> EipResult<()> {
        tokio::select! {
            accepted = self.listener.accept() => match accepted {
                Ok((stream, peer)) => self.accept(stream, peer),
                Err(e) => log::error!("Error accepting connection: {}", e),
            },
            received = self.udp.recv_from(&mut self.udp_buf) => match received {
                Ok((n, from)) => {
                    if let Some(reply) = self.server.handle_frame(Peer::Udp(from), &self.udp_buf[..n]) {
                        send_udp(&self.udp, from, &reply).await;
                    }
                }
                Err(e) => log::warn!("UDP receive failed: {}", e),
            },
            Some(event) = self.events_rx.recv() => self.handle_event(event),
            _ = self.tick.tick() => self.on_tick().await,
        }
        Ok(())
    }

    /// Serve until `shutdown` completes, then close every session
    ///
    /// Returns the server core so its state can be inspected.
    pub async fn run_until<F>(mut self, shutdown: F) -> EipResult<EnipServer<TokioUdpBinder>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.process_once() => result?,
            }
        }
        Ok(self.stop())
    }

    /// Serve forever
    pub async fn run(self) -> EipResult<()> {
        self.run_until(std::future::pending()).await.map(|_| ())
    }

    fn stop(self) -> EnipServer<TokioUdpBinder> {
        let Self {
            mut server,
            listener,
            udp,
            udp_handle,
            connections,
            ..
        } = self;
        // Dropping the queues ends every connection task
        drop(connections);
        drop(listener);
        // The pool must hold the last reference when the handle is released
        drop(udp);
        if let Err(e) = server.pool_mut().release(udp_handle) {
            log::warn!("Releasing the UDP port socket: {}", e);
        }
        server.shutdown();
        server
    }

    fn accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let timeout = Some(self.server.config().connection_timeout);
        let transport = match TcpTransport::from_accepted(stream, timeout) {
            Ok(transport) => transport,
            Err(e) => {
                log::error!("Error setting up connection from {}: {}", peer, e);
                return;
            }
        };

        let id = self.next_connection;
        self.next_connection += 1;
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        self.connections.insert(id, outbound_tx);
        log::info!("Accepted connection {} from {}", id, peer);

        let assembler = FrameAssembler::new(self.server.config().max_frame_size);
        tokio::spawn(connection_task(id, transport, assembler, self.events_tx.clone(), outbound_rx));
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Frame(id, frame) => {
                if let Some(reply) = self.server.handle_frame(Peer::Tcp(id), &frame) {
                    self.send_tcp(id, reply);
                }
            }
            Event::Oversized(id, header) => {
                if let Some(reply) = self.server.handle_oversized(Peer::Tcp(id), &header) {
                    self.send_tcp(id, reply);
                }
            }
            Event::Closed(id) => {
                self.connections.remove(&id);
                self.server.connection_closed(id);
                log::info!("Connection {} closed", id);
            }
        }
    }

    async fn on_tick(&mut self) {
        for pending in self.server.manage_pending() {
            match pending.peer {
                Peer::Tcp(id) => self.send_tcp(id, pending.frame),
                Peer::Udp(address) => send_udp(&self.udp, address, &pending.frame).await,
            }
        }
        for id in self.server.check_inactivity() {
            if self.connections.remove(&id).is_some() {
                log::info!("Dropping inactive connection {}", id);
            }
        }
    }

    fn send_tcp(&mut self, id: ConnectionId, frame: Vec<u8>) {
        match self.connections.get(&id) {
            Some(outbound) => {
                if let Err(e) = outbound.try_send(frame) {
                    log::warn!("Connection {}: reply dropped: {}", id, e);
                }
            }
            None => log::debug!("Connection {} is gone, reply dropped", id),
        }
    }
}

async fn send_udp(socket: &UdpSocket, address: SocketAddr, frame: &[u8]) {
    if let Err(e) = socket.send_to(frame, address).await {
        log::warn!("UDP send to {} failed: {}", address, e);
    }
}

impl std::fmt::Debug for NetworkHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkHandler")
            .field("server", &self.server)
            .field("listener", &self.listener.local_addr().ok())
            .field("udp", &self.udp.local_addr().ok())
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

/// Read frames from one connection and write back its replies
///
/// Ends on EOF, on a read or write error, or when the handler drops the
/// outbound queue.
async fn connection_task(
    id: ConnectionId,
    mut transport: TcpTransport,
    mut assembler: FrameAssembler,
    events: mpsc::Sender<Event>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
) {
    let mut buf = BytesMut::with_capacity(4096);
    'connection: loop {
        tokio::select! {
            read = transport.read_into(&mut buf) => match read {
                Ok(0) => break,
                Ok(_) => loop {
                    let event = match assembler.next_frame(&mut buf) {
                        Ok(Some(Framed::Frame(frame))) => Event::Frame(id, frame),
                        Ok(Some(Framed::Oversized(header))) => Event::Oversized(id, header),
                        Ok(None) => break,
                        Err(e) => {
                            log::warn!("Connection {}: {}", id, e);
                            break 'connection;
                        }
                    };
                    if events.send(event).await.is_err() {
                        break 'connection;
                    }
                },
                Err(e) => {
                    log::debug!("Connection {}: {}", id, e);
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = transport.write_all(&frame).await {
                        log::warn!("Connection {}: write failed: {}", id, e);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if let Err(e) = transport.close().await {
        log::debug!("Connection {}: close failed: {}", id, e);
    }
    let _ = events.send(Event::Closed(id)).await;
}
