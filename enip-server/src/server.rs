//! EtherNet/IP device server
//!
//! `EnipServer` is the synchronous core: it owns the class registry, the
//! session table, the deferred-response queue and the UDP socket pool, and
//! turns one received frame into at most one immediate reply. Network I/O
//! lives in [`crate::listener`].

use crate::discovery;
use enip_core::{EipError, EipResult, EncapStatus, ServerConfig};
use enip_object::tcpip_interface::{TcpIpInterface, TcpIpInterfaceClass};
use enip_object::{ClassRegistry, NoopSettingsStore, SettingsStore};
use enip_session::{
    Clock, Command, ConnectionId, EncapStatistics, EncapsulationHeader, EncapsulationMessage,
    MonotonicClock, Peer, PendingResponse, PendingResponses, RrData, SessionTable, encode_frame,
};
use enip_transport::{SocketHandle, SocketPool, UdpBinder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

/// Receiver of SendUnitData traffic (connected explicit and I/O data)
///
/// Returns the CPF payload of a SendUnitData frame to send back on the same
/// connection, if any.
pub trait ConnectedDataHandler: Send {
    fn handle_unit_data(&mut self, session: u32, data: &RrData<'_>) -> Option<Vec<u8>>;
}

/// Device server core
pub struct EnipServer<B: UdpBinder> {
    config: ServerConfig,
    registry: ClassRegistry,
    sessions: SessionTable,
    pending: PendingResponses,
    pool: SocketPool<B>,
    clock: Box<dyn Clock>,
    rng: StdRng,
    statistics: EncapStatistics,
    connected_data: Option<Box<dyn ConnectedDataHandler>>,
}

impl<B: UdpBinder> EnipServer<B> {
    /// Create a server with a monotonic clock and no persistence
    pub fn new(config: ServerConfig, binder: B) -> EipResult<Self> {
        Self::with_parts(
            config,
            binder,
            Box::new(MonotonicClock::new()),
            Arc::new(NoopSettingsStore),
        )
    }

    /// Create a server with explicit collaborators
    pub fn with_parts(
        config: ServerConfig,
        binder: B,
        clock: Box<dyn Clock>,
        store: Arc<dyn SettingsStore>,
    ) -> EipResult<Self> {
        if config.max_sessions == 0 {
            return Err(EipError::Config("max_sessions must be at least 1".to_string()));
        }
        let mut registry = ClassRegistry::new();
        TcpIpInterface::init(&mut registry, 1, store)?;

        Ok(Self {
            sessions: SessionTable::new(config.max_sessions),
            config,
            registry,
            pending: PendingResponses::new(),
            pool: SocketPool::new(binder),
            clock,
            rng: StdRng::from_entropy(),
            statistics: EncapStatistics::new(),
            connected_data: None,
        })
    }

    /// Use a fixed seed for the ListIdentity delay
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn set_connected_data_handler(&mut self, handler: Box<dyn ConnectedDataHandler>) {
        self.connected_data = Some(handler);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ClassRegistry {
        &mut self.registry
    }

    /// The TCP/IP Interface class, registered at construction
    pub fn tcp_ip(&self) -> EipResult<&TcpIpInterfaceClass> {
        TcpIpInterface::class_ref(&self.registry)
    }

    pub fn tcp_ip_mut(&mut self) -> EipResult<&mut TcpIpInterfaceClass> {
        TcpIpInterface::class_mut(&mut self.registry)
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn pool(&self) -> &SocketPool<B> {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut SocketPool<B> {
        &mut self.pool
    }

    pub fn statistics(&self) -> &EncapStatistics {
        &self.statistics
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn now(&self) -> u64 {
        self.clock.now_micros()
    }

    /// Acquire a pooled UDP socket on behalf of a session
    ///
    /// The socket is released when the session closes.
    pub fn acquire_socket(&mut self, session: u32, address: SocketAddr) -> EipResult<SocketHandle> {
        if self.sessions.get(session).is_none() {
            return Err(EipError::Protocol(format!("no session 0x{:08X}", session)));
        }
        let handle = self.pool.acquire(address)?;
        if let Err(e) = self.sessions.hold_socket(session, handle) {
            if let Err(release) = self.pool.release(handle) {
                log::warn!("Session 0x{:08X}: releasing unheld socket: {}", session, release);
            }
            return Err(e);
        }
        Ok(handle)
    }

    /// Process one received frame
    ///
    /// Returns the immediate reply, if the command has one.
    pub fn handle_frame(&mut self, peer: Peer, frame: &[u8]) -> Option<Vec<u8>> {
        self.statistics.increment_frames_received();

        let msg = match EncapsulationMessage::parse(frame) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Dropping frame from {:?}: {}", peer, e);
                return None;
            }
        };

        if !msg.length_matches() {
            return self.reject(peer, &msg, EncapStatus::InvalidLength);
        }

        let Some(command) = msg.header.command() else {
            return self.reject(peer, &msg, EncapStatus::InvalidCommand);
        };
        log::trace!("{:?}: {} ({} bytes)", peer, command.as_str(), msg.payload.len());

        let connection = match peer {
            Peer::Tcp(connection) => Some(connection),
            Peer::Udp(_) if command.is_sessionless() => None,
            Peer::Udp(_) => return self.reject(peer, &msg, EncapStatus::InvalidCommand),
        };

        if command.requires_session() {
            let handle = msg.header.session_handle;
            let valid = connection.is_some_and(|c| self.sessions.validate(handle, c));
            if !valid {
                return self.reject(peer, &msg, EncapStatus::InvalidSessionHandle);
            }
            let now = self.now();
            self.sessions.touch(handle, now);
        }

        match command {
            Command::Nop => None,
            Command::ListServices => match discovery::list_services() {
                Ok(payload) => self.reply(&msg, EncapStatus::Success, &payload),
                Err(e) => {
                    log::error!("ListServices reply failed: {}", e);
                    None
                }
            },
            Command::ListInterfaces => self.reply(&msg, EncapStatus::Success, &discovery::list_interfaces()),
            Command::ListIdentity => {
                self.defer_list_identity(peer, &msg);
                None
            }
            Command::RegisterSession => match connection {
                Some(connection) => self.register_session(peer, connection, &msg),
                None => self.reject(peer, &msg, EncapStatus::InvalidCommand),
            },
            Command::UnRegisterSession => {
                self.close_session(msg.header.session_handle);
                None
            }
            Command::SendRRData => self.send_rr_data(peer, &msg),
            Command::SendUnitData => self.send_unit_data(&msg),
        }
    }

    /// Reply to a frame that was too large to be received
    pub fn handle_oversized(&mut self, peer: Peer, header: &EncapsulationHeader) -> Option<Vec<u8>> {
        self.statistics.increment_frames_received();
        self.statistics.record_rejection(EncapStatus::InvalidLength);
        log::warn!(
            "{:?}: frame of {} bytes rejected with InvalidLength",
            peer,
            header.frame_length()
        );
        self.encode(header.reply(EncapStatus::InvalidLength), &[])
    }

    fn reject(&mut self, peer: Peer, msg: &EncapsulationMessage<'_>, status: EncapStatus) -> Option<Vec<u8>> {
        self.statistics.record_rejection(status);
        log::warn!(
            "{:?}: command 0x{:04X} rejected with {:?}",
            peer,
            msg.header.command,
            status
        );
        self.reply(msg, status, &[])
    }

    fn reply(&mut self, msg: &EncapsulationMessage<'_>, status: EncapStatus, payload: &[u8]) -> Option<Vec<u8>> {
        self.encode(msg.header.reply(status), payload)
    }

    fn encode(&mut self, header: EncapsulationHeader, payload: &[u8]) -> Option<Vec<u8>> {
        match encode_frame(header, payload) {
            Ok(frame) => {
                self.statistics.increment_responses_sent();
                Some(frame)
            }
            Err(e) => {
                log::error!("Failed to encode reply: {}", e);
                None
            }
        }
    }

    fn register_session(
        &mut self,
        peer: Peer,
        connection: ConnectionId,
        msg: &EncapsulationMessage<'_>,
    ) -> Option<Vec<u8>> {
        if msg.payload.len() < 4 {
            return self.reject(peer, msg, EncapStatus::IncorrectData);
        }
        let version = u16::from_le_bytes([msg.payload[0], msg.payload[1]]);
        let options = u16::from_le_bytes([msg.payload[2], msg.payload[3]]);
        let supported = [
            discovery::PROTOCOL_VERSION.to_le_bytes()[0],
            discovery::PROTOCOL_VERSION.to_le_bytes()[1],
            0,
            0,
        ];

        if version != discovery::PROTOCOL_VERSION || options != 0 {
            self.statistics.record_rejection(EncapStatus::UnsupportedProtocol);
            log::warn!(
                "{:?}: RegisterSession version {} options 0x{:04X} not supported",
                peer,
                version,
                options
            );
            return self.reply(msg, EncapStatus::UnsupportedProtocol, &supported);
        }

        let now = self.now();
        match self.sessions.register(connection, now) {
            Ok(handle) => {
                self.statistics.increment_sessions_opened();
                log::info!("Session 0x{:08X} registered on connection {}", handle, connection);
                let mut header = msg.header.reply(EncapStatus::Success);
                header.session_handle = handle;
                self.encode(header, &supported)
            }
            Err(status) => self.reject(peer, msg, status),
        }
    }

    fn send_rr_data(&mut self, peer: Peer, msg: &EncapsulationMessage<'_>) -> Option<Vec<u8>> {
        let request = match RrData::decode(msg.payload).and_then(|rr| rr.unconnected_request()) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Malformed SendRRData: {}", e);
                return self.reject(peer, msg, EncapStatus::IncorrectData);
            }
        };

        let response = self.registry.handle_request(request);
        match RrData::unconnected_reply(&response.to_bytes()) {
            Ok(payload) => self.reply(msg, EncapStatus::Success, &payload),
            Err(e) => {
                log::error!("SendRRData reply failed: {}", e);
                None
            }
        }
    }

    fn send_unit_data(&mut self, msg: &EncapsulationMessage<'_>) -> Option<Vec<u8>> {
        let Some(handler) = self.connected_data.as_mut() else {
            log::debug!("SendUnitData without a connected data handler, ignored");
            return None;
        };
        let data = match RrData::decode(msg.payload) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Malformed SendUnitData: {}", e);
                return None;
            }
        };
        let payload = handler.handle_unit_data(msg.header.session_handle, &data)?;
        self.reply(msg, EncapStatus::Success, &payload)
    }

    fn defer_list_identity(&mut self, peer: Peer, msg: &EncapsulationMessage<'_>) {
        let address = self.identity_address();
        let payload = match discovery::list_identity(&self.config.identity, address) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("ListIdentity reply failed: {}", e);
                return;
            }
        };
        let Some(frame) = self.reply(msg, EncapStatus::Success, &payload) else {
            return;
        };

        let bound = discovery::list_identity_delay_bound(
            &msg.header.sender_context,
            self.config.list_identity_max_delay_ms,
        );
        let delay_ms = if bound == 0 {
            0
        } else {
            self.rng.gen_range(0..bound as u64)
        };
        let due = self.now() + delay_ms * 1000;
        log::debug!("{:?}: ListIdentity reply in {} ms", peer, delay_ms);
        // The header's session handle is not validated for ListIdentity;
        // file the reply under the session the sending connection owns
        let session = peer
            .connection()
            .and_then(|connection| self.sessions.session_for(connection))
            .unwrap_or(0);
        self.pending.schedule(session, peer, due, frame);
    }

    /// Address reported by ListIdentity: the configured interface address
    /// of TCP/IP instance 1, or the listener address when unconfigured
    fn identity_address(&self) -> SocketAddrV4 {
        let port = self.config.tcp_address.port();
        let configured = self
            .tcp_ip()
            .and_then(|class| class.ip_address(1))
            .ok()
            .filter(|ip| !ip.is_unspecified());
        let ip = match (configured, self.config.tcp_address.ip()) {
            (Some(ip), _) => ip,
            (None, IpAddr::V4(ip)) => ip,
            (None, IpAddr::V6(_)) => std::net::Ipv4Addr::UNSPECIFIED,
        };
        SocketAddrV4::new(ip, port)
    }

    /// Deferred replies due now, each returned once
    pub fn manage_pending(&mut self) -> Vec<PendingResponse> {
        let now = self.now();
        let due = self.pending.take_due(now);
        self.statistics.add_deferred_flushed(due.len());
        due
    }

    /// Close sessions idle longer than the TCP/IP inactivity timeout
    ///
    /// Returns the connections whose session was closed; the driver drops
    /// them.
    pub fn check_inactivity(&mut self) -> Vec<ConnectionId> {
        let seconds = match self.tcp_ip().and_then(|class| class.inactivity_timeout(1)) {
            Ok(0) => return Vec::new(),
            Ok(seconds) => seconds,
            Err(e) => {
                log::warn!("No inactivity timeout available: {}", e);
                return Vec::new();
            }
        };
        let now = self.now();
        let mut closed = Vec::new();
        for handle in self.sessions.idle_sessions(now, seconds as u64 * 1_000_000) {
            if let Some(connection) = self.sessions.get(handle).map(|s| s.connection()) {
                log::info!("Session 0x{:08X} inactive for {} s", handle, seconds);
                self.close_session(handle);
                self.statistics.increment_sessions_timed_out();
                closed.push(connection);
            }
        }
        closed
    }

    /// Close a session: drop its deferred replies and release its sockets
    pub fn close_session(&mut self, handle: u32) -> bool {
        let Some(session) = self.sessions.remove(handle) else {
            return false;
        };
        let dropped = self.pending.drop_session(handle);
        self.statistics.add_deferred_dropped(dropped);
        for socket in session.sockets() {
            if let Err(e) = self.pool.release(*socket) {
                log::warn!("Session 0x{:08X}: {}", handle, e);
            }
        }
        self.statistics.increment_sessions_closed();
        log::info!(
            "Session 0x{:08X} closed, {} deferred replies dropped, {} sockets released",
            handle,
            dropped,
            session.sockets().len()
        );
        true
    }

    /// Forget a TCP connection that went away
    pub fn connection_closed(&mut self, connection: ConnectionId) {
        if let Some(handle) = self.sessions.session_for(connection) {
            self.close_session(handle);
        }
        let dropped = self.pending.drop_connection(connection);
        self.statistics.add_deferred_dropped(dropped);
    }

    /// Close every session and socket
    pub fn shutdown(&mut self) {
        for handle in self.sessions.handles() {
            self.close_session(handle);
        }
        self.pool.close_all();
        log::info!("EtherNet/IP server shut down");
    }
}

impl<B: UdpBinder> std::fmt::Debug for EnipServer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnipServer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("sessions", &self.sessions.len())
            .field("pending", &self.pending.len())
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}
