//! Session table
//!
//! Sessions are keyed by their handle and tied to the connection that
//! registered them. Handles start at 1 and are never reused while the
//! table lives.

use crate::state::SessionState;
use enip_core::{EipError, EipResult, EncapStatus};
use enip_transport::SocketHandle;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Identifier the driver assigns to each accepted TCP connection
pub type ConnectionId = u64;

/// Where a frame came from and where its reply goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    Tcp(ConnectionId),
    Udp(SocketAddr),
}

impl Peer {
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Peer::Tcp(id) => Some(*id),
            Peer::Udp(_) => None,
        }
    }
}

/// A registered encapsulation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    handle: u32,
    connection: ConnectionId,
    state: SessionState,
    last_activity: u64,
    sockets: Vec<SocketHandle>,
}

impl Session {
    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last time (µs) a frame arrived for this session
    pub fn last_activity(&self) -> u64 {
        self.last_activity
    }

    /// Pooled sockets held on behalf of this session
    pub fn sockets(&self) -> &[SocketHandle] {
        &self.sockets
    }

    fn transition(&mut self, new_state: SessionState) -> EipResult<()> {
        self.state.validate_transition(new_state)?;
        log::debug!(
            "Session 0x{:08X}: {} -> {}",
            self.handle,
            self.state.as_str(),
            new_state.as_str()
        );
        self.state = new_state;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SessionTable {
    sessions: HashMap<u32, Session>,
    by_connection: HashMap<ConnectionId, u32>,
    next_handle: u32,
    max_sessions: usize,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            by_connection: HashMap::new(),
            next_handle: 1,
            max_sessions,
        }
    }

    /// Register a session for `connection`
    ///
    /// A connection holds at most one session: a second registration is
    /// `InvalidCommand`. A full table or exhausted handle space is
    /// `InsufficientMemory`.
    pub fn register(&mut self, connection: ConnectionId, now: u64) -> Result<u32, EncapStatus> {
        if self.by_connection.contains_key(&connection) {
            return Err(EncapStatus::InvalidCommand);
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(EncapStatus::InsufficientMemory);
        }
        let handle = self.next_handle;
        self.next_handle = handle.checked_add(1).ok_or(EncapStatus::InsufficientMemory)?;

        let mut session = Session {
            handle,
            connection,
            state: SessionState::Unregistered,
            last_activity: now,
            sockets: Vec::new(),
        };
        session
            .transition(SessionState::Registered)
            .map_err(|_| EncapStatus::InvalidCommand)?;
        self.sessions.insert(handle, session);
        self.by_connection.insert(connection, handle);
        Ok(handle)
    }

    /// Whether `handle` is a registered session owned by `connection`
    pub fn validate(&self, handle: u32, connection: ConnectionId) -> bool {
        self.sessions
            .get(&handle)
            .is_some_and(|s| s.connection == connection && s.state.is_registered())
    }

    pub fn touch(&mut self, handle: u32, now: u64) {
        if let Some(session) = self.sessions.get_mut(&handle) {
            session.last_activity = now;
        }
    }

    pub fn get(&self, handle: u32) -> Option<&Session> {
        self.sessions.get(&handle)
    }

    pub fn session_for(&self, connection: ConnectionId) -> Option<u32> {
        self.by_connection.get(&connection).copied()
    }

    /// Record a pooled socket the session must release when it closes
    pub fn hold_socket(&mut self, handle: u32, socket: SocketHandle) -> EipResult<()> {
        let session = self
            .sessions
            .get_mut(&handle)
            .ok_or_else(|| EipError::Protocol(format!("no session 0x{:08X}", handle)))?;
        session.sockets.push(socket);
        Ok(())
    }

    /// Remove a session, returning it in the `Closed` state
    pub fn remove(&mut self, handle: u32) -> Option<Session> {
        let mut session = self.sessions.remove(&handle)?;
        self.by_connection.remove(&session.connection);
        if let Err(e) = session.transition(SessionState::Closed) {
            log::warn!("Session 0x{:08X}: {}", handle, e);
        }
        Some(session)
    }

    /// Sessions idle for longer than `timeout` µs at `now`
    pub fn idle_sessions(&self, now: u64, timeout: u64) -> Vec<u32> {
        let mut idle: Vec<u32> = self
            .sessions
            .values()
            .filter(|s| now.saturating_sub(s.last_activity) > timeout)
            .map(|s| s.handle)
            .collect();
        idle.sort_unstable();
        idle
    }

    pub fn handles(&self) -> Vec<u32> {
        let mut handles: Vec<u32> = self.sessions.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
