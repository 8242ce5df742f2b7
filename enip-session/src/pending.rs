//! Deferred responses
//!
//! Replies that must not go out immediately (ListIdentity) wait here until
//! their due time. The driver calls [`PendingResponses::take_due`] on every
//! tick; each entry is returned exactly once.

use crate::session::{ConnectionId, Peer};
use std::collections::BTreeMap;

/// A reply frame waiting for its due time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResponse {
    /// Session the request arrived on, 0 when session-less
    pub session: u32,
    pub peer: Peer,
    /// Due time in µs
    pub due: u64,
    pub frame: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct PendingResponses {
    entries: BTreeMap<(u64, u64), PendingResponse>,
    sequence: u64,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, session: u32, peer: Peer, due: u64, frame: Vec<u8>) {
        let key = (due, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        self.entries.insert(
            key,
            PendingResponse {
                session,
                peer,
                due,
                frame,
            },
        );
    }

    /// Remove and return every entry due at `now`, earliest first
    pub fn take_due(&mut self, now: u64) -> Vec<PendingResponse> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    /// Drop every entry of `session`, returning how many were dropped
    pub fn drop_session(&mut self, session: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.session != session);
        before - self.entries.len()
    }

    /// Drop every entry addressed to `connection`
    pub fn drop_connection(&mut self, connection: ConnectionId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.peer.connection() != Some(connection));
        before - self.entries.len()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
