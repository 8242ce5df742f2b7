//! Encapsulation statistics

use enip_core::EncapStatus;

/// Counters kept by the server for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncapStatistics {
    /// Frames taken from TCP or UDP
    pub frames_received: u64,
    /// Reply frames handed to the network, deferred ones included
    pub responses_sent: u64,
    pub invalid_length: u64,
    pub invalid_command: u64,
    pub invalid_session: u64,
    pub unsupported_protocol: u64,
    pub incorrect_data: u64,
    pub insufficient_memory: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    /// Sessions closed by the inactivity sweep
    pub sessions_timed_out: u64,
    pub deferred_flushed: u64,
    /// Deferred replies discarded because their session closed
    pub deferred_dropped: u64,
}

impl EncapStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_frames_received(&mut self) {
        self.frames_received += 1;
    }

    pub fn increment_responses_sent(&mut self) {
        self.responses_sent += 1;
    }

    pub fn increment_sessions_opened(&mut self) {
        self.sessions_opened += 1;
    }

    pub fn increment_sessions_closed(&mut self) {
        self.sessions_closed += 1;
    }

    pub fn increment_sessions_timed_out(&mut self) {
        self.sessions_timed_out += 1;
    }

    pub fn add_deferred_flushed(&mut self, count: usize) {
        self.deferred_flushed += count as u64;
    }

    pub fn add_deferred_dropped(&mut self, count: usize) {
        self.deferred_dropped += count as u64;
    }

    /// Count a frame answered with an error status
    pub fn record_rejection(&mut self, status: EncapStatus) {
        match status {
            EncapStatus::InvalidLength => self.invalid_length += 1,
            EncapStatus::InvalidCommand => self.invalid_command += 1,
            EncapStatus::InvalidSessionHandle => self.invalid_session += 1,
            EncapStatus::UnsupportedProtocol => self.unsupported_protocol += 1,
            EncapStatus::IncorrectData => self.incorrect_data += 1,
            EncapStatus::InsufficientMemory => self.insufficient_memory += 1,
            EncapStatus::Success => {}
        }
    }

    /// Frames rejected for any reason
    pub fn rejected(&self) -> u64 {
        self.invalid_length
            + self.invalid_command
            + self.invalid_session
            + self.unsupported_protocol
            + self.incorrect_data
            + self.insufficient_memory
    }
}
