//! Encapsulation and session layer for EtherNet/IP
//!
//! This crate is sans-IO: it frames, parses and tracks state, and leaves
//! sockets to `enip-transport` and the driver loop to `enip-server`.
//!
//! # Layout
//!
//! - [`header`]: 24-byte encapsulation header and command codes
//! - [`cpf`]: common packet format items carried by SendRRData
//! - [`framing`]: reassembly of encapsulation frames from a TCP byte stream
//! - [`state`] / [`session`]: per-connection session state and the session table
//! - [`pending`]: deferred responses
//! - [`clock`]: time source used for deferral and inactivity; `ManualClock`
//!   needs the `test-util` feature
//! - [`statistics`]: counters

pub mod clock;
pub mod cpf;
pub mod framing;
pub mod header;
pub mod pending;
pub mod session;
pub mod state;
pub mod statistics;

pub use clock::{Clock, MonotonicClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use cpf::{CommonPacket, CpfItem, RrData};
pub use framing::{FrameAssembler, Framed};
pub use header::{
    Command, ENCAPSULATION_HEADER_LENGTH, EncapsulationHeader, EncapsulationMessage, encode_frame,
};
pub use pending::{PendingResponse, PendingResponses};
pub use session::{ConnectionId, Peer, Session, SessionTable};
pub use state::SessionState;
pub use statistics::EncapStatistics;
