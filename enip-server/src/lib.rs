//! EtherNet/IP device server
//!
//! This crate ties the encapsulation layer, the CIP object model and the
//! transports together into a device that answers discovery and explicit
//! messaging requests.
//!
//! # Status
//!
//! ## Encapsulation
//! - [x] RegisterSession / UnRegisterSession
//! - [x] ListServices, ListIdentity (randomized delay), ListInterfaces
//! - [x] SendRRData routed to the message router
//! - [x] SendUnitData handed to a pluggable handler
//! - [x] Session inactivity timeout
//! - [ ] Forward_Open / Forward_Close (connection manager)
//!
//! ## Objects
//! - [x] TCP/IP Interface object (0xF5)
//! - [ ] Identity (0x01) and Ethernet Link (0xF6) objects
//! - [ ] SetAttributeList
//!
//! ## Transport
//! - [x] TCP explicit messaging
//! - [x] UDP discovery on the port socket
//! - [ ] IPv6 addresses in ListIdentity

pub mod discovery;
pub mod listener;
pub mod server;

pub use listener::NetworkHandler;
pub use server::{ConnectedDataHandler, EnipServer};
