//! Core types and utilities for the EtherNet/IP device stack
//!
//! This crate provides fundamental types, error handling, and utilities
//! used throughout the encapsulation, object and server crates.

pub mod codec;
pub mod config;
pub mod datatypes;
pub mod error;
pub mod path;
pub mod status;

pub use codec::{CipDecoder, CipEncoder};
pub use config::{IdentityConfig, ServerConfig};
pub use datatypes::{CipDataType, CipValue};
pub use error::{EipError, EipResult};
pub use path::{LogicalPath, Segment};
pub use status::{EncapStatus, GeneralStatus};
