//! CIP object model for the EtherNet/IP stack
//!
//! A device exposes classes, each holding contiguously numbered instances,
//! each holding typed attributes. Requests address a (class, instance,
//! service) triple and are dispatched through the `ClassRegistry`.
//!
//! # Layout
//!
//! - [`attribute`]: one attribute and its codec (default or custom)
//! - [`instance`]: attribute table plus instance-scoped state
//! - [`class`]: instances, service tables and class attributes
//! - [`services`]: the standard attribute services
//! - [`registry`]: class registry and message router entry point
//! - [`router`]: message router request/response framing
//! - [`tcpip_interface`]: the TCP/IP Interface object (class 0xF5)

pub mod attribute;
pub mod class;
pub mod instance;
pub mod registry;
pub mod router;
pub mod services;
pub mod tcpip_interface;

pub use attribute::{AttrGetFn, AttrSetFn, CipAttribute, Handler};
pub use class::{CipClass, ServiceFn, attribute_mask};
pub use instance::CipInstance;
pub use registry::{CipObject, ClassRegistry};
pub use router::{MessageRouterRequest, MessageRouterResponse};
pub use tcpip_interface::{
    InterfaceConfiguration, MulticastConfig, NoopSettingsStore, SettingsStore, TcpIpInterface,
};
