//! TCP/IP Interface object (Class ID: 0xF5)
//!
//! One instance per network interface, numbered from 1.
//!
//! # Attributes
//!
//! - Attribute 1: status (DWORD) - always 2, configured from hardware
//! - Attribute 2: configuration capability (DWORD)
//! - Attribute 3: configuration control (DWORD)
//! - Attribute 4: physical link object - path to the Ethernet Link instance
//! - Attribute 5: interface configuration - addresses and domain name
//! - Attribute 6: host name (STRING)
//! - Attribute 8: multicast TTL (USINT), settable, 0 is rejected
//! - Attribute 9: multicast configuration, settable
//! - Attribute 13: encapsulation inactivity timeout in seconds (UINT), settable
//!
//! Attributes 7, 10, 11 and 12 are not implemented; GetAttributeAll emits
//! zero-filled placeholders for them.

use crate::attribute::{CipAttribute, decode_status, expect_end};
use crate::class::{CipClass, attribute_mask};
use crate::instance::CipInstance;
use crate::registry::ClassRegistry;
use enip_core::{
    CipDataType, CipDecoder, CipEncoder, CipValue, EipError, EipResult, GeneralStatus, LogicalPath,
};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Class ID of the TCP/IP Interface object
pub const CLASS_CODE: u16 = 0xF5;
/// Class ID of the Ethernet Link object referenced by attribute 4
pub const ETHERNET_LINK_CLASS: u16 = 0xF6;
pub const REVISION: u16 = 4;

pub const ATTR_STATUS: u16 = 1;
pub const ATTR_CONFIGURATION_CAPABILITY: u16 = 2;
pub const ATTR_CONFIGURATION_CONTROL: u16 = 3;
pub const ATTR_PHYSICAL_LINK: u16 = 4;
pub const ATTR_INTERFACE_CONFIGURATION: u16 = 5;
pub const ATTR_HOST_NAME: u16 = 6;
pub const ATTR_SAFETY_NETWORK_NUMBER: u16 = 7;
pub const ATTR_TTL: u16 = 8;
pub const ATTR_MULTICAST_CONFIGURATION: u16 = 9;
pub const ATTR_SELECT_ACD: u16 = 10;
pub const ATTR_LAST_CONFLICT: u16 = 11;
pub const ATTR_QUICK_CONNECT: u16 = 12;
pub const ATTR_INACTIVITY_TIMEOUT: u16 = 13;

/// Interface status: configuration obtained from hardware settings
pub const STATUS_HARDWARE_CONFIGURED: u32 = 2;

/// Capability bits 0 (BOOTP), 1 (DNS), 2 (DHCP client), 5 (hardware configurable)
pub const CONFIGURATION_CAPABILITY: u32 = (1 << 0) | (1 << 1) | (1 << 2) | (1 << 5);

pub const DEFAULT_TTL: u8 = 1;
pub const DEFAULT_INACTIVITY_TIMEOUT: u16 = 120;

const MULTICAST_BASE: Ipv4Addr = Ipv4Addr::new(239, 192, 1, 0);

/// Widths of the attributes this object does not implement
const GET_ALL_PLACEHOLDERS: [(u16, usize); 4] = [
    (ATTR_SAFETY_NETWORK_NUMBER, 6),
    (ATTR_SELECT_ACD, 1),
    (ATTR_LAST_CONFLICT, 35),
    (ATTR_QUICK_CONNECT, 1),
];

/// Persistence hook for settable attributes
///
/// Called with the encoded value after a successful set of the TTL, the
/// multicast configuration or the inactivity timeout.
pub trait SettingsStore: Send + Sync {
    fn save(&self, instance_id: u32, attribute_id: u16, value: &[u8]) -> EipResult<()>;
}

/// Store that keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSettingsStore;

impl SettingsStore for NoopSettingsStore {
    fn save(&self, _instance_id: u32, _attribute_id: u16, _value: &[u8]) -> EipResult<()> {
        Ok(())
    }
}

/// Attribute 5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfiguration {
    pub ip_address: Ipv4Addr,
    pub network_mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub name_server: Ipv4Addr,
    pub name_server_2: Ipv4Addr,
    pub domain_name: String,
}

impl Default for InterfaceConfiguration {
    fn default() -> Self {
        Self {
            ip_address: Ipv4Addr::UNSPECIFIED,
            network_mask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
            name_server: Ipv4Addr::UNSPECIFIED,
            name_server_2: Ipv4Addr::UNSPECIFIED,
            domain_name: String::new(),
        }
    }
}

/// Attribute 9
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastConfig {
    /// 0: addresses derived from the interface address, 1: configured
    pub alloc_control: u8,
    pub reserved: u8,
    pub num_mcast: u16,
    pub starting_multicast_address: Ipv4Addr,
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            alloc_control: 0,
            reserved: 0,
            num_mcast: 0,
            starting_multicast_address: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// First multicast address of the CIP allocation for a host
///
/// `239.192.1.0 + ((((ip & !mask) - 1) & 0x3FF) << 5)`
pub fn multicast_base_address(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    let host_id = (u32::from(ip) & !u32::from(mask)).wrapping_sub(1) & 0x3FF;
    Ipv4Addr::from(u32::from(MULTICAST_BASE).wrapping_add(host_id << 5))
}

/// Instance state of the TCP/IP Interface object
pub struct TcpIpInterface {
    interface_configuration: InterfaceConfiguration,
    multicast: MulticastConfig,
    store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for TcpIpInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpIpInterface")
            .field("interface_configuration", &self.interface_configuration)
            .field("multicast", &self.multicast)
            .finish_non_exhaustive()
    }
}

pub type TcpIpInterfaceClass = CipClass<TcpIpInterface>;

impl TcpIpInterface {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            interface_configuration: InterfaceConfiguration::default(),
            multicast: MulticastConfig::default(),
            store,
        }
    }

    pub fn interface_configuration(&self) -> &InterfaceConfiguration {
        &self.interface_configuration
    }

    pub fn multicast(&self) -> &MulticastConfig {
        &self.multicast
    }

    /// Build instance `id` with its attribute table
    pub fn instance(id: u32, store: Arc<dyn SettingsStore>) -> EipResult<CipInstance<Self>> {
        let mut inst = CipInstance::new(id, Self::new(store));
        inst.insert_attribute(CipAttribute::new(
            ATTR_STATUS,
            CipDataType::Dword,
            CipValue::U32(STATUS_HARDWARE_CONFIGURED),
        ))?;
        inst.insert_attribute(CipAttribute::new(
            ATTR_CONFIGURATION_CAPABILITY,
            CipDataType::Dword,
            CipValue::U32(CONFIGURATION_CAPABILITY),
        ))?;
        inst.insert_attribute(CipAttribute::new(
            ATTR_CONFIGURATION_CONTROL,
            CipDataType::Dword,
            CipValue::U32(0),
        ))?;
        inst.insert_attribute(CipAttribute::computed(ATTR_PHYSICAL_LINK, get_physical_link))?;
        inst.insert_attribute(CipAttribute::computed(
            ATTR_INTERFACE_CONFIGURATION,
            get_interface_configuration,
        ))?;
        inst.insert_attribute(CipAttribute::new(
            ATTR_HOST_NAME,
            CipDataType::String,
            CipValue::Text(String::new()),
        ))?;
        inst.insert_attribute(
            CipAttribute::new(ATTR_TTL, CipDataType::Usint, CipValue::U8(DEFAULT_TTL))
                .settable()
                .with_setter(set_ttl),
        )?;
        inst.insert_attribute(
            CipAttribute::computed(ATTR_MULTICAST_CONFIGURATION, get_multicast)
                .settable()
                .with_setter(set_multicast),
        )?;
        inst.insert_attribute(
            CipAttribute::new(
                ATTR_INACTIVITY_TIMEOUT,
                CipDataType::Uint,
                CipValue::U16(DEFAULT_INACTIVITY_TIMEOUT),
            )
            .settable()
            .with_setter(set_inactivity_timeout),
        )?;
        Ok(inst)
    }

    /// Build the class with `interfaces` instances
    pub fn class(interfaces: u32, store: Arc<dyn SettingsStore>) -> EipResult<TcpIpInterfaceClass> {
        let mut class = CipClass::new(
            CLASS_CODE,
            "TCP/IP Interface",
            REVISION,
            attribute_mask(&[1, 2, 3, 6, 7]),
        );
        class.set_get_all_layout(&GET_ALL_PLACEHOLDERS)?;
        for id in 1..=interfaces {
            class.insert_instance(Self::instance(id, store.clone())?)?;
        }
        Ok(class)
    }

    /// Register the class unless it is already present
    pub fn init(registry: &mut ClassRegistry, interfaces: u32, store: Arc<dyn SettingsStore>) -> EipResult<bool> {
        registry.register_with(CLASS_CODE, || Self::class(interfaces, store))
    }

    pub fn class_ref(registry: &ClassRegistry) -> EipResult<&TcpIpInterfaceClass> {
        registry
            .class(CLASS_CODE)
            .ok_or_else(|| EipError::Config("TCP/IP Interface class is not registered".to_string()))
    }

    pub fn class_mut(registry: &mut ClassRegistry) -> EipResult<&mut TcpIpInterfaceClass> {
        registry
            .class_mut(CLASS_CODE)
            .ok_or_else(|| EipError::Config("TCP/IP Interface class is not registered".to_string()))
    }
}

// Device configuration and typed accessors
impl CipClass<TcpIpInterface> {
    fn interface(&self, instance_id: u32) -> EipResult<&CipInstance<TcpIpInterface>> {
        self.instance(instance_id)
            .ok_or_else(|| EipError::InvalidData(format!("no TCP/IP interface instance {}", instance_id)))
    }

    fn interface_mut(&mut self, instance_id: u32) -> EipResult<&mut CipInstance<TcpIpInterface>> {
        self.instance_mut(instance_id)
            .ok_or_else(|| EipError::InvalidData(format!("no TCP/IP interface instance {}", instance_id)))
    }

    /// Set address, mask and gateway, and derive the multicast base address
    pub fn configure_network_interface(
        &mut self,
        instance_id: u32,
        ip_address: Ipv4Addr,
        network_mask: Ipv4Addr,
        gateway: Ipv4Addr,
    ) -> EipResult<()> {
        let inst = self.interface_mut(instance_id)?;
        let state = inst.state_mut();
        state.interface_configuration.ip_address = ip_address;
        state.interface_configuration.network_mask = network_mask;
        state.interface_configuration.gateway = gateway;
        state.multicast.starting_multicast_address = multicast_base_address(ip_address, network_mask);
        log::info!(
            "TCP/IP interface {}: {}/{} gateway {}, multicast base {}",
            instance_id,
            ip_address,
            network_mask,
            gateway,
            state.multicast.starting_multicast_address
        );
        Ok(())
    }

    pub fn configure_name_servers(&mut self, instance_id: u32, primary: Ipv4Addr, secondary: Ipv4Addr) -> EipResult<()> {
        let state = self.interface_mut(instance_id)?.state_mut();
        state.interface_configuration.name_server = primary;
        state.interface_configuration.name_server_2 = secondary;
        Ok(())
    }

    pub fn configure_domain_name(&mut self, instance_id: u32, domain_name: &str) -> EipResult<()> {
        self.interface_mut(instance_id)?
            .state_mut()
            .interface_configuration
            .domain_name = domain_name.to_string();
        Ok(())
    }

    pub fn configure_host_name(&mut self, instance_id: u32, host_name: &str) -> EipResult<()> {
        self.interface_mut(instance_id)?
            .set_value(ATTR_HOST_NAME, CipValue::Text(host_name.to_string()))
    }

    pub fn multicast_config(&self, instance_id: u32) -> EipResult<MulticastConfig> {
        Ok(*self.interface(instance_id)?.state().multicast())
    }

    pub fn interface_configuration(&self, instance_id: u32) -> EipResult<&InterfaceConfiguration> {
        Ok(self.interface(instance_id)?.state().interface_configuration())
    }

    pub fn ip_address(&self, instance_id: u32) -> EipResult<Ipv4Addr> {
        Ok(self.interface_configuration(instance_id)?.ip_address)
    }

    pub fn host_name(&self, instance_id: u32) -> EipResult<&str> {
        self.interface(instance_id)?
            .value(ATTR_HOST_NAME)
            .and_then(CipValue::as_str)
            .ok_or_else(|| EipError::InvalidData("host name is not stored".to_string()))
    }

    pub fn ttl(&self, instance_id: u32) -> EipResult<u8> {
        self.interface(instance_id)?
            .value(ATTR_TTL)
            .and_then(CipValue::as_u8)
            .ok_or_else(|| EipError::InvalidData("TTL is not stored".to_string()))
    }

    /// Encapsulation inactivity timeout in seconds, 0 when disabled
    pub fn inactivity_timeout(&self, instance_id: u32) -> EipResult<u16> {
        self.interface(instance_id)?
            .value(ATTR_INACTIVITY_TIMEOUT)
            .and_then(CipValue::as_u16)
            .ok_or_else(|| EipError::InvalidData("inactivity timeout is not stored".to_string()))
    }
}

fn get_physical_link(inst: &CipInstance<TcpIpInterface>, _: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
    let count_at = out.len();
    out.encode_u16(0);
    let len = LogicalPath::new(ETHERNET_LINK_CLASS, inst.id()).encode(out);
    out.patch_u16(count_at, (len / 2) as u16)
        .map_err(|_| GeneralStatus::DeviceStateConflict)
}

fn get_interface_configuration(
    inst: &CipInstance<TcpIpInterface>,
    _: u16,
    out: &mut CipEncoder,
) -> Result<(), GeneralStatus> {
    let c = inst.state().interface_configuration();
    out.encode_u32(u32::from(c.ip_address))
        .encode_u32(u32::from(c.network_mask))
        .encode_u32(u32::from(c.gateway))
        .encode_u32(u32::from(c.name_server))
        .encode_u32(u32::from(c.name_server_2))
        .encode_string(&c.domain_name);
    Ok(())
}

fn get_multicast(inst: &CipInstance<TcpIpInterface>, _: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
    let m = inst.state().multicast();
    out.encode_u8(m.alloc_control)
        .encode_u8(0)
        .encode_u16(m.num_mcast)
        .encode_u32(u32::from(m.starting_multicast_address));
    Ok(())
}

fn set_ttl(inst: &mut CipInstance<TcpIpInterface>, id: u16, dec: &mut CipDecoder<'_>) -> Result<(), GeneralStatus> {
    let ttl = dec.decode_u8().map_err(decode_status)?;
    expect_end(dec)?;
    if ttl == 0 {
        return Err(GeneralStatus::InvalidAttributeValue);
    }
    inst.set_value(id, CipValue::U8(ttl))
        .map_err(|_| GeneralStatus::InvalidAttributeValue)?;
    persist(inst, id);
    Ok(())
}

fn set_inactivity_timeout(
    inst: &mut CipInstance<TcpIpInterface>,
    id: u16,
    dec: &mut CipDecoder<'_>,
) -> Result<(), GeneralStatus> {
    let seconds = dec.decode_u16().map_err(decode_status)?;
    expect_end(dec)?;
    inst.set_value(id, CipValue::U16(seconds))
        .map_err(|_| GeneralStatus::InvalidAttributeValue)?;
    persist(inst, id);
    Ok(())
}

fn set_multicast(inst: &mut CipInstance<TcpIpInterface>, id: u16, dec: &mut CipDecoder<'_>) -> Result<(), GeneralStatus> {
    let alloc_control = dec.decode_u8().map_err(decode_status)?;
    let reserved = dec.decode_u8().map_err(decode_status)?;
    let num_mcast = dec.decode_u16().map_err(decode_status)?;
    let start = dec.decode_u32().map_err(decode_status)?;
    expect_end(dec)?;
    inst.state_mut().multicast = MulticastConfig {
        alloc_control,
        reserved,
        num_mcast,
        starting_multicast_address: Ipv4Addr::from(start),
    };
    persist(inst, id);
    Ok(())
}

fn persist(inst: &CipInstance<TcpIpInterface>, id: u16) {
    let mut value = CipEncoder::new();
    if inst.get(id, &mut value).is_err() {
        return;
    }
    if let Err(e) = inst.state().store.save(inst.id(), id, value.as_slice()) {
        log::warn!(
            "Failed to persist attribute {} of TCP/IP interface {}: {}",
            id,
            inst.id(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{MessageRouterRequest, MessageRouterResponse};
    use crate::services;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<(u32, u16, Vec<u8>)>>,
    }

    impl SettingsStore for RecordingStore {
        fn save(&self, instance_id: u32, attribute_id: u16, value: &[u8]) -> EipResult<()> {
            self.saved
                .lock()
                .unwrap()
                .push((instance_id, attribute_id, value.to_vec()));
            Ok(())
        }
    }

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        TcpIpInterface::init(&mut registry, 1, Arc::new(NoopSettingsStore)).unwrap();
        registry
    }

    fn get(registry: &ClassRegistry, attribute_id: u16) -> Vec<u8> {
        let mut out = CipEncoder::new();
        registry.get_attribute(CLASS_CODE, 1, attribute_id, &mut out).unwrap();
        out.into_bytes()
    }

    #[test]
    fn test_multicast_worked_example() {
        let base = multicast_base_address(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(base, Ipv4Addr::new(239, 192, 2, 32));
    }

    #[test]
    fn test_multicast_host_id_wraps() {
        // host id 0 wraps to 0x3FF
        let base = multicast_base_address(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(255, 0, 0, 0));
        assert_eq!(u32::from(base), u32::from(MULTICAST_BASE) + (0x3FF << 5));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut registry = registry();
        assert!(!TcpIpInterface::init(&mut registry, 3, Arc::new(NoopSettingsStore)).unwrap());
        assert_eq!(TcpIpInterface::class_ref(&registry).unwrap().instance_count(), 1);
    }

    #[test]
    fn test_default_attributes() {
        let registry = registry();
        assert_eq!(get(&registry, ATTR_STATUS), vec![2, 0, 0, 0]);
        assert_eq!(get(&registry, ATTR_CONFIGURATION_CAPABILITY), vec![0x27, 0, 0, 0]);
        assert_eq!(get(&registry, ATTR_CONFIGURATION_CONTROL), vec![0, 0, 0, 0]);
        assert_eq!(get(&registry, ATTR_PHYSICAL_LINK), vec![2, 0, 0x20, 0xF6, 0x24, 0x01]);
        assert_eq!(get(&registry, ATTR_TTL), vec![1]);
        assert_eq!(get(&registry, ATTR_INACTIVITY_TIMEOUT), vec![120, 0]);
    }

    #[test]
    fn test_interface_configuration_encoding() {
        let mut registry = registry();
        let class = TcpIpInterface::class_mut(&mut registry).unwrap();
        class
            .configure_network_interface(
                1,
                Ipv4Addr::new(192, 168, 1, 10),
                Ipv4Addr::new(255, 255, 255, 0),
                Ipv4Addr::new(192, 168, 1, 1),
            )
            .unwrap();
        class.configure_domain_name(1, "plant").unwrap();
        class
            .configure_name_servers(1, Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::UNSPECIFIED)
            .unwrap();

        let data = get(&registry, ATTR_INTERFACE_CONFIGURATION);
        assert_eq!(&data[0..4], &[10, 1, 168, 192]);
        assert_eq!(&data[4..8], &[0, 255, 255, 255]);
        assert_eq!(&data[8..12], &[1, 1, 168, 192]);
        assert_eq!(&data[12..16], &[8, 8, 8, 8]);
        assert_eq!(&data[16..20], &[0, 0, 0, 0]);
        assert_eq!(&data[20..], &[5, 0, b'p', b'l', b'a', b'n', b't']);

        let multicast = get(&registry, ATTR_MULTICAST_CONFIGURATION);
        assert_eq!(multicast, vec![0, 0, 0, 0, 32, 2, 192, 239]);
    }

    #[test]
    fn test_ttl_rejects_zero() {
        let mut registry = registry();
        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_TTL, &[0]),
            Err(GeneralStatus::InvalidAttributeValue)
        );
        assert_eq!(TcpIpInterface::class_ref(&registry).unwrap().ttl(1).unwrap(), 1);

        for ttl in [1u8, 16, 255] {
            registry.set_attribute(CLASS_CODE, 1, ATTR_TTL, &[ttl]).unwrap();
            assert_eq!(get(&registry, ATTR_TTL), vec![ttl]);
            assert_eq!(TcpIpInterface::class_ref(&registry).unwrap().ttl(1).unwrap(), ttl);
        }
    }

    #[test]
    fn test_ttl_length_checks() {
        let mut registry = registry();
        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_TTL, &[]),
            Err(GeneralStatus::NotEnoughData)
        );
        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_TTL, &[5, 5]),
            Err(GeneralStatus::TooMuchData)
        );
        assert_eq!(get(&registry, ATTR_TTL), vec![1]);
    }

    #[test]
    fn test_read_only_attributes() {
        let mut registry = registry();
        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_HOST_NAME, &[0, 0]),
            Err(GeneralStatus::AttributeNotSettable)
        );
        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_SAFETY_NETWORK_NUMBER, &[0; 6]),
            Err(GeneralStatus::AttributeNotSupported)
        );
    }

    #[test]
    fn test_multicast_set_and_persist() {
        let store = Arc::new(RecordingStore::default());
        let mut registry = ClassRegistry::new();
        TcpIpInterface::init(&mut registry, 1, store.clone()).unwrap();

        let wire = [1, 0, 4, 0, 0x00, 0x05, 0xC0, 0xEF];
        registry
            .set_attribute(CLASS_CODE, 1, ATTR_MULTICAST_CONFIGURATION, &wire)
            .unwrap();
        let config = TcpIpInterface::class_ref(&registry).unwrap().multicast_config(1).unwrap();
        assert_eq!(config.alloc_control, 1);
        assert_eq!(config.num_mcast, 4);
        assert_eq!(config.starting_multicast_address, Ipv4Addr::new(239, 192, 5, 0));

        assert_eq!(
            registry.set_attribute(CLASS_CODE, 1, ATTR_MULTICAST_CONFIGURATION, &wire[..7]),
            Err(GeneralStatus::NotEnoughData)
        );
        registry
            .set_attribute(CLASS_CODE, 1, ATTR_INACTIVITY_TIMEOUT, &[30, 0])
            .unwrap();

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0], (1, ATTR_MULTICAST_CONFIGURATION, wire.to_vec()));
        assert_eq!(saved[1], (1, ATTR_INACTIVITY_TIMEOUT, vec![30, 0]));
    }

    #[test]
    fn test_get_attribute_all_has_no_gaps() {
        let mut registry = registry();
        TcpIpInterface::class_mut(&mut registry)
            .unwrap()
            .configure_host_name(1, "dev")
            .unwrap();

        let request = MessageRouterRequest::new(services::GET_ATTRIBUTE_ALL, LogicalPath::new(CLASS_CODE, 1), &[]);
        let mut response = MessageRouterResponse::for_service(services::GET_ATTRIBUTE_ALL);
        let status = registry.invoke_service(CLASS_CODE, 1, &request, &mut response);
        assert_eq!(status, GeneralStatus::Success);

        let data = response.data.as_slice();
        // 1-3: 12, 4: 6, 5: 22, 6: 5, 7: 6, 8: 1, 9: 8, 10: 1, 11: 35, 12: 1, 13: 2
        assert_eq!(data.len(), 99);
        assert_eq!(&data[40..45], &[3, 0, b'd', b'e', b'v']);
        assert!(data[45..51].iter().all(|b| *b == 0));
        assert_eq!(data[51], DEFAULT_TTL);
        assert!(data[60..97].iter().all(|b| *b == 0));
        assert_eq!(&data[97..], &[120, 0]);
    }

    #[test]
    fn test_class_level_attributes() {
        let registry = registry();
        let mut out = CipEncoder::new();
        registry.get_attribute(CLASS_CODE, 0, 1, &mut out).unwrap();
        registry.get_attribute(CLASS_CODE, 0, 6, &mut out).unwrap();
        registry.get_attribute(CLASS_CODE, 0, 7, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[4, 0, 7, 0, 13, 0]);
    }

    #[test]
    fn test_bad_instance_in_configuration() {
        let mut registry = registry();
        let class = TcpIpInterface::class_mut(&mut registry).unwrap();
        assert!(class.configure_host_name(2, "x").is_err());
        assert!(class.ttl(0).is_err());
    }
}
