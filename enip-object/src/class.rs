//! CIP class: instances, service tables and class-level attributes

use crate::attribute::CipAttribute;
use crate::instance::CipInstance;
use crate::router::{MessageRouterRequest, MessageRouterResponse};
use crate::services;
use enip_core::{CipEncoder, EipError, EipResult, GeneralStatus};
use std::collections::BTreeMap;

/// Service handler
///
/// Receives the class, the addressed instance id (0 for the class itself),
/// the request and the response to fill. The returned status is written to
/// the response independently of the bytes the handler produced.
pub type ServiceFn<S> =
    fn(&mut CipClass<S>, u32, &MessageRouterRequest<'_>, &mut MessageRouterResponse) -> GeneralStatus;

// Class attribute ids
pub const CLASS_ATTR_REVISION: u16 = 1;
pub const CLASS_ATTR_MAX_INSTANCE: u16 = 2;
pub const CLASS_ATTR_INSTANCE_COUNT: u16 = 3;
pub const CLASS_ATTR_OPTIONAL_ATTRIBUTES: u16 = 4;
pub const CLASS_ATTR_OPTIONAL_SERVICES: u16 = 5;
pub const CLASS_ATTR_MAX_CLASS_ATTRIBUTE: u16 = 6;
pub const CLASS_ATTR_MAX_INSTANCE_ATTRIBUTE: u16 = 7;

/// Build a class attribute mask with bit n set for each id n
pub const fn attribute_mask(ids: &[u16]) -> u32 {
    let mut mask = 0u32;
    let mut i = 0;
    while i < ids.len() {
        if ids[i] < 32 {
            mask |= 1 << ids[i];
        }
        i += 1;
    }
    mask
}

struct ServiceEntry<S> {
    name: &'static str,
    handler: ServiceFn<S>,
}

/// A class with its instances
pub struct CipClass<S> {
    class_code: u16,
    name: String,
    revision: u16,
    class_attribute_mask: u32,
    instances: Vec<CipInstance<S>>,
    instance_services: BTreeMap<u8, ServiceEntry<S>>,
    class_services: BTreeMap<u8, ServiceEntry<S>>,
    get_all_layout: Option<BTreeMap<u16, usize>>,
}

impl<S> CipClass<S> {
    /// New class with the standard attribute services installed
    pub fn new(class_code: u16, name: impl Into<String>, revision: u16, class_attribute_mask: u32) -> Self {
        let mut class = Self {
            class_code,
            name: name.into(),
            revision,
            class_attribute_mask,
            instances: Vec::new(),
            instance_services: BTreeMap::new(),
            class_services: BTreeMap::new(),
            get_all_layout: None,
        };

        class.insert_class_service(
            services::GET_ATTRIBUTE_ALL,
            "GetAttributeAll",
            services::get_attribute_all,
        );
        class.insert_class_service(
            services::GET_ATTRIBUTE_SINGLE,
            "GetAttributeSingle",
            services::get_attribute_single,
        );
        class.insert_service(
            services::GET_ATTRIBUTE_ALL,
            "GetAttributeAll",
            services::get_attribute_all,
        );
        class.insert_service(
            services::GET_ATTRIBUTE_LIST,
            "GetAttributeList",
            services::get_attribute_list,
        );
        class.insert_service(
            services::GET_ATTRIBUTE_SINGLE,
            "GetAttributeSingle",
            services::get_attribute_single,
        );
        class.insert_service(
            services::SET_ATTRIBUTE_SINGLE,
            "SetAttributeSingle",
            services::set_attribute_single,
        );
        class
    }

    pub fn class_code(&self) -> u16 {
        self.class_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> u16 {
        self.revision
    }

    pub fn class_attribute_mask(&self) -> u32 {
        self.class_attribute_mask
    }

    /// Install or replace an instance-level service
    pub fn insert_service(&mut self, code: u8, name: &'static str, handler: ServiceFn<S>) {
        self.instance_services.insert(code, ServiceEntry { name, handler });
    }

    /// Install or replace a class-level service
    pub fn insert_class_service(&mut self, code: u8, name: &'static str, handler: ServiceFn<S>) {
        self.class_services.insert(code, ServiceEntry { name, handler });
    }

    /// Declare the GetAttributeAll layout: zero-filled width of every
    /// attribute id that instances do not implement
    pub fn set_get_all_layout(&mut self, placeholders: &[(u16, usize)]) -> EipResult<()> {
        let layout: BTreeMap<u16, usize> = placeholders.iter().copied().collect();
        for instance in &self.instances {
            Self::check_layout(&layout, instance)?;
        }
        self.get_all_layout = Some(layout);
        Ok(())
    }

    pub fn get_all_layout(&self) -> Option<&BTreeMap<u16, usize>> {
        self.get_all_layout.as_ref()
    }

    fn check_layout(layout: &BTreeMap<u16, usize>, instance: &CipInstance<S>) -> EipResult<()> {
        let highest = instance.highest_attribute_id().unwrap_or(0);
        for id in 1..=highest {
            if !instance.has_attribute(id) && !layout.contains_key(&id) {
                return Err(EipError::Config(format!(
                    "instance {} has no attribute or placeholder for id {}",
                    instance.id(),
                    id
                )));
            }
        }
        Ok(())
    }

    /// Append an instance; ids must be contiguous from 1
    pub fn insert_instance(&mut self, instance: CipInstance<S>) -> EipResult<()> {
        let expected = self.instances.len() as u32 + 1;
        if instance.id() != expected {
            return Err(EipError::Config(format!(
                "class 0x{:02X} expects instance {}, got {}",
                self.class_code,
                expected,
                instance.id()
            )));
        }
        if let Some(layout) = &self.get_all_layout {
            Self::check_layout(layout, &instance)?;
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Add an attribute to a registered instance
    ///
    /// The attribute is rolled back when it leaves a gap the GetAttributeAll
    /// layout does not cover.
    pub fn insert_attribute(&mut self, instance_id: u32, attribute: CipAttribute<S>) -> EipResult<()> {
        let class_code = self.class_code;
        let id = attribute.id();
        let instance = self.instance_mut(instance_id).ok_or_else(|| {
            EipError::Config(format!("class 0x{:02X} has no instance {}", class_code, instance_id))
        })?;
        instance.insert_attribute(attribute)?;

        let Some(layout) = &self.get_all_layout else {
            return Ok(());
        };
        let index = instance_id as usize - 1;
        if let Err(e) = Self::check_layout(layout, &self.instances[index]) {
            self.instances[index].remove_attribute(id);
            return Err(e);
        }
        Ok(())
    }

    pub fn instance(&self, id: u32) -> Option<&CipInstance<S>> {
        let index = (id as usize).checked_sub(1)?;
        self.instances.get(index)
    }

    /// Mutable access to an instance
    ///
    /// Attributes added to a registered instance go through
    /// [`CipClass::insert_attribute`] so the GetAttributeAll layout stays
    /// complete.
    pub fn instance_mut(&mut self, id: u32) -> Option<&mut CipInstance<S>> {
        let index = (id as usize).checked_sub(1)?;
        self.instances.get_mut(index)
    }

    pub fn instances(&self) -> impl Iterator<Item = &CipInstance<S>> {
        self.instances.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Name of the service that would handle `code` for `instance_id`
    pub fn service_name(&self, instance_id: u32, code: u8) -> Option<&'static str> {
        self.lookup(instance_id, code).map(|entry| entry.name)
    }

    fn lookup(&self, instance_id: u32, code: u8) -> Option<&ServiceEntry<S>> {
        if instance_id == 0 {
            self.class_services.get(&code)
        } else {
            self.instance_services
                .get(&code)
                .or_else(|| self.class_services.get(&code))
        }
    }

    /// Dispatch a request to its service handler
    pub fn invoke(
        &mut self,
        instance_id: u32,
        request: &MessageRouterRequest<'_>,
        response: &mut MessageRouterResponse,
    ) -> GeneralStatus {
        if instance_id != 0 && self.instance(instance_id).is_none() {
            response.general_status = GeneralStatus::PathDestinationUnknown;
            return GeneralStatus::PathDestinationUnknown;
        }

        let Some(entry) = self.lookup(instance_id, request.service) else {
            log::debug!(
                "Class 0x{:02X} has no service 0x{:02X} for instance {}",
                self.class_code,
                request.service,
                instance_id
            );
            response.general_status = GeneralStatus::ServiceNotSupported;
            return GeneralStatus::ServiceNotSupported;
        };

        let handler = entry.handler;
        log::trace!(
            "Class 0x{:02X} instance {}: {}",
            self.class_code,
            instance_id,
            entry.name
        );
        let status = handler(self, instance_id, request, response);
        response.general_status = status;
        status
    }

    /// Get an attribute of instance `instance_id`, or a class attribute
    /// when `instance_id` is 0
    pub fn get_attribute(&self, instance_id: u32, attribute_id: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        if instance_id == 0 {
            return self.get_class_attribute(attribute_id, out);
        }
        self.instance(instance_id)
            .ok_or(GeneralStatus::PathDestinationUnknown)?
            .get(attribute_id, out)
    }

    pub fn set_attribute(&mut self, instance_id: u32, attribute_id: u16, data: &[u8]) -> Result<(), GeneralStatus> {
        if instance_id == 0 {
            return if self.implements_class_attribute(attribute_id) {
                Err(GeneralStatus::AttributeNotSettable)
            } else {
                Err(GeneralStatus::AttributeNotSupported)
            };
        }
        self.instance_mut(instance_id)
            .ok_or(GeneralStatus::PathDestinationUnknown)?
            .set(attribute_id, data)
    }

    pub fn implements_class_attribute(&self, attribute_id: u16) -> bool {
        attribute_id < 32 && self.class_attribute_mask & (1 << attribute_id) != 0
    }

    /// Implemented class attribute ids in ascending order
    pub fn class_attribute_ids(&self) -> impl Iterator<Item = u16> + '_ {
        (1..32u16).filter(|id| self.implements_class_attribute(*id))
    }

    pub fn get_class_attribute(&self, attribute_id: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        if !self.implements_class_attribute(attribute_id) {
            return Err(GeneralStatus::AttributeNotSupported);
        }
        let count = self.instances.len() as u16;
        match attribute_id {
            CLASS_ATTR_REVISION => out.encode_u16(self.revision),
            CLASS_ATTR_MAX_INSTANCE | CLASS_ATTR_INSTANCE_COUNT => out.encode_u16(count),
            CLASS_ATTR_OPTIONAL_ATTRIBUTES | CLASS_ATTR_OPTIONAL_SERVICES => out.encode_u16(0),
            CLASS_ATTR_MAX_CLASS_ATTRIBUTE => {
                out.encode_u16(self.class_attribute_ids().last().unwrap_or(0))
            }
            CLASS_ATTR_MAX_INSTANCE_ATTRIBUTE => out.encode_u16(
                self.instances
                    .iter()
                    .filter_map(|inst| inst.highest_attribute_id())
                    .max()
                    .unwrap_or(0),
            ),
            _ => return Err(GeneralStatus::AttributeNotSupported),
        };
        Ok(())
    }
}

impl<S> std::fmt::Debug for CipClass<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipClass")
            .field("class_code", &self.class_code)
            .field("name", &self.name)
            .field("revision", &self.revision)
            .field("instances", &self.instances.len())
            .field("instance_services", &self.instance_services.keys().collect::<Vec<_>>())
            .field("class_services", &self.class_services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::CipAttribute;
    use enip_core::{CipDataType, CipValue, LogicalPath};

    const RESET: u8 = 0x05;

    fn reset(class: &mut CipClass<u32>, instance_id: u32, _: &MessageRouterRequest<'_>, _: &mut MessageRouterResponse) -> GeneralStatus {
        match class.instance_mut(instance_id) {
            Some(inst) => {
                *inst.state_mut() += 1;
                GeneralStatus::Success
            }
            None => GeneralStatus::ObjectStateConflict,
        }
    }

    fn sample() -> CipClass<u32> {
        let mut class = CipClass::new(0x64, "Sample", 2, attribute_mask(&[1, 2, 3, 6, 7]));
        for id in 1..=2 {
            let mut inst = CipInstance::new(id, 0u32);
            inst.insert_attribute(CipAttribute::new(1, CipDataType::Uint, CipValue::U16(id as u16)))
                .unwrap();
            inst.insert_attribute(CipAttribute::new(3, CipDataType::Usint, CipValue::U8(0)).settable())
                .unwrap();
            class.insert_instance(inst).unwrap();
        }
        class.insert_service(RESET, "Reset", reset);
        class
    }

    fn call(class: &mut CipClass<u32>, service: u8, instance_id: u32, attribute: Option<u16>, data: &[u8]) -> MessageRouterResponse {
        let mut path = LogicalPath::new(0x64, instance_id);
        path.attribute_id = attribute;
        let request = MessageRouterRequest::new(service, path, data);
        let mut response = MessageRouterResponse::for_service(service);
        class.invoke(instance_id, &request, &mut response);
        response
    }

    #[test]
    fn test_attribute_mask() {
        assert_eq!(attribute_mask(&[1, 2, 3, 6, 7]), 0b1100_1110);
        assert_eq!(attribute_mask(&[]), 0);
    }

    #[test]
    fn test_instances_must_be_contiguous() {
        let mut class = CipClass::<()>::new(0x64, "Sample", 1, 0);
        assert!(matches!(class.insert_instance(CipInstance::new(2, ())), Err(EipError::Config(_))));
        class.insert_instance(CipInstance::new(1, ())).unwrap();
        assert!(class.insert_instance(CipInstance::new(1, ())).is_err());
        class.insert_instance(CipInstance::new(2, ())).unwrap();
        assert_eq!(class.instance_count(), 2);
        assert!(class.instance(0).is_none());
        assert!(class.instance(3).is_none());
    }

    #[test]
    fn test_class_attributes_follow_mask() {
        let class = sample();
        let mut out = CipEncoder::new();
        class.get_class_attribute(CLASS_ATTR_REVISION, &mut out).unwrap();
        class.get_class_attribute(CLASS_ATTR_INSTANCE_COUNT, &mut out).unwrap();
        class.get_class_attribute(CLASS_ATTR_MAX_CLASS_ATTRIBUTE, &mut out).unwrap();
        class.get_class_attribute(CLASS_ATTR_MAX_INSTANCE_ATTRIBUTE, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[2, 0, 2, 0, 7, 0, 3, 0]);

        assert_eq!(
            class.get_class_attribute(CLASS_ATTR_OPTIONAL_ATTRIBUTES, &mut out),
            Err(GeneralStatus::AttributeNotSupported)
        );
    }

    #[test]
    fn test_unknown_instance() {
        let mut class = sample();
        let response = call(&mut class, services::GET_ATTRIBUTE_SINGLE, 9, Some(1), &[]);
        assert_eq!(response.general_status, GeneralStatus::PathDestinationUnknown);
    }

    #[test]
    fn test_unknown_service() {
        let mut class = sample();
        let response = call(&mut class, 0x4B, 1, None, &[]);
        assert_eq!(response.general_status, GeneralStatus::ServiceNotSupported);
        // Reset is registered for instances only
        let response = call(&mut class, RESET, 0, None, &[]);
        assert_eq!(response.general_status, GeneralStatus::ServiceNotSupported);
    }

    #[test]
    fn test_custom_service_dispatch() {
        let mut class = sample();
        let response = call(&mut class, RESET, 2, None, &[]);
        assert_eq!(response.general_status, GeneralStatus::Success);
        assert_eq!(*class.instance(2).unwrap().state(), 1);
        assert_eq!(*class.instance(1).unwrap().state(), 0);
        assert_eq!(class.service_name(2, RESET), Some("Reset"));
    }

    #[test]
    fn test_instance_falls_back_to_class_services() {
        let mut class = sample();
        class.insert_class_service(0x4C, "Probe", |_, _, _, response| {
            response.data.encode_u8(0xAA);
            GeneralStatus::Success
        });
        let response = call(&mut class, 0x4C, 1, None, &[]);
        assert_eq!(response.general_status, GeneralStatus::Success);
        assert_eq!(response.data.as_slice(), &[0xAA]);
    }

    #[test]
    fn test_class_attributes_not_settable() {
        let mut class = sample();
        assert_eq!(class.set_attribute(0, 1, &[0, 0]), Err(GeneralStatus::AttributeNotSettable));
        assert_eq!(class.set_attribute(0, 4, &[0, 0]), Err(GeneralStatus::AttributeNotSupported));
        class.set_attribute(1, 3, &[9]).unwrap();
        let mut out = CipEncoder::new();
        class.get_attribute(1, 3, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[9]);
    }

    #[test]
    fn test_layout_must_cover_gaps() {
        let mut class = sample();
        assert!(class.set_get_all_layout(&[]).is_err());
        class.set_get_all_layout(&[(2, 4)]).unwrap();

        let mut inst = CipInstance::new(3, 0u32);
        inst.insert_attribute(CipAttribute::new(5, CipDataType::Usint, CipValue::U8(0)))
            .unwrap();
        assert!(class.insert_instance(inst).is_err());
        assert_eq!(class.instance_count(), 2);
    }

    #[test]
    fn test_late_attribute_checked_against_layout() {
        let mut class = sample();
        class.set_get_all_layout(&[(2, 4)]).unwrap();

        let late = CipAttribute::new(6, CipDataType::Usint, CipValue::U8(6));
        assert!(matches!(class.insert_attribute(1, late), Err(EipError::Config(_))));
        assert!(!class.instance(1).unwrap().has_attribute(6));

        class.insert_attribute(1, CipAttribute::new(4, CipDataType::Usint, CipValue::U8(4))).unwrap();
        assert!(class.instance(1).unwrap().has_attribute(4));
        assert!(class.insert_attribute(9, CipAttribute::new(4, CipDataType::Usint, CipValue::U8(4))).is_err());
    }
}
