//! Class registry and message router entry point

use crate::class::CipClass;
use crate::router::{MessageRouterRequest, MessageRouterResponse};
use enip_core::{CipEncoder, EipResult, GeneralStatus};
use std::any::Any;
use std::collections::BTreeMap;

/// Type-erased view of a class, as stored in the registry
pub trait CipObject: Any + Send {
    fn class_code(&self) -> u16;

    fn name(&self) -> &str;

    fn instance_count(&self) -> usize;

    fn has_instance(&self, instance_id: u32) -> bool;

    fn invoke(
        &mut self,
        instance_id: u32,
        request: &MessageRouterRequest<'_>,
        response: &mut MessageRouterResponse,
    ) -> GeneralStatus;

    fn get_attribute(&self, instance_id: u32, attribute_id: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus>;

    fn set_attribute(&mut self, instance_id: u32, attribute_id: u16, data: &[u8]) -> Result<(), GeneralStatus>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Send + 'static> CipObject for CipClass<S> {
    fn class_code(&self) -> u16 {
        CipClass::class_code(self)
    }

    fn name(&self) -> &str {
        CipClass::name(self)
    }

    fn instance_count(&self) -> usize {
        CipClass::instance_count(self)
    }

    fn has_instance(&self, instance_id: u32) -> bool {
        self.instance(instance_id).is_some()
    }

    fn invoke(
        &mut self,
        instance_id: u32,
        request: &MessageRouterRequest<'_>,
        response: &mut MessageRouterResponse,
    ) -> GeneralStatus {
        CipClass::invoke(self, instance_id, request, response)
    }

    fn get_attribute(&self, instance_id: u32, attribute_id: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        CipClass::get_attribute(self, instance_id, attribute_id, out)
    }

    fn set_attribute(&mut self, instance_id: u32, attribute_id: u16, data: &[u8]) -> Result<(), GeneralStatus> {
        CipClass::set_attribute(self, instance_id, attribute_id, data)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All classes of the device, one per class code
#[derive(Default)]
pub struct ClassRegistry {
    classes: BTreeMap<u16, Box<dyn CipObject>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class
    ///
    /// Returns `false` and keeps the existing class when the code is
    /// already registered.
    pub fn register<C: CipObject>(&mut self, class: C) -> bool {
        let code = class.class_code();
        if self.classes.contains_key(&code) {
            log::debug!("Class 0x{:02X} already registered", code);
            return false;
        }
        log::info!("Registered class 0x{:02X} ({})", code, class.name());
        self.classes.insert(code, Box::new(class));
        true
    }

    /// Register the class built by `build` unless `code` is already present
    ///
    /// `build` only runs for a new class, so repeated initialization is a
    /// no-op.
    pub fn register_with<C, F>(&mut self, code: u16, build: F) -> EipResult<bool>
    where
        C: CipObject,
        F: FnOnce() -> EipResult<C>,
    {
        if self.classes.contains_key(&code) {
            return Ok(false);
        }
        Ok(self.register(build()?))
    }

    pub fn contains(&self, code: u16) -> bool {
        self.classes.contains_key(&code)
    }

    pub fn class_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.classes.keys().copied()
    }

    pub fn object(&self, code: u16) -> Option<&dyn CipObject> {
        self.classes.get(&code).map(|class| class.as_ref())
    }

    /// Typed access to a registered class
    pub fn class<S: Send + 'static>(&self, code: u16) -> Option<&CipClass<S>> {
        self.classes.get(&code)?.as_any().downcast_ref()
    }

    pub fn class_mut<S: Send + 'static>(&mut self, code: u16) -> Option<&mut CipClass<S>> {
        self.classes.get_mut(&code)?.as_any_mut().downcast_mut()
    }

    /// Dispatch a service to (class, instance)
    pub fn invoke_service(
        &mut self,
        class_code: u16,
        instance_id: u32,
        request: &MessageRouterRequest<'_>,
        response: &mut MessageRouterResponse,
    ) -> GeneralStatus {
        match self.classes.get_mut(&class_code) {
            Some(class) => class.invoke(instance_id, request, response),
            None => {
                log::debug!("No class 0x{:02X}", class_code);
                response.general_status = GeneralStatus::PathDestinationUnknown;
                GeneralStatus::PathDestinationUnknown
            }
        }
    }

    pub fn get_attribute(
        &self,
        class_code: u16,
        instance_id: u32,
        attribute_id: u16,
        out: &mut CipEncoder,
    ) -> Result<(), GeneralStatus> {
        self.classes
            .get(&class_code)
            .ok_or(GeneralStatus::PathDestinationUnknown)?
            .get_attribute(instance_id, attribute_id, out)
    }

    pub fn set_attribute(
        &mut self,
        class_code: u16,
        instance_id: u32,
        attribute_id: u16,
        data: &[u8],
    ) -> Result<(), GeneralStatus> {
        self.classes
            .get_mut(&class_code)
            .ok_or(GeneralStatus::PathDestinationUnknown)?
            .set_attribute(instance_id, attribute_id, data)
    }

    /// Route an encoded message router request and return the response
    pub fn handle_request(&mut self, bytes: &[u8]) -> MessageRouterResponse {
        let service = bytes.first().copied().unwrap_or(0) & !crate::router::REPLY_FLAG;
        let request = match MessageRouterRequest::decode(bytes) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Malformed message router request: {}", e);
                let status = if bytes.len() < 2 {
                    GeneralStatus::NotEnoughData
                } else {
                    GeneralStatus::PathSegmentError
                };
                return MessageRouterResponse::error(service, status);
            }
        };

        let mut response = MessageRouterResponse::for_service(request.service);
        self.invoke_service(
            request.path.class_id,
            request.path.instance_id,
            &request,
            &mut response,
        );
        response
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.classes.iter().map(|(code, class)| (code, class.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::CipAttribute;
    use crate::class::attribute_mask;
    use crate::instance::CipInstance;
    use crate::services;
    use enip_core::{CipDataType, CipValue, EipError};

    fn identity_like() -> EipResult<CipClass<()>> {
        let mut class = CipClass::new(0x01, "Identity", 1, attribute_mask(&[1, 2, 3]));
        let mut inst = CipInstance::new(1, ());
        inst.insert_attribute(CipAttribute::new(1, CipDataType::Uint, CipValue::U16(0x1234)))?;
        inst.insert_attribute(CipAttribute::new(7, CipDataType::ShortString, CipValue::Text("dev".into())).settable())?;
        class.insert_instance(inst)?;
        Ok(class)
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ClassRegistry::new();
        assert!(registry.register(identity_like().unwrap()));

        let mut other = CipClass::<()>::new(0x01, "Other", 9, 0);
        other.insert_instance(CipInstance::new(1, ())).unwrap();
        assert!(!registry.register(other));
        assert_eq!(registry.object(0x01).unwrap().name(), "Identity");

        assert!(!registry.register_with(0x01, identity_like).unwrap());
        assert_eq!(registry.class_codes().collect::<Vec<_>>(), vec![0x01]);
    }

    #[test]
    fn test_register_with_propagates_build_errors() {
        let mut registry = ClassRegistry::new();
        let result = registry.register_with(0x02, || -> EipResult<CipClass<()>> {
            let mut class = CipClass::new(0x02, "Broken", 1, 0);
            class.insert_instance(CipInstance::new(3, ()))?;
            Ok(class)
        });
        assert!(matches!(result, Err(EipError::Config(_))));
        assert!(!registry.contains(0x02));
    }

    #[test]
    fn test_typed_access() {
        let mut registry = ClassRegistry::new();
        registry.register(identity_like().unwrap());
        assert!(registry.class::<()>(0x01).is_some());
        assert!(registry.class::<u32>(0x01).is_none());
        assert!(registry.class_mut::<()>(0x01).is_some());
        assert!(registry.class::<()>(0x02).is_none());
    }

    #[test]
    fn test_get_set_by_address() {
        let mut registry = ClassRegistry::new();
        registry.register(identity_like().unwrap());

        registry.set_attribute(0x01, 1, 7, &[2, b'o', b'k']).unwrap();
        let mut out = CipEncoder::new();
        registry.get_attribute(0x01, 1, 7, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[2, b'o', b'k']);

        assert_eq!(
            registry.get_attribute(0x99, 1, 1, &mut out),
            Err(GeneralStatus::PathDestinationUnknown)
        );
        assert_eq!(
            registry.set_attribute(0x01, 2, 7, &[0]),
            Err(GeneralStatus::PathDestinationUnknown)
        );
    }

    #[test]
    fn test_handle_request_routes() {
        let mut registry = ClassRegistry::new();
        registry.register(identity_like().unwrap());

        let response = registry.handle_request(&[services::GET_ATTRIBUTE_SINGLE, 0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x01]);
        assert_eq!(response.to_bytes(), vec![0x8E, 0, 0, 0, 0x34, 0x12]);

        let response = registry.handle_request(&[services::GET_ATTRIBUTE_SINGLE, 0x03, 0x20, 0x02, 0x24, 0x01, 0x30, 0x01]);
        assert_eq!(response.general_status, GeneralStatus::PathDestinationUnknown);

        let response = registry.handle_request(&[services::GET_ATTRIBUTE_SINGLE, 0x02, 0x20]);
        assert_eq!(response.general_status, GeneralStatus::PathSegmentError);
        assert_eq!(response.reply_service, 0x8E);

        let response = registry.handle_request(&[]);
        assert_eq!(response.general_status, GeneralStatus::NotEnoughData);
    }
}
