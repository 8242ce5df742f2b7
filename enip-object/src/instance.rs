//! CIP instance: an attribute table plus instance-scoped state

use crate::attribute::{CipAttribute, Handler, decode_status, expect_end};
use enip_core::{CipDecoder, CipEncoder, CipValue, EipError, EipResult, GeneralStatus};
use std::collections::BTreeMap;

/// One instance of a class
///
/// The instance owns its attributes and their storage. `S` carries
/// whatever state custom getters and setters need beyond plain attribute
/// values.
#[derive(Debug)]
pub struct CipInstance<S> {
    id: u32,
    attributes: BTreeMap<u16, CipAttribute<S>>,
    state: S,
}

impl<S> CipInstance<S> {
    pub fn new(id: u32, state: S) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
            state,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Add an attribute
    ///
    /// Fails with `EipError::Config` on a duplicate id or when the default
    /// codec would have nothing valid to work with.
    pub fn insert_attribute(&mut self, attribute: CipAttribute<S>) -> EipResult<()> {
        let id = attribute.id();
        if self.attributes.contains_key(&id) {
            return Err(EipError::Config(format!(
                "instance {} already has attribute {}",
                self.id, id
            )));
        }
        attribute.validate().map_err(EipError::Config)?;
        self.attributes.insert(id, attribute);
        Ok(())
    }

    pub(crate) fn remove_attribute(&mut self, id: u16) -> Option<CipAttribute<S>> {
        self.attributes.remove(&id)
    }

    pub fn attribute(&self, id: u16) -> Option<&CipAttribute<S>> {
        self.attributes.get(&id)
    }

    pub fn has_attribute(&self, id: u16) -> bool {
        self.attributes.contains_key(&id)
    }

    /// Implemented attribute ids in ascending order
    pub fn attribute_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.attributes.keys().copied()
    }

    pub fn highest_attribute_id(&self) -> Option<u16> {
        self.attributes.keys().next_back().copied()
    }

    /// Stored value of an attribute
    pub fn value(&self, id: u16) -> Option<&CipValue> {
        self.attributes.get(&id).and_then(|attr| attr.value())
    }

    /// Replace a stored value, bypassing the settable flag
    ///
    /// Used by device configuration and by custom setters after they have
    /// validated the request.
    pub fn set_value(&mut self, id: u16, value: CipValue) -> EipResult<()> {
        let attr = self
            .attributes
            .get_mut(&id)
            .ok_or_else(|| EipError::InvalidData(format!("no attribute {} on instance {}", id, self.id)))?;
        if !value.matches(attr.data_type()) {
            return Err(EipError::InvalidData(format!(
                "value {:?} does not fit attribute {} ({:?})",
                value,
                id,
                attr.data_type()
            )));
        }
        attr.store(value);
        Ok(())
    }

    /// Encode attribute `id` into `out`
    pub fn get(&self, id: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        let attr = self.attributes.get(&id).ok_or(GeneralStatus::AttributeNotSupported)?;
        match attr.getter() {
            Handler::Custom(getter) => getter(self, id, out),
            Handler::Default => {
                let value = attr.value().ok_or(GeneralStatus::AttributeNotSupported)?;
                value.encode(attr.data_type(), out).map_err(|e| {
                    log::error!("Attribute {} of instance {} failed to encode: {}", id, self.id, e);
                    GeneralStatus::DeviceStateConflict
                })
            }
        }
    }

    /// Apply request data to attribute `id`
    ///
    /// Nothing is changed unless the whole request is accepted.
    pub fn set(&mut self, id: u16, data: &[u8]) -> Result<(), GeneralStatus> {
        let attr = self.attributes.get(&id).ok_or(GeneralStatus::AttributeNotSupported)?;
        if !attr.is_settable() {
            return Err(GeneralStatus::AttributeNotSettable);
        }
        let mut dec = CipDecoder::new(data);
        match attr.setter() {
            Handler::Custom(setter) => setter(self, id, &mut dec),
            Handler::Default => {
                let value = CipValue::decode(attr.data_type(), &mut dec).map_err(decode_status)?;
                expect_end(&dec)?;
                if let Some(attr) = self.attributes.get_mut(&id) {
                    attr.store(value);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enip_core::CipDataType;

    #[derive(Debug, Default)]
    struct Counter {
        writes: u32,
    }

    fn get_writes(inst: &CipInstance<Counter>, _: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        out.encode_u32(inst.state().writes);
        Ok(())
    }

    fn set_even(inst: &mut CipInstance<Counter>, id: u16, dec: &mut CipDecoder<'_>) -> Result<(), GeneralStatus> {
        let value = dec.decode_u16().map_err(decode_status)?;
        expect_end(dec)?;
        if value % 2 != 0 {
            return Err(GeneralStatus::InvalidAttributeValue);
        }
        inst.set_value(id, CipValue::U16(value))
            .map_err(|_| GeneralStatus::InvalidAttributeValue)?;
        inst.state_mut().writes += 1;
        Ok(())
    }

    fn sample() -> CipInstance<Counter> {
        let mut inst = CipInstance::new(1, Counter::default());
        inst.insert_attribute(CipAttribute::new(1, CipDataType::Usint, CipValue::U8(7)))
            .unwrap();
        inst.insert_attribute(CipAttribute::new(2, CipDataType::Uint, CipValue::U16(0)).settable())
            .unwrap();
        inst.insert_attribute(CipAttribute::computed(3, get_writes)).unwrap();
        inst.insert_attribute(
            CipAttribute::new(4, CipDataType::Uint, CipValue::U16(2))
                .settable()
                .with_setter(set_even),
        )
        .unwrap();
        inst
    }

    fn encoded(inst: &CipInstance<Counter>, id: u16) -> Result<Vec<u8>, GeneralStatus> {
        let mut out = CipEncoder::new();
        inst.get(id, &mut out)?;
        Ok(out.into_bytes())
    }

    #[test]
    fn test_duplicate_attribute_is_config_error() {
        let mut inst = sample();
        let result = inst.insert_attribute(CipAttribute::new(1, CipDataType::Usint, CipValue::U8(0)));
        assert!(matches!(result, Err(EipError::Config(_))));
    }

    #[test]
    fn test_mismatched_storage_is_config_error() {
        let mut inst = CipInstance::new(1, ());
        let result = inst.insert_attribute(CipAttribute::new(9, CipDataType::Udint, CipValue::U8(0)));
        assert!(matches!(result, Err(EipError::Config(_))));
        assert!(!inst.has_attribute(9));
    }

    #[test]
    fn test_default_get() {
        let inst = sample();
        assert_eq!(encoded(&inst, 1).unwrap(), vec![7]);
        assert_eq!(encoded(&inst, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_unknown_attribute() {
        let mut inst = sample();
        assert_eq!(encoded(&inst, 99), Err(GeneralStatus::AttributeNotSupported));
        assert_eq!(inst.set(99, &[0]), Err(GeneralStatus::AttributeNotSupported));
    }

    #[test]
    fn test_set_not_settable() {
        let mut inst = sample();
        assert_eq!(inst.set(1, &[1]), Err(GeneralStatus::AttributeNotSettable));
        assert_eq!(inst.value(1), Some(&CipValue::U8(7)));
    }

    #[test]
    fn test_default_set_length_checks() {
        let mut inst = sample();
        assert_eq!(inst.set(2, &[0x34]), Err(GeneralStatus::NotEnoughData));
        assert_eq!(inst.set(2, &[0x34, 0x12, 0x00]), Err(GeneralStatus::TooMuchData));
        assert_eq!(inst.value(2), Some(&CipValue::U16(0)));

        inst.set(2, &[0x34, 0x12]).unwrap();
        assert_eq!(inst.value(2), Some(&CipValue::U16(0x1234)));
        assert_eq!(encoded(&inst, 2).unwrap(), vec![0x34, 0x12]);
    }

    #[test]
    fn test_default_codec_every_width() {
        let cases = [
            (CipDataType::Usint, CipValue::U8(0xAB)),
            (CipDataType::Int, CipValue::U16(0xBEEF)),
            (CipDataType::Dword, CipValue::U32(0xDEAD_BEEF)),
            (CipDataType::Lint, CipValue::U64(0x0102_0304_0506_0708)),
            (CipDataType::Bytes(3), CipValue::Bytes(vec![1, 2, 3])),
            (CipDataType::ShortString, CipValue::Text("abc".to_string())),
            (CipDataType::String, CipValue::Text("plc-01".to_string())),
        ];
        for (index, (data_type, value)) in cases.into_iter().enumerate() {
            let id = index as u16 + 1;
            let mut inst = CipInstance::new(1, ());
            inst.insert_attribute(CipAttribute::new(id, data_type, CipValue::zero(data_type)).settable())
                .unwrap();

            let mut wire = CipEncoder::new();
            value.encode(data_type, &mut wire).unwrap();
            inst.set(id, wire.as_slice()).unwrap();

            let mut out = CipEncoder::new();
            inst.get(id, &mut out).unwrap();
            assert_eq!(out.as_slice(), wire.as_slice(), "{:?}", data_type);
            assert_eq!(inst.value(id), Some(&value));
        }
    }

    #[test]
    fn test_custom_getter_reads_state() {
        let mut inst = sample();
        assert_eq!(encoded(&inst, 3).unwrap(), vec![0, 0, 0, 0]);
        inst.set(4, &[4, 0]).unwrap();
        assert_eq!(encoded(&inst, 3).unwrap(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_custom_setter_rejects_without_mutation() {
        let mut inst = sample();
        assert_eq!(inst.set(4, &[3, 0]), Err(GeneralStatus::InvalidAttributeValue));
        assert_eq!(inst.set(4, &[4, 0, 0]), Err(GeneralStatus::TooMuchData));
        assert_eq!(inst.value(4), Some(&CipValue::U16(2)));
        assert_eq!(inst.state().writes, 0);
    }

    #[test]
    fn test_attribute_ids_ascending() {
        let inst = sample();
        assert_eq!(inst.attribute_ids().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(inst.highest_attribute_id(), Some(4));
    }
}
