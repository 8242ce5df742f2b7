//! Standard attribute services

use crate::attribute::decode_status;
use crate::class::CipClass;
use crate::router::{MessageRouterRequest, MessageRouterResponse};
use enip_core::{CipDecoder, GeneralStatus};

pub const GET_ATTRIBUTE_ALL: u8 = 0x01;
pub const GET_ATTRIBUTE_LIST: u8 = 0x03;
pub const GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
pub const SET_ATTRIBUTE_SINGLE: u8 = 0x10;

fn finish(response: &mut MessageRouterResponse, start: usize, result: Result<(), GeneralStatus>) -> GeneralStatus {
    match result {
        Ok(()) => GeneralStatus::Success,
        Err(status) => {
            response.data.truncate(start);
            status
        }
    }
}

pub fn get_attribute_single<S>(
    class: &mut CipClass<S>,
    instance_id: u32,
    request: &MessageRouterRequest<'_>,
    response: &mut MessageRouterResponse,
) -> GeneralStatus {
    let Some(attribute_id) = request.path.attribute_id else {
        return GeneralStatus::PathSegmentError;
    };
    let start = response.data.len();
    let result = class.get_attribute(instance_id, attribute_id, &mut response.data);
    finish(response, start, result)
}

pub fn set_attribute_single<S>(
    class: &mut CipClass<S>,
    instance_id: u32,
    request: &MessageRouterRequest<'_>,
    _response: &mut MessageRouterResponse,
) -> GeneralStatus {
    let Some(attribute_id) = request.path.attribute_id else {
        return GeneralStatus::PathSegmentError;
    };
    match class.set_attribute(instance_id, attribute_id, request.data) {
        Ok(()) => GeneralStatus::Success,
        Err(status) => {
            log::debug!(
                "Set of 0x{:02X}/{}/{} rejected: {}",
                class.class_code(),
                instance_id,
                attribute_id,
                status
            );
            status
        }
    }
}

/// Composite of all attributes
///
/// With a class layout, ids run from 1 to the highest implemented id and
/// unimplemented ids are zero filled at their declared width. Without one,
/// implemented attributes are concatenated in ascending order.
pub fn get_attribute_all<S>(
    class: &mut CipClass<S>,
    instance_id: u32,
    _request: &MessageRouterRequest<'_>,
    response: &mut MessageRouterResponse,
) -> GeneralStatus {
    let start = response.data.len();
    let out = &mut response.data;

    let result = if instance_id == 0 {
        class
            .class_attribute_ids()
            .try_for_each(|id| class.get_class_attribute(id, out))
    } else {
        match class.instance(instance_id) {
            None => Err(GeneralStatus::PathDestinationUnknown),
            Some(instance) => match class.get_all_layout() {
                Some(layout) => {
                    let highest = instance.highest_attribute_id().unwrap_or(0);
                    (1..=highest).try_for_each(|id| {
                        if instance.has_attribute(id) {
                            return instance.get(id, out);
                        }
                        match layout.get(&id) {
                            Some(width) => {
                                out.encode_zeros(*width);
                                Ok(())
                            }
                            None => {
                                log::error!(
                                    "Class 0x{:02X} instance {}: no placeholder for attribute {}",
                                    class.class_code(),
                                    instance_id,
                                    id
                                );
                                Err(GeneralStatus::ObjectStateConflict)
                            }
                        }
                    })
                }
                None => instance.attribute_ids().try_for_each(|id| instance.get(id, out)),
            },
        }
    };
    finish(response, start, result)
}

/// Get_Attribute_List: count, then attribute ids; each reply entry carries
/// id, status and data when the status is success
pub fn get_attribute_list<S>(
    class: &mut CipClass<S>,
    instance_id: u32,
    request: &MessageRouterRequest<'_>,
    response: &mut MessageRouterResponse,
) -> GeneralStatus {
    let mut dec = CipDecoder::new(request.data);
    let count = match dec.decode_u16() {
        Ok(count) => count,
        Err(e) => return decode_status(e),
    };
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match dec.decode_u16() {
            Ok(id) => ids.push(id),
            Err(e) => return decode_status(e),
        }
    }
    if !dec.is_empty() {
        return GeneralStatus::TooMuchData;
    }

    let mut all_ok = true;
    response.data.encode_u16(count);
    for id in ids {
        response.data.encode_u16(id);
        let status_at = response.data.len();
        response.data.encode_u16(0);
        let data_at = response.data.len();
        if let Err(status) = class.get_attribute(instance_id, id, &mut response.data) {
            all_ok = false;
            response.data.truncate(data_at);
            if response.data.patch_u16(status_at, status.to_u8() as u16).is_err() {
                return GeneralStatus::DeviceStateConflict;
            }
        }
    }

    if all_ok {
        GeneralStatus::Success
    } else {
        GeneralStatus::AttributeListError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::CipAttribute;
    use crate::class::attribute_mask;
    use crate::instance::CipInstance;
    use enip_core::{CipDataType, CipEncoder, CipValue, GeneralStatus, LogicalPath};

    fn failing(_: &CipInstance<()>, _: u16, out: &mut CipEncoder) -> Result<(), GeneralStatus> {
        out.encode_u8(0xFF);
        Err(GeneralStatus::DeviceStateConflict)
    }

    fn sparse_class() -> CipClass<()> {
        // Attributes {1, 2, 3, 6, 8}, gaps {4, 5, 7}
        let mut class = CipClass::new(0x70, "Sparse", 1, attribute_mask(&[1, 2, 3]));
        let mut inst = CipInstance::new(1, ());
        inst.insert_attribute(CipAttribute::new(1, CipDataType::Dword, CipValue::U32(1))).unwrap();
        inst.insert_attribute(CipAttribute::new(2, CipDataType::Uint, CipValue::U16(2))).unwrap();
        inst.insert_attribute(CipAttribute::new(3, CipDataType::Usint, CipValue::U8(3))).unwrap();
        inst.insert_attribute(CipAttribute::new(6, CipDataType::ShortString, CipValue::Text("ab".into())))
            .unwrap();
        inst.insert_attribute(CipAttribute::new(8, CipDataType::Usint, CipValue::U8(8)).settable())
            .unwrap();
        class.insert_instance(inst).unwrap();
        class
    }

    fn call(class: &mut CipClass<()>, service: u8, path: LogicalPath, data: &[u8]) -> MessageRouterResponse {
        let request = MessageRouterRequest::new(service, path, data);
        let mut response = MessageRouterResponse::for_service(service);
        class.invoke(path.instance_id, &request, &mut response);
        response
    }

    #[test]
    fn test_get_all_with_layout_fills_gaps() {
        let mut class = sparse_class();
        class.set_get_all_layout(&[(4, 2), (5, 20), (7, 6)]).unwrap();
        let response = call(&mut class, GET_ATTRIBUTE_ALL, LogicalPath::new(0x70, 1), &[]);
        assert_eq!(response.general_status, GeneralStatus::Success);

        let data = response.data.as_slice();
        // 4 + 2 + 1 + 2 + 20 + 3 + 6 + 1
        assert_eq!(data.len(), 39);
        assert_eq!(&data[0..7], &[1, 0, 0, 0, 2, 0, 3]);
        assert!(data[7..29].iter().all(|b| *b == 0));
        assert_eq!(&data[29..32], &[2, b'a', b'b']);
        assert!(data[32..38].iter().all(|b| *b == 0));
        assert_eq!(data[38], 8);
    }

    #[test]
    fn test_get_all_without_layout_concatenates() {
        let mut class = sparse_class();
        let response = call(&mut class, GET_ATTRIBUTE_ALL, LogicalPath::new(0x70, 1), &[]);
        assert_eq!(response.data.as_slice(), &[1, 0, 0, 0, 2, 0, 3, 2, b'a', b'b', 8]);
    }

    #[test]
    fn test_get_all_uncovered_gap_is_an_error() {
        let mut class = sparse_class();
        class.set_get_all_layout(&[(4, 2), (5, 20), (7, 6)]).unwrap();
        // Bypasses CipClass::insert_attribute and opens gap 9
        class
            .instance_mut(1)
            .unwrap()
            .insert_attribute(CipAttribute::new(10, CipDataType::Usint, CipValue::U8(10)))
            .unwrap();

        let response = call(&mut class, GET_ATTRIBUTE_ALL, LogicalPath::new(0x70, 1), &[]);
        assert_eq!(response.general_status, GeneralStatus::ObjectStateConflict);
        assert!(response.data.is_empty());
    }

    #[test]
    fn test_get_all_class_level() {
        let mut class = sparse_class();
        let response = call(&mut class, GET_ATTRIBUTE_ALL, LogicalPath::new(0x70, 0), &[]);
        assert_eq!(response.general_status, GeneralStatus::Success);
        // revision, max instance, instance count
        assert_eq!(response.data.as_slice(), &[1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_get_all_failure_discards_partial_data() {
        let mut class = CipClass::new(0x71, "Broken", 1, 0);
        let mut inst = CipInstance::new(1, ());
        inst.insert_attribute(CipAttribute::new(1, CipDataType::Usint, CipValue::U8(1))).unwrap();
        inst.insert_attribute(CipAttribute::computed(2, failing)).unwrap();
        class.insert_instance(inst).unwrap();

        let response = call(&mut class, GET_ATTRIBUTE_ALL, LogicalPath::new(0x71, 1), &[]);
        assert_eq!(response.general_status, GeneralStatus::DeviceStateConflict);
        assert!(response.data.is_empty());
    }

    #[test]
    fn test_single_get_and_set() {
        let mut class = sparse_class();
        let path = LogicalPath::new(0x70, 1).with_attribute(8);

        let response = call(&mut class, SET_ATTRIBUTE_SINGLE, path, &[42]);
        assert_eq!(response.general_status, GeneralStatus::Success);
        assert!(response.data.is_empty());

        let response = call(&mut class, GET_ATTRIBUTE_SINGLE, path, &[]);
        assert_eq!(response.data.as_slice(), &[42]);

        let response = call(&mut class, SET_ATTRIBUTE_SINGLE, LogicalPath::new(0x70, 1).with_attribute(1), &[0; 4]);
        assert_eq!(response.general_status, GeneralStatus::AttributeNotSettable);
    }

    #[test]
    fn test_single_without_attribute_segment() {
        let mut class = sparse_class();
        let response = call(&mut class, GET_ATTRIBUTE_SINGLE, LogicalPath::new(0x70, 1), &[]);
        assert_eq!(response.general_status, GeneralStatus::PathSegmentError);
    }

    #[test]
    fn test_get_attribute_list() {
        let mut class = sparse_class();
        let response = call(
            &mut class,
            GET_ATTRIBUTE_LIST,
            LogicalPath::new(0x70, 1),
            &[2, 0, 3, 0, 4, 0],
        );
        assert_eq!(response.general_status, GeneralStatus::AttributeListError);
        assert_eq!(
            response.data.as_slice(),
            &[2, 0, 3, 0, 0, 0, 3, 4, 0, 0x14, 0]
        );

        let response = call(&mut class, GET_ATTRIBUTE_LIST, LogicalPath::new(0x70, 1), &[1, 0, 8, 0]);
        assert_eq!(response.general_status, GeneralStatus::Success);
        assert_eq!(response.data.as_slice(), &[1, 0, 8, 0, 0, 0, 8]);
    }

    #[test]
    fn test_get_attribute_list_short_request() {
        let mut class = sparse_class();
        let response = call(&mut class, GET_ATTRIBUTE_LIST, LogicalPath::new(0x70, 1), &[2, 0, 3]);
        assert_eq!(response.general_status, GeneralStatus::NotEnoughData);
        assert!(response.data.is_empty());
    }
}
