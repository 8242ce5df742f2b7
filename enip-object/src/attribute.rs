//! Attribute definition
//!
//! An attribute is either served by the default codec, which encodes the
//! stored `CipValue` according to the attribute's type tag, or by custom
//! functions. Get and set are chosen independently, so an attribute can use
//! the default getter with a validating custom setter.

use crate::instance::CipInstance;
use enip_core::{CipDataType, CipDecoder, CipEncoder, CipValue, EipError, GeneralStatus};

/// Custom getter: encode attribute `id` of the instance into the encoder
pub type AttrGetFn<S> = fn(&CipInstance<S>, u16, &mut CipEncoder) -> Result<(), GeneralStatus>;

/// Custom setter: decode the request data and apply it to the instance
///
/// The setter owns validation. It must decode everything, call
/// [`expect_end`] and only then mutate, so that a rejected request leaves
/// the instance unchanged.
pub type AttrSetFn<S> = fn(&mut CipInstance<S>, u16, &mut CipDecoder<'_>) -> Result<(), GeneralStatus>;

/// Codec selection for one direction
pub enum Handler<F> {
    Default,
    Custom(F),
}

impl<F: Copy> Clone for Handler<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Copy> Copy for Handler<F> {}

impl<F> std::fmt::Debug for Handler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Default => f.write_str("Default"),
            Handler::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// One addressable attribute of an instance
#[derive(Debug)]
pub struct CipAttribute<S> {
    id: u16,
    data_type: CipDataType,
    value: Option<CipValue>,
    settable: bool,
    getter: Handler<AttrGetFn<S>>,
    setter: Handler<AttrSetFn<S>>,
}

impl<S> CipAttribute<S> {
    /// Attribute stored in the instance and served by the default codec
    pub fn new(id: u16, data_type: CipDataType, value: CipValue) -> Self {
        Self {
            id,
            data_type,
            value: Some(value),
            settable: false,
            getter: Handler::Default,
            setter: Handler::Default,
        }
    }

    /// Attribute without storage, fully encoded by `getter`
    pub fn computed(id: u16, getter: AttrGetFn<S>) -> Self {
        Self {
            id,
            data_type: CipDataType::Bytes(0),
            value: None,
            settable: false,
            getter: Handler::Custom(getter),
            setter: Handler::Default,
        }
    }

    /// Allow Set services on this attribute
    pub fn settable(mut self) -> Self {
        self.settable = true;
        self
    }

    /// Replace the default getter
    pub fn with_getter(mut self, getter: AttrGetFn<S>) -> Self {
        self.getter = Handler::Custom(getter);
        self
    }

    /// Replace the default setter
    pub fn with_setter(mut self, setter: AttrSetFn<S>) -> Self {
        self.setter = Handler::Custom(setter);
        self
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn data_type(&self) -> CipDataType {
        self.data_type
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }

    /// Stored value, `None` for computed attributes
    pub fn value(&self) -> Option<&CipValue> {
        self.value.as_ref()
    }

    pub fn getter(&self) -> Handler<AttrGetFn<S>> {
        self.getter
    }

    pub fn setter(&self) -> Handler<AttrSetFn<S>> {
        self.setter
    }

    pub(crate) fn store(&mut self, value: CipValue) {
        self.value = Some(value);
    }

    /// Check that the default codec can serve whichever directions use it
    pub(crate) fn validate(&self) -> Result<(), String> {
        let needs_storage = matches!(self.getter, Handler::Default)
            || (self.settable && matches!(self.setter, Handler::Default));
        if !needs_storage {
            return Ok(());
        }
        match &self.value {
            Some(value) if value.matches(self.data_type) => Ok(()),
            Some(value) => Err(format!(
                "attribute {} stores {:?}, which does not fit {:?}",
                self.id, value, self.data_type
            )),
            None => Err(format!("attribute {} uses the default codec without storage", self.id)),
        }
    }
}

/// Fail with `TooMuchData` when the request carries bytes past the value
pub fn expect_end(dec: &CipDecoder<'_>) -> Result<(), GeneralStatus> {
    if dec.is_empty() {
        Ok(())
    } else {
        Err(GeneralStatus::TooMuchData)
    }
}

/// General status for a failed decode of request data
pub fn decode_status(error: EipError) -> GeneralStatus {
    match error {
        EipError::Truncated { .. } => GeneralStatus::NotEnoughData,
        _ => GeneralStatus::InvalidAttributeValue,
    }
}
