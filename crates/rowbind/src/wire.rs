// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire values and conversion capabilities.
//!
//! [`WireValue`] is the primitive value set exchanged with the relational
//! client. A field type takes part in database I/O through two optional
//! capabilities:
//!
//! - [`FromWire`]: decode a field from a primitive wire value
//! - [`ToWire`]: encode a field into a primitive wire value
//!
//! Natural types that cannot implement them directly (collections, foreign
//! types) can be paired with a [`WireType`] which supplies both on their
//! behalf. The registry stores the resolved behaviour as a [`WireCodec`].

use crate::error::WireError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::{type_name, Any, TypeId};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Primitive value produced or consumed by the relational client.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl WireValue {
    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for WireValue {
    fn default() -> Self {
        Self::Null
    }
}

macro_rules! impl_wire_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for WireValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_wire_from!(
    bool => Bool,
    i32 => Integer,
    i64 => Integer,
    f64 => Real,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    NaiveDateTime => Timestamp,
);

impl<T: Into<WireValue>> From<Option<T>> for WireValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Decodable-from-wire capability.
pub trait FromWire: Sized {
    fn from_wire(value: WireValue) -> Result<Self, WireError>;
}

/// Encodable-to-wire capability.
pub trait ToWire {
    fn to_wire(&self) -> WireValue;
}

/// Wire type standing in for a natural type during database I/O.
///
/// The implementing type supplies both capabilities for the natural type's
/// storage, so the record keeps its natural field type. Register it with
/// `Registry::substitute`.
///
/// ```ignore
/// struct CsvList;
///
/// impl WireType for CsvList {
///     type Natural = Vec<String>;
///
///     fn decode(value: WireValue) -> Result<Vec<String>, WireError> { ... }
///     fn encode(natural: &Vec<String>) -> WireValue { ... }
/// }
/// ```
pub trait WireType: 'static {
    type Natural: Any;

    fn decode(value: WireValue) -> Result<Self::Natural, WireError>;

    fn encode(natural: &Self::Natural) -> WireValue;
}

/// Scalar view of a value, used when no encoder exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Text(&'a str),
}

/// Types with a scalar kind the builder renders directly.
pub trait ScalarKind {
    fn scalar(&self) -> Scalar<'_>;
}

pub type DecodeFn = fn(&mut dyn Any, WireValue) -> Result<(), WireError>;
pub type EncodeFn = fn(&dyn Any) -> Result<WireValue, WireError>;
pub type ScalarFn = fn(&dyn Any) -> Result<Scalar<'_>, WireError>;

/// Type-erased I/O behaviour for one field type.
///
/// `type_id` identifies the wire type: the field's natural type, or the
/// substituted [`WireType`]. Every function receives the field's storage
/// slot, which always holds the natural type.
#[derive(Clone, Copy)]
pub struct WireCodec {
    type_name: &'static str,
    type_id: TypeId,
    decode: Option<DecodeFn>,
    encode: Option<EncodeFn>,
    scalar: Option<ScalarFn>,
}

impl WireCodec {
    /// Natural scalar: decodes through `FromWire`, renders by scalar kind.
    pub fn scalar<T: FromWire + ScalarKind + Any>() -> Self {
        Self {
            decode: Some(decode_slot::<T>),
            scalar: Some(scalar_slot::<T>),
            ..Self::opaque::<T>()
        }
    }

    /// Type carrying both capabilities itself.
    pub fn encodable<T: FromWire + ToWire + Any>() -> Self {
        Self {
            decode: Some(decode_slot::<T>),
            encode: Some(encode_slot::<T>),
            ..Self::opaque::<T>()
        }
    }

    /// Decode-only type.
    pub fn decodable<T: FromWire + Any>() -> Self {
        Self {
            decode: Some(decode_slot::<T>),
            ..Self::opaque::<T>()
        }
    }

    /// Type without capabilities. Usable only once substituted.
    pub fn opaque<T: Any>() -> Self {
        Self::without_capabilities(type_name::<T>(), TypeId::of::<T>())
    }

    pub(crate) fn without_capabilities(type_name: &'static str, type_id: TypeId) -> Self {
        Self {
            type_name,
            type_id,
            decode: None,
            encode: None,
            scalar: None,
        }
    }

    /// Codec of wire type `S` operating on `S::Natural` storage.
    pub fn substituted<S: WireType>() -> Self {
        Self {
            type_name: type_name::<S>(),
            type_id: TypeId::of::<S>(),
            decode: Some(decode_substituted::<S>),
            encode: Some(encode_substituted::<S>),
            scalar: None,
        }
    }

    /// Codec of `Option<T>` derived from the codec of `T`.
    pub(crate) fn optional<T: crate::record::Field + Default>(inner: &Self) -> Self {
        Self {
            type_name: type_name::<Option<T>>(),
            type_id: TypeId::of::<Option<T>>(),
            decode: inner.decode.map(|_| decode_option::<T> as DecodeFn),
            encode: inner.encode.map(|_| encode_option::<T> as EncodeFn),
            scalar: inner.scalar.map(|_| scalar_option::<T> as ScalarFn),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn decoder(&self) -> Option<DecodeFn> {
        self.decode
    }

    pub fn encoder(&self) -> Option<EncodeFn> {
        self.encode
    }

    pub fn scalar_view(&self) -> Option<ScalarFn> {
        self.scalar
    }

    pub fn can_decode(&self) -> bool {
        self.decode.is_some()
    }

    /// True when the builder can render the type (encoder or scalar kind).
    pub fn can_render(&self) -> bool {
        self.encode.is_some() || self.scalar.is_some()
    }

    /// Decode `value` into `slot`, failing when the capability is missing.
    pub fn decode_into(&self, slot: &mut dyn Any, value: WireValue) -> Result<(), WireError> {
        let decode = self.decode.ok_or(WireError::Unsupported {
            type_name: self.type_name,
            capability: "decoded",
        })?;
        decode(slot, value)
    }
}

impl fmt::Debug for WireCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireCodec")
            .field("type_name", &self.type_name)
            .field("decode", &self.decode.is_some())
            .field("encode", &self.encode.is_some())
            .field("scalar", &self.scalar.is_some())
            .finish()
    }
}

fn slot_mut<T: Any>(slot: &mut dyn Any) -> Result<&mut T, WireError> {
    slot.downcast_mut::<T>().ok_or(WireError::SlotMismatch {
        expected: type_name::<T>(),
    })
}

fn slot_ref<T: Any>(slot: &dyn Any) -> Result<&T, WireError> {
    slot.downcast_ref::<T>().ok_or(WireError::SlotMismatch {
        expected: type_name::<T>(),
    })
}

fn decode_slot<T: FromWire + Any>(slot: &mut dyn Any, value: WireValue) -> Result<(), WireError> {
    *slot_mut::<T>(slot)? = T::from_wire(value)?;
    Ok(())
}

fn encode_slot<T: ToWire + Any>(slot: &dyn Any) -> Result<WireValue, WireError> {
    Ok(slot_ref::<T>(slot)?.to_wire())
}

fn scalar_slot<T: ScalarKind + Any>(slot: &dyn Any) -> Result<Scalar<'_>, WireError> {
    Ok(slot_ref::<T>(slot)?.scalar())
}

fn decode_substituted<S: WireType>(slot: &mut dyn Any, value: WireValue) -> Result<(), WireError> {
    *slot_mut::<S::Natural>(slot)? = S::decode(value)?;
    Ok(())
}

fn encode_substituted<S: WireType>(slot: &dyn Any) -> Result<WireValue, WireError> {
    Ok(S::encode(slot_ref::<S::Natural>(slot)?))
}

fn inner_codec<T: crate::record::Field>() -> Result<WireCodec, WireError> {
    crate::record::leaf_codec::<T>().ok_or(WireError::Unsupported {
        type_name: type_name::<T>(),
        capability: "used as an optional leaf",
    })
}

fn decode_option<T: crate::record::Field + Default>(
    slot: &mut dyn Any,
    value: WireValue,
) -> Result<(), WireError> {
    let slot = slot_mut::<Option<T>>(slot)?;
    if value.is_null() {
        *slot = None;
        return Ok(());
    }
    let codec = inner_codec::<T>()?;
    let mut inner = T::default();
    codec.decode_into(&mut inner, value)?;
    *slot = Some(inner);
    Ok(())
}

fn encode_option<T: crate::record::Field>(slot: &dyn Any) -> Result<WireValue, WireError> {
    match slot_ref::<Option<T>>(slot)? {
        None => Ok(WireValue::Null),
        Some(inner) => {
            let codec = inner_codec::<T>()?;
            let encode = codec.encode.ok_or(WireError::Unsupported {
                type_name: codec.type_name,
                capability: "encoded",
            })?;
            encode(inner)
        }
    }
}

fn scalar_option<T: crate::record::Field>(slot: &dyn Any) -> Result<Scalar<'_>, WireError> {
    match slot_ref::<Option<T>>(slot)? {
        None => Ok(Scalar::Null),
        Some(inner) => {
            let codec = inner_codec::<T>()?;
            let scalar = codec.scalar.ok_or(WireError::Unsupported {
                type_name: codec.type_name,
                capability: "rendered",
            })?;
            scalar(inner)
        }
    }
}

fn mismatch(expected: &'static str, value: &WireValue) -> WireError {
    if value.is_null() {
        WireError::UnexpectedNull { target: expected }
    } else {
        WireError::TypeMismatch {
            expected,
            found: value.kind(),
        }
    }
}

impl FromWire for bool {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Bool(b) => Ok(b),
            WireValue::Integer(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl ScalarKind for bool {
    fn scalar(&self) -> Scalar<'_> {
        Scalar::Bool(*self)
    }
}

macro_rules! impl_wire_signed {
    ($($ty:ty),*) => {
        $(
            impl FromWire for $ty {
                fn from_wire(value: WireValue) -> Result<Self, WireError> {
                    match value {
                        WireValue::Integer(i) => <$ty>::try_from(i).map_err(|_| WireError::Overflow {
                            target: stringify!($ty),
                            value: i,
                        }),
                        WireValue::Bool(b) => Ok(<$ty>::from(b)),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }

            impl ScalarKind for $ty {
                fn scalar(&self) -> Scalar<'_> {
                    Scalar::Signed(*self as i64)
                }
            }
        )*
    };
}

macro_rules! impl_wire_unsigned {
    ($($ty:ty),*) => {
        $(
            impl FromWire for $ty {
                fn from_wire(value: WireValue) -> Result<Self, WireError> {
                    match value {
                        WireValue::Integer(i) => <$ty>::try_from(i).map_err(|_| WireError::Overflow {
                            target: stringify!($ty),
                            value: i,
                        }),
                        WireValue::Bool(b) => Ok(<$ty>::from(b)),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }

            impl ScalarKind for $ty {
                fn scalar(&self) -> Scalar<'_> {
                    Scalar::Unsigned(*self as u64)
                }
            }
        )*
    };
}

impl_wire_signed!(i8, i16, i32, i64, isize);
impl_wire_unsigned!(u8, u16, u32, u64, usize);

impl FromWire for f64 {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Real(f) => Ok(f),
            WireValue::Integer(i) => Ok(i as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromWire for f32 {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Real(f) => Ok(f as f32),
            WireValue::Integer(i) => Ok(i as f32),
            other => Err(mismatch("f32", &other)),
        }
    }
}

impl ScalarKind for f64 {
    fn scalar(&self) -> Scalar<'_> {
        Scalar::Float(*self)
    }
}

impl ScalarKind for f32 {
    fn scalar(&self) -> Scalar<'_> {
        Scalar::Float(f64::from(*self))
    }
}

impl FromWire for String {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Text(s) => Ok(s),
            WireValue::Blob(b) => String::from_utf8(b).map_err(|e| WireError::InvalidText {
                target: "String",
                reason: e.to_string(),
            }),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl ScalarKind for String {
    fn scalar(&self) -> Scalar<'_> {
        Scalar::Text(self)
    }
}

impl FromWire for Vec<u8> {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Blob(b) => Ok(b),
            WireValue::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl FromWire for NaiveDateTime {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Timestamp(t) => Ok(t),
            WireValue::Text(s) => parse_timestamp(&s),
            WireValue::Integer(secs) => DateTime::from_timestamp(secs, 0)
                .map(|t| t.naive_utc())
                .ok_or(WireError::Overflow {
                    target: "NaiveDateTime",
                    value: secs,
                }),
            other => Err(mismatch("NaiveDateTime", &other)),
        }
    }
}

impl ToWire for NaiveDateTime {
    fn to_wire(&self) -> WireValue {
        WireValue::Timestamp(*self)
    }
}

impl FromWire for DateTime<Utc> {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        if let WireValue::Text(s) = &value {
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Ok(t.with_timezone(&Utc));
            }
        }
        NaiveDateTime::from_wire(value).map(|t| t.and_utc())
    }
}

impl ToWire for DateTime<Utc> {
    fn to_wire(&self) -> WireValue {
        WireValue::Timestamp(self.naive_utc())
    }
}

impl FromWire for NaiveDate {
    fn from_wire(value: WireValue) -> Result<Self, WireError> {
        match value {
            WireValue::Timestamp(t) => Ok(t.date()),
            WireValue::Text(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .or_else(|_| parse_timestamp(&s).map(|t| t.date()))
                .map_err(|_| WireError::InvalidText {
                    target: "NaiveDate",
                    reason: format!("{s:?} is not a date"),
                }),
            other => Err(mismatch("NaiveDate", &other)),
        }
    }
}

impl ToWire for NaiveDate {
    fn to_wire(&self) -> WireValue {
        WireValue::Text(self.format(DATE_FORMAT).to_string())
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, WireError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| WireError::InvalidText {
            target: "NaiveDateTime",
            reason: e.to_string(),
        })
}

/// Format a timestamp the way text literals carry it.
pub(crate) fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_narrowing_checked() {
        assert_eq!(i16::from_wire(WireValue::Integer(-300)).unwrap(), -300);
        assert!(matches!(
            u8::from_wire(WireValue::Integer(256)),
            Err(WireError::Overflow { target: "u8", value: 256 })
        ));
        assert!(matches!(
            u32::from_wire(WireValue::Integer(-1)),
            Err(WireError::Overflow { .. })
        ));
    }

    #[test]
    fn test_null_rejected_for_plain_types() {
        assert!(matches!(
            String::from_wire(WireValue::Null),
            Err(WireError::UnexpectedNull { target: "String" })
        ));
        assert!(matches!(
            i64::from_wire(WireValue::Text("1".into())),
            Err(WireError::TypeMismatch { expected: "i64", found: "text" })
        ));
    }

    #[test]
    fn test_sqlite_style_coercions() {
        assert!(bool::from_wire(WireValue::Integer(1)).unwrap());
        assert!(!bool::from_wire(WireValue::Integer(0)).unwrap());
        assert_eq!(f64::from_wire(WireValue::Integer(3)).unwrap(), 3.0);
        assert_eq!(
            String::from_wire(WireValue::Blob(b"abc".to_vec())).unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_timestamp_from_text() {
        let t = NaiveDateTime::from_wire(WireValue::Text("2024-03-01 12:30:00".into())).unwrap();
        assert_eq!(format_timestamp(&t), "2024-03-01 12:30:00");

        let d = NaiveDate::from_wire(WireValue::Text("2024-03-01".into())).unwrap();
        assert_eq!(d.to_wire(), WireValue::Text("2024-03-01".into()));

        let utc = DateTime::<Utc>::from_wire(WireValue::Text("2024-03-01T12:30:00Z".into()))
            .unwrap();
        assert_eq!(utc.to_wire(), WireValue::Timestamp(t));
    }

    #[test]
    fn test_codec_capabilities() {
        let scalar = WireCodec::scalar::<i32>();
        assert!(scalar.can_decode());
        assert!(scalar.can_render());
        assert!(scalar.encoder().is_none());

        let opaque = WireCodec::opaque::<Vec<String>>();
        assert!(!opaque.can_decode());
        assert!(!opaque.can_render());

        let mut slot: Vec<String> = Vec::new();
        assert!(matches!(
            opaque.decode_into(&mut slot, WireValue::Null),
            Err(WireError::Unsupported { capability: "decoded", .. })
        ));
    }

    #[test]
    fn test_codec_slot_mismatch() {
        let codec = WireCodec::scalar::<i64>();
        let mut wrong = String::new();
        assert!(matches!(
            codec.decode_into(&mut wrong, WireValue::Integer(1)),
            Err(WireError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn test_wire_value_conversions() {
        assert_eq!(WireValue::from("a"), WireValue::Text("a".into()));
        assert_eq!(WireValue::from(Some(5i64)), WireValue::Integer(5));
        assert_eq!(WireValue::from(None::<i64>), WireValue::Null);
        assert_eq!(WireValue::default().kind(), "null");
    }
}
