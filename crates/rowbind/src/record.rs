// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record descriptors for field-level mapping metadata.
//!
//! Defines `RecordDescriptor` and `FieldDescriptor`, the static tables that
//! `#[derive(Record)]` emits. Used by the registry to build column and
//! field mappings without reflection.

use crate::wire::WireCodec;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::{Any, TypeId};
use std::fmt;

/// Shape of a field: stored as one column, or walked as a nested record
#[derive(Debug, Clone, Copy)]
pub enum FieldShape {
    Leaf(WireCodec),
    Nested(&'static RecordDescriptor),
}

/// Descriptor of a single field (compile-time generated)
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Raw tag strings as `(tag name, value)` pairs
    pub tags: &'static [(&'static str, &'static str)],
    pub shape: fn() -> FieldShape,
    pub get: fn(&dyn Any) -> Option<&dyn Any>,
    pub get_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl FieldDescriptor {
    /// Raw value of the tag called `name`, if present
    pub fn tag(&self, name: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == name)
            .map(|(_, value)| *value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Record descriptor: mapping metadata for one record type
pub struct RecordDescriptor {
    pub type_name: &'static str, // e.g., "Account"
    pub type_id: fn() -> TypeId,
    pub fields: &'static [FieldDescriptor],
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Record type mapped to a table's row shape.
///
/// Implemented by `#[derive(Record)]`. `Default` provides the zero value
/// the decoder fills.
pub trait Record: Any + Default {
    fn descriptor() -> &'static RecordDescriptor;
}

/// Element type of a decode destination.
///
/// A record is its own element (derived); `Box<T>` holds a record behind
/// a pointer.
pub trait Element: Sized + 'static {
    type Record: Record;

    fn from_boxed(record: Box<Self::Record>) -> Self;
}

impl<T: Record> Element for Box<T> {
    type Record = T;

    fn from_boxed(record: Box<T>) -> Self {
        record
    }
}

/// Any type that can appear as a record field.
pub trait Field: Any {
    fn shape() -> FieldShape;
}

pub(crate) fn leaf_codec<T: Field>() -> Option<WireCodec> {
    match T::shape() {
        FieldShape::Leaf(codec) => Some(codec),
        FieldShape::Nested(_) => None,
    }
}

macro_rules! scalar_fields {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                fn shape() -> FieldShape {
                    FieldShape::Leaf(WireCodec::scalar::<$ty>())
                }
            }
        )*
    };
}

scalar_fields!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);

// Temporal types are leaves even though they are structs.
macro_rules! temporal_fields {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                fn shape() -> FieldShape {
                    FieldShape::Leaf(WireCodec::encodable::<$ty>())
                }
            }
        )*
    };
}

temporal_fields!(NaiveDateTime, NaiveDate, DateTime<Utc>);

impl<T: Any> Field for Vec<T> {
    fn shape() -> FieldShape {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            FieldShape::Leaf(WireCodec::decodable::<Vec<u8>>())
        } else {
            FieldShape::Leaf(WireCodec::opaque::<Self>())
        }
    }
}

impl<T: Field + Default> Field for Option<T> {
    fn shape() -> FieldShape {
        match T::shape() {
            FieldShape::Leaf(inner) => FieldShape::Leaf(WireCodec::optional::<T>(&inner)),
            FieldShape::Nested(_) => FieldShape::Leaf(WireCodec::opaque::<Self>()),
        }
    }
}
