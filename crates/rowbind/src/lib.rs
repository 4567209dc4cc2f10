// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rowbind - Record/column mapping for relational results
//!
//! Declare once how record types map to table columns, then decode query
//! results into typed collections and render records into literal SQL
//! value strings, without per-row lookups.
//!
//! # Features
//!
//! - **Derived descriptors** -- `#[derive(Record)]`, column overrides via `#[tag(db = "col=...")]`
//! - **Nested records** -- flattened into dotted field paths
//! - **Type substitution** -- store a natural type through a [`WireType`]
//! - **Multi-table decode** -- one result set into several destinations
//! - **Value strings** -- `(cols) VALUES (...)` tuples and `col=value` assignments
//! - **SQLite cursor** -- `rusqlite` adapter (feature `sqlite`, on by default)
//!
//! # Architecture
//!
//! ```text
//! Registry (built at startup, then sealed)
//! +-- TagParser          (column names from field tags)
//! +-- substitutions      (natural type -> wire type)
//! +-- TypeMapping        (column/field bindings per record type)
//!
//! ResultDecoder  (ResultCursor -> Vec<T>, ...)   reads the sealed Registry
//! ValueBuilder   (&[T] / &T -> literal SQL)       reads the sealed Registry
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rowbind::{Record, Registry, ResultDecoder, ValueBuilder};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Item {
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! let mut registry = Registry::new();
//! registry.register::<Item>()?.seal();
//!
//! let builder = ValueBuilder::new(&registry)?;
//! let values = builder.tuples(&items, &[])?; // (id,name) VALUES (1,"a"),(2,"b")
//!
//! let mut loaded: Vec<Item> = Vec::new();
//! ResultDecoder::new(&registry)?.decode(&mut cursor, &mut [&mut loaded])?;
//! ```

extern crate self as rowbind;

pub mod builder;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod record;
pub mod registry;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod tag;
pub mod wire;

pub use builder::{RecordRef, ValueBuilder};
pub use config::{Config, ConfigError, FieldsPolicy, QuoteStyle};
pub use cursor::{MemoryCursor, MemoryCursorError, ResultCursor};
pub use decode::{Destination, ResultDecoder};
pub use error::{
    BoxError, DecodeError, Error, MappingError, RegistrationError, RenderError, WireError,
};
pub use record::{Element, Field, FieldDescriptor, FieldShape, Record, RecordDescriptor};
pub use registry::{FieldBinding, FieldPath, Registry, TypeMapping};
pub use rowbind_codegen::Record;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteCursor, SqliteCursorError};
pub use tag::{ColumnTag, TagParser};
pub use wire::{FromWire, Scalar, ScalarKind, ToWire, WireCodec, WireType, WireValue};
