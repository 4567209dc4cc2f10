// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value-string builder
//!
//! Renders records into literal SQL fragments:
//!
//! ```text
//! tuples:      (id,name) VALUES (1,"a"),(2,"b")     INSERT INTO t <here>
//! assignments: name="x",qty=3                       UPDATE t SET <here>
//! ```
//!
//! Per field, a value is rendered through the wire type's encoder when it
//! has one, else through its scalar kind. Anything else is an error.

use crate::config::{FieldsPolicy, QuoteStyle};
use crate::error::{MappingError, RenderError, WireError};
use crate::record::Record;
use crate::registry::{FieldBinding, Registry, TypeMapping};
use crate::wire::{format_timestamp, Scalar, WireValue};
use std::sync::Arc;

/// Element of a record sequence given to [`ValueBuilder::tuples`].
///
/// Lets the builder take records by value, by reference or behind a
/// pointer. `None` is an empty element.
pub trait RecordRef<T: Record> {
    fn record(&self) -> Option<&T>;
}

impl<T: Record> RecordRef<T> for T {
    fn record(&self) -> Option<&T> {
        Some(self)
    }
}

impl<T: Record> RecordRef<T> for &T {
    fn record(&self) -> Option<&T> {
        Some(self)
    }
}

impl<T: Record> RecordRef<T> for Box<T> {
    fn record(&self) -> Option<&T> {
        Some(self)
    }
}

impl<T: Record> RecordRef<T> for Arc<T> {
    fn record(&self) -> Option<&T> {
        Some(self)
    }
}

impl<T: Record> RecordRef<T> for Option<T> {
    fn record(&self) -> Option<&T> {
        self.as_ref()
    }
}

impl<T: Record> RecordRef<T> for Option<Box<T>> {
    fn record(&self) -> Option<&T> {
        self.as_deref()
    }
}

impl<T: Record> RecordRef<T> for Option<&T> {
    fn record(&self) -> Option<&T> {
        *self
    }
}

/// Builder bound to a sealed registry
#[derive(Debug, Clone, Copy)]
pub struct ValueBuilder<'r> {
    registry: &'r Registry,
    policy: FieldsPolicy,
    quote: QuoteStyle,
}

impl<'r> ValueBuilder<'r> {
    pub fn new(registry: &'r Registry) -> Result<Self, MappingError> {
        registry.ensure_sealed()?;
        let config = registry.config();
        Ok(Self {
            registry,
            policy: config.default_fields_policy,
            quote: config.string_quote,
        })
    }

    /// Render `records` as a column list followed by one tuple per record.
    ///
    /// An empty `fields` selects every mapped field in declaration order.
    pub fn tuples<T, R>(&self, records: &[R], fields: &[&str]) -> Result<String, RenderError>
    where
        T: Record,
        R: RecordRef<T>,
    {
        let descriptor = T::descriptor();
        if records.is_empty() {
            return Err(RenderError::EmptySequence {
                type_name: descriptor.type_name,
            });
        }
        let mapping = self.registry.mapping::<T>().ok_or(MappingError::UnmappedType {
            type_name: descriptor.type_name,
        })?;
        let bindings = self.select(mapping, fields)?;

        let mut out = String::from("(");
        for (i, binding) in bindings.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(binding.column());
        }
        out.push_str(") VALUES ");

        for (index, element) in records.iter().enumerate() {
            let record = element.record().ok_or(RenderError::NilElement { index })?;
            if index > 0 {
                out.push(',');
            }
            out.push('(');
            for (i, binding) in bindings.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                self.render(&mut out, binding, record)?;
            }
            out.push(')');
        }
        Ok(out)
    }

    /// Render `record` as comma-joined `column=literal` clauses.
    ///
    /// An empty `fields` selects every mapped field in declaration order.
    pub fn assignments<T: Record>(&self, record: &T, fields: &[&str]) -> Result<String, RenderError> {
        let mapping = self.registry.mapping::<T>().ok_or(MappingError::UnmappedType {
            type_name: T::descriptor().type_name,
        })?;
        let bindings = self.select(mapping, fields)?;

        let mut out = String::new();
        for (i, binding) in bindings.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(binding.column());
            out.push('=');
            self.render(&mut out, binding, record)?;
        }
        Ok(out)
    }

    fn select<'m>(
        &self,
        mapping: &'m TypeMapping,
        fields: &[&str],
    ) -> Result<Vec<&'m FieldBinding>, MappingError> {
        if fields.is_empty() {
            let skip = self.policy == FieldsPolicy::SkipUnrenderable;
            return Ok(mapping
                .bindings()
                .iter()
                .filter(|binding| !skip || binding.wire().can_render())
                .collect());
        }

        fields
            .iter()
            .map(|&field| {
                mapping.field(field).ok_or_else(|| MappingError::UnknownField {
                    type_name: mapping.type_name(),
                    field: field.to_string(),
                })
            })
            .collect()
    }

    fn render<T: Record>(
        &self,
        out: &mut String,
        binding: &FieldBinding,
        record: &T,
    ) -> Result<(), RenderError> {
        let wire = binding.wire();
        let encode_err = |source| RenderError::Encode {
            field: binding.path().to_string(),
            source,
        };
        let slot = binding
            .accessor()
            .resolve(record)
            .ok_or(WireError::SlotMismatch {
                expected: wire.type_name(),
            })
            .map_err(encode_err)?;

        if let Some(encode) = wire.encoder() {
            let value = encode(slot).map_err(encode_err)?;
            self.render_wire(out, &value).map_err(encode_err)?;
        } else if let Some(scalar) = wire.scalar_view() {
            let value = scalar(slot).map_err(encode_err)?;
            self.render_scalar(out, value).map_err(encode_err)?;
        } else {
            return Err(RenderError::CannotRender {
                type_name: wire.type_name(),
                field: binding.path().to_string(),
            });
        }
        Ok(())
    }

    fn render_scalar(&self, out: &mut String, value: Scalar<'_>) -> Result<(), WireError> {
        match value {
            Scalar::Null => out.push_str("NULL"),
            Scalar::Bool(b) => out.push_str(if b { "true" } else { "false" }),
            Scalar::Signed(i) => out.push_str(&i.to_string()),
            Scalar::Unsigned(u) => out.push_str(&u.to_string()),
            // NaN and infinities have no SQL literal form.
            Scalar::Float(f) if !f.is_finite() => return Err(WireError::NonFinite { value: f }),
            Scalar::Float(f) => out.push_str(&f.to_string()),
            Scalar::Text(s) => self.quote_into(out, s),
        }
        Ok(())
    }

    fn render_wire(&self, out: &mut String, value: &WireValue) -> Result<(), WireError> {
        match value {
            WireValue::Null => out.push_str("NULL"),
            WireValue::Bool(b) => return self.render_scalar(out, Scalar::Bool(*b)),
            WireValue::Integer(i) => return self.render_scalar(out, Scalar::Signed(*i)),
            WireValue::Real(f) => return self.render_scalar(out, Scalar::Float(*f)),
            WireValue::Text(s) => self.quote_into(out, s),
            WireValue::Blob(bytes) => {
                out.push_str("X'");
                for byte in bytes {
                    out.push_str(&format!("{byte:02X}"));
                }
                out.push('\'');
            }
            WireValue::Timestamp(t) => self.quote_into(out, &format_timestamp(t)),
        }
        Ok(())
    }

    fn quote_into(&self, out: &mut String, text: &str) {
        match self.quote {
            QuoteStyle::Double => {
                out.push('"');
                for c in text.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c if c.is_ascii_control() => {
                            out.push_str(&format!("\\x{:02x}", c as u32));
                        }
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            QuoteStyle::Single => {
                out.push('\'');
                out.push_str(&text.replace('\'', "''"));
                out.push('\'');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::Record;
    use chrono::NaiveDate;

    #[derive(Debug, Default, Record)]
    pub struct Item {
        pub id: i64,
        pub name: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Event {
        pub id: u32,
        pub at: chrono::NaiveDateTime,
        pub note: Option<String>,
        pub ratio: f64,
        pub active: bool,
        pub tags: Vec<String>,
    }

    fn registry_with(config: Config) -> Registry {
        let mut registry = Registry::with_config(config).unwrap();
        registry
            .register::<Item>()
            .unwrap()
            .register::<Event>()
            .unwrap()
            .seal();
        registry
    }

    fn registry() -> Registry {
        registry_with(Config::default())
    }

    fn items() -> Vec<Item> {
        vec![
            Item { id: 1, name: "a".into() },
            Item { id: 2, name: "b".into() },
        ]
    }

    #[test]
    fn test_tuples_default_fields() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        assert_eq!(
            builder.tuples(&items(), &[]).unwrap(),
            r#"(id,name) VALUES (1,"a"),(2,"b")"#
        );
    }

    #[test]
    fn test_assignments_explicit_fields() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        let item = Item { id: 5, name: "x".into() };
        assert_eq!(builder.assignments(&item, &["name"]).unwrap(), r#"name="x""#);
        assert_eq!(
            builder.assignments(&item, &[]).unwrap(),
            r#"id=5,name="x""#
        );
    }

    #[test]
    fn test_unknown_field() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        let err = builder.assignments(&Item::default(), &["Name"]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Mapping(MappingError::UnknownField { type_name: "Item", ref field })
                if field == "Name"
        ));
    }

    #[test]
    fn test_nil_and_empty_sequences() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();

        let sparse = vec![Some(Item::default()), None];
        assert!(matches!(
            builder.tuples::<Item, _>(&sparse, &[]),
            Err(RenderError::NilElement { index: 1 })
        ));

        let empty: Vec<Item> = Vec::new();
        assert!(matches!(
            builder.tuples(&empty, &[]),
            Err(RenderError::EmptySequence { type_name: "Item" })
        ));
    }

    #[test]
    fn test_pointer_elements() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        let boxed: Vec<Box<Item>> = items().into_iter().map(Box::new).collect();
        assert_eq!(
            builder.tuples::<Item, _>(&boxed, &["id"]).unwrap(),
            "(id) VALUES (1),(2)"
        );
    }

    #[test]
    fn test_literal_kinds() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        let event = Event {
            id: 7,
            at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap(),
            note: None,
            ratio: 0.25,
            active: true,
            tags: Vec::new(),
        };
        assert_eq!(
            builder
                .assignments(&event, &["id", "at", "note", "ratio", "active"])
                .unwrap(),
            r#"id=7,at="2024-03-01 12:30:00",note=NULL,ratio=0.25,active=true"#
        );
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        for ratio in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let event = Event {
                ratio,
                ..Event::default()
            };
            assert!(matches!(
                builder.assignments(&event, &["ratio"]),
                Err(RenderError::Encode {
                    ref field,
                    source: WireError::NonFinite { .. },
                }) if field == "ratio"
            ));
        }
    }

    #[test]
    fn test_unrenderable_policy() {
        let event = Event::default();

        let strict = registry();
        let builder = ValueBuilder::new(&strict).unwrap();
        assert!(matches!(
            builder.assignments(&event, &[]),
            Err(RenderError::CannotRender { ref field, .. }) if field == "tags"
        ));

        let lenient = registry_with(
            Config::builder()
                .default_fields_policy(FieldsPolicy::SkipUnrenderable)
                .build(),
        );
        let builder = ValueBuilder::new(&lenient).unwrap();
        let out = builder.assignments(&event, &[]).unwrap();
        assert!(!out.contains("tags"));
        assert!(matches!(
            builder.assignments(&event, &["tags"]),
            Err(RenderError::CannotRender { .. })
        ));
    }

    #[test]
    fn test_quote_styles() {
        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        let item = Item { id: 1, name: "say \"hi\"\n\\".into() };
        assert_eq!(
            builder.assignments(&item, &["name"]).unwrap(),
            r#"name="say \"hi\"\n\\""#
        );

        let single = registry_with(Config::builder().string_quote(QuoteStyle::Single).build());
        let builder = ValueBuilder::new(&single).unwrap();
        let item = Item { id: 1, name: "it's".into() };
        assert_eq!(builder.assignments(&item, &["name"]).unwrap(), "name='it''s'");
    }

    #[test]
    fn test_unmapped_type() {
        #[derive(Debug, Default, Record)]
        pub struct Stray {
            pub id: i64,
        }

        let registry = registry();
        let builder = ValueBuilder::new(&registry).unwrap();
        assert!(matches!(
            builder.assignments(&Stray::default(), &[]),
            Err(RenderError::Mapping(MappingError::UnmappedType { type_name: "Stray" }))
        ));
    }
}
