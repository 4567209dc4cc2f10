// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping registry.
//!
//! Built once at startup, then sealed and shared read-only with decoders
//! and builders. For every registered record type it holds:
//!
//! - column → field bindings, used by the result decoder
//! - field path → column bindings, used by the value-string builder
//! - the default field order, used when no field list is given
//!
//! # Lifecycle
//!
//! ```text
//! Registry::new()
//!   .register::<T>()     (walk descriptors, build bindings)
//!   .substitute::<S>()   (natural type -> wire type, rewrites bindings)
//!   .seal()              (no more changes)
//!   -> ResultDecoder / ValueBuilder
//! ```
//!
//! Registration needs `&mut Registry`, so it cannot race with readers
//! holding `&Registry`. Sealing makes late registration an error instead of
//! a silent change under running queries.

use crate::config::{Config, ConfigError};
use crate::error::{MappingError, RegistrationError};
use crate::record::{FieldDescriptor, FieldShape, Record, RecordDescriptor};
use crate::tag::TagParser;
use crate::wire::{WireCodec, WireType};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

/// Accessor chain from the outermost record to a leaf field
#[derive(Debug, Clone)]
pub struct FieldPath {
    steps: Vec<&'static FieldDescriptor>,
}

impl FieldPath {
    pub fn resolve<'a>(&self, record: &'a dyn Any) -> Option<&'a dyn Any> {
        self.steps
            .iter()
            .try_fold(record, |value, step| (step.get)(value))
    }

    pub fn resolve_mut<'a>(&self, record: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let mut value = record;
        for step in &self.steps {
            value = (step.get_mut)(value)?;
        }
        Some(value)
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

/// One mapped leaf field of a record type
#[derive(Debug, Clone)]
pub struct FieldBinding {
    path: String,
    column: String,
    accessor: FieldPath,
    wire: WireCodec,
}

impl FieldBinding {
    /// Dotted field path, without the outer record name
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lowercase column name
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn accessor(&self) -> &FieldPath {
        &self.accessor
    }

    /// Resolved wire codec (substituted when a substitution applies)
    pub fn wire(&self) -> &WireCodec {
        &self.wire
    }
}

/// All bindings of one record type
#[derive(Debug)]
pub struct TypeMapping {
    type_name: &'static str,
    bindings: Vec<FieldBinding>,
    by_column: HashMap<String, usize>,
    by_field: HashMap<String, usize>,
}

impl TypeMapping {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            bindings: Vec::new(),
            by_column: HashMap::new(),
            by_field: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Binding for a lowercase column name
    pub fn column(&self, column: &str) -> Option<&FieldBinding> {
        self.by_column.get(column).map(|&i| &self.bindings[i])
    }

    /// Binding for a dotted field path
    pub fn field(&self, path: &str) -> Option<&FieldBinding> {
        self.by_field.get(path).map(|&i| &self.bindings[i])
    }

    /// Bindings in default field order (declaration order, depth-first)
    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    /// Field paths in default field order
    pub fn default_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.iter().map(FieldBinding::path)
    }

    fn insert(&mut self, binding: FieldBinding) -> Result<(), RegistrationError> {
        if self.by_column.contains_key(&binding.column) {
            return Err(RegistrationError::DuplicateColumn {
                type_name: self.type_name,
                column: binding.column,
            });
        }
        let index = self.bindings.len();
        self.by_column.insert(binding.column.clone(), index);
        self.by_field.insert(binding.path.clone(), index);
        self.bindings.push(binding);
        Ok(())
    }
}

/// Registry of record mappings and type substitutions
#[derive(Debug, Default)]
pub struct Registry {
    config: Config,
    sealed: bool,
    types: HashMap<TypeId, TypeMapping>,
    substitutions: HashMap<TypeId, WireCodec>,
}

impl Registry {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with a validated configuration
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register record type `T`.
    ///
    /// Walks the descriptor depth-first. Nested records are flattened into
    /// dotted paths unless the field carries an explicit column override,
    /// in which case the nested record is stored as one column.
    pub fn register<T: Record>(&mut self) -> Result<&mut Self, RegistrationError> {
        self.register_descriptor(T::descriptor())?;
        Ok(self)
    }

    /// Register a record type by its descriptor
    pub fn register_descriptor(
        &mut self,
        descriptor: &'static RecordDescriptor,
    ) -> Result<&mut Self, RegistrationError> {
        self.ensure_open("register a record")?;

        let type_id = (descriptor.type_id)();
        if self.types.contains_key(&type_id) {
            return Err(RegistrationError::DuplicateType {
                type_name: descriptor.type_name,
            });
        }

        let mut mapping = TypeMapping::new(descriptor.type_name);
        let mut steps = Vec::new();
        self.walk(descriptor, "", &mut steps, &mut mapping)?;

        tracing::debug!(
            "[rowbind] registered {} ({} columns)",
            descriptor.type_name,
            mapping.bindings.len()
        );
        self.types.insert(type_id, mapping);
        Ok(self)
    }

    fn walk(
        &self,
        descriptor: &'static RecordDescriptor,
        prefix: &str,
        steps: &mut Vec<&'static FieldDescriptor>,
        mapping: &mut TypeMapping,
    ) -> Result<(), RegistrationError> {
        let parser = TagParser::from_config(&self.config);

        for field in descriptor.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{prefix}.{}", field.name)
            };

            let column = parser
                .column(field)
                .map_err(|column| RegistrationError::BadTag {
                    type_name: mapping.type_name,
                    field: path.clone(),
                    column,
                })?;

            steps.push(field);
            match (field.shape)() {
                FieldShape::Nested(inner) if !column.explicit => {
                    self.walk(inner, &path, steps, mapping)?;
                }
                shape => {
                    let natural = match shape {
                        FieldShape::Leaf(codec) => codec,
                        FieldShape::Nested(inner) => WireCodec::without_capabilities(
                            inner.type_name,
                            (inner.type_id)(),
                        ),
                    };
                    let wire = self
                        .substitutions
                        .get(&natural.type_id())
                        .copied()
                        .unwrap_or(natural);
                    mapping.insert(FieldBinding {
                        path,
                        column: column.name,
                        accessor: FieldPath {
                            steps: steps.clone(),
                        },
                        wire,
                    })?;
                }
            }
            steps.pop();
        }
        Ok(())
    }

    /// Use wire type `S` for every field of type `S::Natural`.
    ///
    /// Applies to types registered later and rewrites bindings of types
    /// registered earlier, so call order does not matter.
    pub fn substitute<S: WireType>(&mut self) -> Result<&mut Self, RegistrationError> {
        self.ensure_open("substitute a type")?;

        let natural = TypeId::of::<S::Natural>();
        if self.substitutions.contains_key(&natural) {
            return Err(RegistrationError::DuplicateSubstitution {
                natural: type_name::<S::Natural>(),
            });
        }

        let codec = WireCodec::substituted::<S>();
        self.substitutions.insert(natural, codec);

        let mut rewritten = 0usize;
        for binding in self
            .types
            .values_mut()
            .flat_map(|mapping| mapping.bindings.iter_mut())
            .filter(|binding| binding.wire.type_id() == natural)
        {
            binding.wire = codec;
            rewritten += 1;
        }

        tracing::debug!(
            "[rowbind] substituted {} -> {} ({} bindings rewritten)",
            type_name::<S::Natural>(),
            type_name::<S>(),
            rewritten
        );
        Ok(self)
    }

    /// Close the registry for registration. Idempotent.
    pub fn seal(&mut self) -> &mut Self {
        if !self.sealed {
            tracing::debug!("[rowbind] registry sealed with {} types", self.types.len());
        }
        self.sealed = true;
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Mapping of record type `T`, if registered
    pub fn mapping<T: Record>(&self) -> Option<&TypeMapping> {
        self.types.get(&TypeId::of::<T>())
    }

    /// Mapping for a record type id, failing with `UnmappedType`
    pub(crate) fn mapping_of(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<&TypeMapping, MappingError> {
        self.types
            .get(&type_id)
            .ok_or(MappingError::UnmappedType { type_name })
    }

    pub(crate) fn ensure_sealed(&self) -> Result<(), MappingError> {
        if self.sealed {
            Ok(())
        } else {
            Err(MappingError::Unsealed)
        }
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), RegistrationError> {
        if self.sealed {
            Err(RegistrationError::Sealed { operation })
        } else {
            Ok(())
        }
    }
}
