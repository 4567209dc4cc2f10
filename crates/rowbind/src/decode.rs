// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Result decoder
//!
//! Decodes a result set into one or more record collections. Columns are
//! resolved against the registry once per query; each row then only walks
//! the cached bindings.
//!
//! # Multi-table results
//!
//! Columns are listed table by table, in destination order:
//!
//! ```text
//! SELECT a.id, a.name, '', b.id, b.total FROM a JOIN b ...
//!        \____________/  |  \____________/
//!          dest[0]   delimiter   dest[1]
//! ```
//!
//! A column missing from the current destination moves to the next one
//! (once). When the last column of one table shares its name with the first
//! column of the next, an empty-named column marks the boundary.

use crate::cursor::ResultCursor;
use crate::error::{DecodeError, MappingError, WireError};
use crate::record::{Element, Record};
use crate::registry::{FieldBinding, Registry, TypeMapping};
use crate::wire::WireValue;
use std::any::{Any, TypeId};

/// Growable container receiving decoded records
///
/// Implemented for `Vec<E>` where `E` is a record or a `Box` of one.
/// Decoded records are staged after the current contents; the decoder
/// then either commits them, dropping the previous contents, or rolls
/// them back.
pub trait Destination {
    fn record_type(&self) -> (TypeId, &'static str);

    /// Zero-valued record to decode into
    fn new_record(&self) -> Box<dyn Any>;

    /// Position where staging starts
    fn mark(&self) -> usize;

    /// Append a decoded record produced by [`Destination::new_record`]
    fn stage(&mut self, record: Box<dyn Any>) -> Result<(), WireError>;

    /// Keep only the records staged after `mark`
    fn commit(&mut self, mark: usize);

    /// Drop the records staged after `mark`
    fn rollback(&mut self, mark: usize);
}

impl<E: Element> Destination for Vec<E> {
    fn record_type(&self) -> (TypeId, &'static str) {
        (TypeId::of::<E::Record>(), E::Record::descriptor().type_name)
    }

    fn new_record(&self) -> Box<dyn Any> {
        Box::new(E::Record::default())
    }

    fn mark(&self) -> usize {
        self.len()
    }

    fn stage(&mut self, record: Box<dyn Any>) -> Result<(), WireError> {
        let record = record
            .downcast::<E::Record>()
            .map_err(|_| WireError::SlotMismatch {
                expected: E::Record::descriptor().type_name,
            })?;
        self.push(E::from_boxed(record));
        Ok(())
    }

    fn commit(&mut self, mark: usize) {
        self.drain(..mark);
    }

    fn rollback(&mut self, mark: usize) {
        self.truncate(mark);
    }
}

/// Cached binding of one result column
#[derive(Debug, Clone, Copy)]
struct ColumnSlot<'r> {
    dest: usize,
    binding: &'r FieldBinding,
}

/// Decoder bound to a sealed registry
#[derive(Debug, Clone, Copy)]
pub struct ResultDecoder<'r> {
    registry: &'r Registry,
}

impl<'r> ResultDecoder<'r> {
    pub fn new(registry: &'r Registry) -> Result<Self, MappingError> {
        registry.ensure_sealed()?;
        Ok(Self { registry })
    }

    /// Decode every remaining row of `cursor` into `dests`.
    ///
    /// Returns the number of rows read. On error the destinations keep
    /// their previous contents. The cursor is not closed.
    pub fn decode<C: ResultCursor>(
        &self,
        cursor: &mut C,
        dests: &mut [&mut dyn Destination],
    ) -> Result<usize, DecodeError> {
        if dests.is_empty() {
            return Err(DecodeError::NoDestinations);
        }

        let mappings = dests
            .iter()
            .map(|dest| {
                let (type_id, type_name) = dest.record_type();
                self.registry.mapping_of(type_id, type_name)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let columns = cursor.column_names();
        let plan = plan_columns(&columns, &mappings)?;
        tracing::trace!(
            "[rowbind] decode plan: {} columns into {} destinations",
            columns.len(),
            dests.len()
        );

        let mut receives = vec![false; dests.len()];
        for slot in plan.iter().flatten() {
            receives[slot.dest] = true;
        }

        let marks: Vec<usize> = dests.iter().map(|dest| dest.mark()).collect();
        let result = read_rows(cursor, dests, &plan, &columns, &receives);
        for (dest, &mark) in dests.iter_mut().zip(&marks) {
            if result.is_ok() {
                dest.commit(mark);
            } else {
                dest.rollback(mark);
            }
        }
        result
    }
}

/// Stage every remaining row of `cursor`, returning the row count.
fn read_rows<C: ResultCursor>(
    cursor: &mut C,
    dests: &mut [&mut dyn Destination],
    plan: &[Option<ColumnSlot<'_>>],
    columns: &[String],
    receives: &[bool],
) -> Result<usize, DecodeError> {
    let mut row = vec![WireValue::Null; columns.len()];
    let mut rows = 0usize;

    loop {
        match cursor.advance() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                return Err(DecodeError::Cursor {
                    source: Box::new(e),
                })
            }
        }

        cursor
            .scan(&mut row)
            .map_err(|e| DecodeError::RowDecode {
                row: rows,
                source: Box::new(e),
            })?;

        let mut fresh: Vec<Option<Box<dyn Any>>> = dests
            .iter()
            .zip(receives)
            .map(|(dest, &receives)| receives.then(|| dest.new_record()))
            .collect();

        for ((slot, value), column) in plan.iter().zip(row.iter_mut()).zip(columns) {
            // Delimiter columns are scanned and dropped.
            let Some(slot) = slot else { continue };
            let Some(record) = fresh[slot.dest].as_deref_mut() else {
                continue;
            };
            let value = std::mem::take(value);
            store(slot.binding, record, value).map_err(|source| DecodeError::FieldDecode {
                row: rows,
                column: column.clone(),
                source,
            })?;
        }

        for (dest, record) in dests.iter_mut().zip(fresh) {
            if let Some(record) = record {
                dest.stage(record)
                    .map_err(|source| DecodeError::Stage { row: rows, source })?;
            }
        }
        rows += 1;
    }
    Ok(rows)
}

fn store(binding: &FieldBinding, record: &mut dyn Any, value: WireValue) -> Result<(), WireError> {
    let slot = binding
        .accessor()
        .resolve_mut(record)
        .ok_or(WireError::SlotMismatch {
            expected: binding.wire().type_name(),
        })?;
    binding.wire().decode_into(slot, value)
}

/// Strip a `table.` qualifier and lowercase.
fn normalize(column: &str) -> String {
    column
        .rsplit_once('.')
        .map_or(column, |(_, name)| name)
        .to_lowercase()
}

/// Bind every column to a destination field, once per query.
///
/// `None` marks a delimiter column.
fn plan_columns<'r>(
    columns: &[String],
    mappings: &[&'r TypeMapping],
) -> Result<Vec<Option<ColumnSlot<'r>>>, MappingError> {
    let mut plan = Vec::with_capacity(columns.len());
    let mut dest = 0usize;

    for (position, raw) in columns.iter().enumerate() {
        if raw.is_empty() {
            dest += 1;
            if dest == mappings.len() {
                return Err(MappingError::UnmappedColumn {
                    column: String::new(),
                    position,
                });
            }
            plan.push(None);
            continue;
        }

        let column = normalize(raw);
        let binding = match mappings[dest].column(&column) {
            Some(binding) => binding,
            // Only the immediately following destination is tried.
            None if dest + 1 < mappings.len() => {
                dest += 1;
                mappings[dest].column(&column).ok_or_else(|| MappingError::UnmappedColumn {
                    column: column.clone(),
                    position,
                })?
            }
            None => return Err(MappingError::UnmappedColumn { column, position }),
        };
        plan.push(Some(ColumnSlot { dest, binding }));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MemoryCursor;
    use crate::Record;

    #[derive(Debug, Default, PartialEq, Record)]
    pub struct Left {
        pub a: i64,
        pub b: String,
    }

    #[derive(Debug, Default, PartialEq, Record)]
    pub struct Right {
        #[tag(db = "col=a")]
        pub c: i64,
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register::<Left>()
            .unwrap()
            .register::<Right>()
            .unwrap()
            .seal();
        registry
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Users.UserId"), "userid");
        assert_eq!(normalize("db.users.id"), "id");
        assert_eq!(normalize("Name"), "name");
    }

    #[test]
    fn test_delimiter_forces_next_destination() {
        let registry = registry();
        let left = registry.mapping::<Left>().unwrap();
        let right = registry.mapping::<Right>().unwrap();
        let columns: Vec<String> = ["a", "b", "", "a"].map(String::from).to_vec();

        let plan = plan_columns(&columns, &[left, right]).unwrap();
        assert_eq!(plan[0].unwrap().dest, 0);
        assert_eq!(plan[1].unwrap().dest, 0);
        assert!(plan[2].is_none());
        let last = plan[3].unwrap();
        assert_eq!(last.dest, 1);
        assert_eq!(last.binding.path(), "c");
    }

    #[test]
    fn test_without_delimiter_shared_name_stays_left() {
        let registry = registry();
        let left = registry.mapping::<Left>().unwrap();
        let right = registry.mapping::<Right>().unwrap();
        let columns: Vec<String> = ["a", "b", "a"].map(String::from).to_vec();

        let plan = plan_columns(&columns, &[left, right]).unwrap();
        assert_eq!(plan[2].unwrap().dest, 0);
    }

    #[test]
    fn test_advances_at_most_one_destination() {
        let registry = registry();
        let left = registry.mapping::<Left>().unwrap();
        let right = registry.mapping::<Right>().unwrap();
        // "b" only exists two destinations ahead.
        let columns: Vec<String> = ["a", "b"].map(String::from).to_vec();

        let err = plan_columns(&columns, &[right, right, left]).unwrap_err();
        assert!(matches!(
            err,
            MappingError::UnmappedColumn { ref column, position: 1 } if column == "b"
        ));
    }

    #[test]
    fn test_trailing_delimiter_without_destination() {
        let registry = registry();
        let left = registry.mapping::<Left>().unwrap();
        let columns: Vec<String> = ["a", ""].map(String::from).to_vec();

        assert!(matches!(
            plan_columns(&columns, &[left]),
            Err(MappingError::UnmappedColumn { position: 1, .. })
        ));
    }

    #[test]
    fn test_decode_two_destinations() {
        let registry = registry();
        let decoder = ResultDecoder::new(&registry).unwrap();
        let mut cursor = MemoryCursor::new(["l.a", "l.b", "", "r.a"])
            .row([
                WireValue::from(1i64),
                WireValue::from("x"),
                WireValue::Null,
                WireValue::from(10i64),
            ])
            .row([
                WireValue::from(2i64),
                WireValue::from("y"),
                WireValue::Null,
                WireValue::from(20i64),
            ]);

        let mut lefts: Vec<Left> = Vec::new();
        let mut rights: Vec<Box<Right>> = Vec::new();
        let rows = decoder
            .decode(&mut cursor, &mut [&mut lefts, &mut rights])
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            lefts,
            vec![
                Left { a: 1, b: "x".into() },
                Left { a: 2, b: "y".into() }
            ]
        );
        assert_eq!(rights.iter().map(|r| r.c).collect::<Vec<_>>(), [10, 20]);
    }

    #[test]
    fn test_failure_keeps_previous_contents() {
        let registry = registry();
        let decoder = ResultDecoder::new(&registry).unwrap();
        let mut cursor = MemoryCursor::new(["a", "b"])
            .row([WireValue::from(1i64), WireValue::from("x")])
            .row([WireValue::from("oops"), WireValue::from("y")]);

        let mut lefts = vec![Left { a: 99, b: "keep".into() }];
        let err = decoder.decode(&mut cursor, &mut [&mut lefts]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldDecode { row: 1, ref column, .. } if column == "a"
        ));
        assert_eq!(lefts, vec![Left { a: 99, b: "keep".into() }]);
    }

    #[test]
    fn test_stage_rejects_foreign_record() {
        let mut lefts = vec![Left { a: 1, b: "x".into() }];
        let mark = lefts.mark();
        let err = lefts.stage(Box::new(Right::default())).unwrap_err();
        assert!(matches!(err, WireError::SlotMismatch { expected: "Left" }));

        let zero = lefts.new_record();
        lefts.stage(zero).unwrap();
        lefts.commit(mark);
        assert_eq!(lefts, vec![Left::default()]);
    }

    #[test]
    fn test_boxed_destination_rolls_back() {
        let registry = registry();
        let decoder = ResultDecoder::new(&registry).unwrap();
        let mut cursor = MemoryCursor::new(["a"])
            .row([WireValue::from(1i64)])
            .row([WireValue::from("oops")]);

        let mut rights: Vec<Box<Right>> = vec![Box::new(Right { c: 7 })];
        assert_eq!(rights.record_type().0, TypeId::of::<Right>());
        assert!(decoder.decode(&mut cursor, &mut [&mut rights]).is_err());
        assert_eq!(rights.len(), 1);
        assert_eq!(rights[0].c, 7);
    }

    #[test]
    fn test_unsealed_registry_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            ResultDecoder::new(&registry),
            Err(MappingError::Unsealed)
        ));
    }
}
