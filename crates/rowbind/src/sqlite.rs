// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite result cursor
//!
//! Adapts a prepared `rusqlite` statement to [`ResultCursor`], so query
//! results decode straight into records.
//!
//! ```ignore
//! let mut stmt = conn.prepare("SELECT id, name FROM users")?;
//! let mut cursor = SqliteCursor::query(&mut stmt, [])?;
//! let mut users: Vec<User> = Vec::new();
//! decoder.decode(&mut cursor, &mut [&mut users])?;
//! ```

use crate::cursor::ResultCursor;
use crate::wire::WireValue;
use rusqlite::types::ValueRef;
use rusqlite::{Params, Row, Rows, Statement};
use thiserror::Error;

/// Errors raised by [`SqliteCursor`]
#[derive(Debug, Error)]
pub enum SqliteCursorError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("column {column:?} holds invalid UTF-8 text: {source}")]
    Utf8 {
        column: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("row has {actual} values, expected {expected}")]
    Width { expected: usize, actual: usize },

    #[error("no current row")]
    NoRow,
}

/// Cursor over the rows of a running SQLite query
pub struct SqliteCursor<'stmt> {
    columns: Vec<String>,
    rows: Rows<'stmt>,
    staged: Option<Result<Vec<WireValue>, SqliteCursorError>>,
}

impl<'stmt> SqliteCursor<'stmt> {
    /// Execute `stmt` with `params` and wrap its rows
    pub fn query<P: Params>(
        stmt: &'stmt mut Statement<'_>,
        params: P,
    ) -> Result<Self, SqliteCursorError> {
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows = stmt.query(params)?;
        Ok(Self {
            columns,
            rows,
            staged: None,
        })
    }

    fn stage(columns: &[String], row: &Row<'_>) -> Result<Vec<WireValue>, SqliteCursorError> {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = match row.get_ref(idx)? {
                ValueRef::Null => WireValue::Null,
                ValueRef::Integer(i) => WireValue::Integer(i),
                ValueRef::Real(f) => WireValue::Real(f),
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|s| WireValue::Text(s.to_string()))
                    .map_err(|source| SqliteCursorError::Utf8 {
                        column: column.clone(),
                        source,
                    })?,
                ValueRef::Blob(bytes) => WireValue::Blob(bytes.to_vec()),
            };
            values.push(value);
        }
        Ok(values)
    }
}

impl ResultCursor for SqliteCursor<'_> {
    type Error = SqliteCursorError;

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn advance(&mut self) -> Result<bool, Self::Error> {
        self.staged = None;
        let Some(row) = self.rows.next()? else {
            return Ok(false);
        };
        // Conversion failures belong to the row, not to the fetch.
        self.staged = Some(Self::stage(&self.columns, row));
        Ok(true)
    }

    fn scan(&mut self, row: &mut [WireValue]) -> Result<(), Self::Error> {
        let values = self.staged.take().ok_or(SqliteCursorError::NoRow)??;
        if values.len() != row.len() {
            return Err(SqliteCursorError::Width {
                expected: row.len(),
                actual: values.len(),
            });
        }
        for (slot, value) in row.iter_mut().zip(values) {
            *slot = value;
        }
        Ok(())
    }
}
