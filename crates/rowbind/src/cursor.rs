// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Result cursor abstraction
//!
//! The relational client owns connections, statements and the cursor
//! implementation. The decoder only needs a forward-only cursor that can
//! name its columns and decode one whole row at a time.
//!
//! # Integration
//!
//! ```ignore
//! impl ResultCursor for MyDriverRows {
//!     type Error = MyDriverError;
//!
//!     fn column_names(&self) -> Vec<String> { ... }
//!     fn advance(&mut self) -> Result<bool, MyDriverError> { ... }
//!     fn scan(&mut self, row: &mut [WireValue]) -> Result<(), MyDriverError> { ... }
//! }
//! ```

use crate::wire::WireValue;
use std::collections::VecDeque;
use thiserror::Error;

/// Forward-only result cursor provided by the relational client
pub trait ResultCursor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Column names of the current result set, in select order
    fn column_names(&self) -> Vec<String>;

    /// Move to the next row. `Ok(false)` once rows are exhausted; an error
    /// reports a fetch failure or the cursor's terminal error state.
    fn advance(&mut self) -> Result<bool, Self::Error>;

    /// Decode every column of the current row into `row` in one call.
    fn scan(&mut self, row: &mut [WireValue]) -> Result<(), Self::Error>;
}

/// Errors raised by [`MemoryCursor`]
#[derive(Debug, Error)]
pub enum MemoryCursorError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("row has {actual} values, expected {expected}")]
    Width { expected: usize, actual: usize },

    #[error("no current row")]
    NoRow,
}

/// In-memory result set
///
/// Useful for testing and for feeding already-fetched data through the
/// decoder.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<WireValue>>,
    current: Option<Vec<WireValue>>,
    failure: Option<String>,
}

impl MemoryCursor {
    /// Create an empty result set with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a row
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<WireValue>,
    {
        self.rows
            .push_back(values.into_iter().map(Into::into).collect());
        self
    }

    /// Fail with `message` once the remaining rows are exhausted
    pub fn fail_at_end(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Rows not yet fetched
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl ResultCursor for MemoryCursor {
    type Error = MemoryCursorError;

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn advance(&mut self) -> Result<bool, Self::Error> {
        self.current = self.rows.pop_front();
        if self.current.is_some() {
            return Ok(true);
        }
        match self.failure.take() {
            Some(message) => Err(MemoryCursorError::Fetch(message)),
            None => Ok(false),
        }
    }

    fn scan(&mut self, row: &mut [WireValue]) -> Result<(), Self::Error> {
        let current = self.current.take().ok_or(MemoryCursorError::NoRow)?;
        if current.len() != row.len() {
            return Err(MemoryCursorError::Width {
                expected: row.len(),
                actual: current.len(),
            });
        }
        for (slot, value) in row.iter_mut().zip(current) {
            *slot = value;
        }
        Ok(())
    }
}
