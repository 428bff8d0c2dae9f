/// Query Result Module
///
/// Lazy, chunked iteration over executed statements. Rows are pulled from
/// the driver in batches so that only one batch is buffered at a time.

use crate::core::{DbError, Result};
use rusqlite::types::Value;
use std::collections::HashMap;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Batch size used when callers have no better idea.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A source of raw rows: result metadata plus fetch-one / fetch-many /
/// fetch-all, in the shape of a driver cursor.
pub trait Fetch {
    /// Column names in result order, or `None` when the last statement
    /// produced no result set.
    fn description(&self) -> Option<Arc<[String]>>;

    /// Next row, or `None` once the result set is exhausted.
    fn fetch_one(&mut self) -> Result<Option<Vec<Value>>>;

    /// Up to `size` rows. An empty batch means the result set is exhausted.
    fn fetch_many(&mut self, size: usize) -> Result<Vec<Vec<Value>>> {
        let mut batch = Vec::with_capacity(size.min(DEFAULT_CHUNK_SIZE));
        while batch.len() < size {
            match self.fetch_one()? {
                Some(values) => batch.push(values),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Every remaining row.
    fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while let Some(values) = self.fetch_one()? {
            rows.push(values);
        }
        Ok(rows)
    }
}

/// One result row: column names paired positionally with values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value for `column`. With duplicate column names the last one wins.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|name| name == column)
            .map(|idx| &self.values[idx])
    }

    /// Every (name, value) pair in column order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Name-to-value map. Duplicate column names collapse, last one wins.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }

    /// Renders the row as a JSON object (same collapsing rule as `into_map`).
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .iter()
            .map(|(name, value)| (name.to_string(), value_to_json(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(t) => serde_json::Value::String(t.clone()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

/// Lazy, forward-only sequence of rows over a [`Fetch`] source.
///
/// Nothing is fetched until the iterator is advanced. Once exhausted it
/// stays exhausted: reading the rows again means executing the statement
/// again. A fetch error or a row whose width does not match the columns is
/// yielded once and ends the sequence.
pub struct RowIter<'a, F: Fetch + ?Sized> {
    source: &'a mut F,
    columns: Arc<[String]>,
    chunk_size: usize,
    batch: std::vec::IntoIter<Vec<Value>>,
    exhausted: bool,
}

/// Iterates the rows of `source`, fetching `chunk_size` rows per driver call.
///
/// - `0` fetches everything in one call
/// - `1` fetches one row per call
/// - anything larger fetches batches of that size
///
/// A source without result metadata yields nothing and is never fetched from.
pub fn result_iter<F: Fetch + ?Sized>(source: &mut F, chunk_size: usize) -> RowIter<'_, F> {
    let columns = source.description();
    let exhausted = columns.is_none();
    RowIter {
        source,
        columns: columns.unwrap_or_else(|| Arc::from(Vec::new())),
        chunk_size,
        batch: Vec::new().into_iter(),
        exhausted,
    }
}

impl<F: Fetch + ?Sized> RowIter<'_, F> {
    /// Column names shared by every row of this sequence.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_batch(&mut self) -> Result<Vec<Vec<Value>>> {
        match self.chunk_size {
            0 => {
                self.exhausted = true;
                self.source.fetch_all()
            }
            1 => Ok(self.source.fetch_one()?.into_iter().collect()),
            size => self.source.fetch_many(size),
        }
    }

    fn pair(&mut self, values: Vec<Value>) -> Result<Row> {
        if values.len() != self.columns.len() {
            self.stop();
            return Err(DbError::RowShapeMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        Ok(Row {
            columns: Arc::clone(&self.columns),
            values,
        })
    }

    fn stop(&mut self) {
        self.exhausted = true;
        self.batch = Vec::new().into_iter();
    }
}

impl<F: Fetch + ?Sized> Iterator for RowIter<'_, F> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(values) = self.batch.next() {
                return Some(self.pair(values));
            }
            if self.exhausted {
                return None;
            }
            match self.fetch_batch() {
                Ok(batch) if batch.is_empty() => {
                    self.exhausted = true;
                    return None;
                }
                Ok(batch) => self.batch = batch.into_iter(),
                Err(err) => {
                    self.stop();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<F: Fetch + ?Sized> FusedIterator for RowIter<'_, F> {}
