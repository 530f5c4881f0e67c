//! The record abstraction: a field-indexed bag of optional values plus an
//! index and an optional time.

use std::sync::Arc;

use crate::error::Error;
use crate::table::field::Schema;
use crate::value::Value;

/// A single row: either *attached* to a table's schema (materialised by a
/// read, or built via `new_record()`) or *detached* (built standalone by a
/// client, e.g. to pass into `set`/`update`/`append`).
///
/// A detached record cannot resolve field-by-name operations
/// ([`Error::DetachedRecord`]) and its `values` vector may be shorter than
/// the eventual schema's field count; it is widened with nulls on first
/// write against a table.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Option<Arc<Schema>>,
    index: u32,
    time: Option<i64>,
    values: Vec<Value>,
}

impl Record {
    /// Build a detached record from explicit values, in schema field order.
    /// `values` may be shorter than the table's eventual field count.
    pub fn detached(values: Vec<Value>) -> Self {
        Record {
            schema: None,
            index: crate::position::INVALID,
            time: None,
            values,
        }
    }

    /// Build an attached, empty record of the schema's exact field count,
    /// as returned by `Table::new_record()`.
    pub fn attached_empty(schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.field_count()];
        Record {
            schema: Some(schema),
            index: crate::position::INVALID,
            time: None,
            values,
        }
    }

    /// Build an attached record populated from storage.
    pub(crate) fn attached(
        schema: Arc<Schema>,
        index: u32,
        time: Option<i64>,
        values: Vec<Value>,
    ) -> Self {
        Record {
            schema: Some(schema),
            index,
            time,
            values,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.schema.is_some()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn time(&self) -> Option<i64> {
        self.time
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    pub(crate) fn set_time(&mut self, time: Option<i64>) {
        self.time = time;
    }

    /// Values in schema field order. May be shorter than the schema's field
    /// count for a freshly-built detached record.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a positional field index, or `Value::Null` if the record is
    /// shorter than the requested index (a detached record built with fewer
    /// fields than the eventual schema).
    pub fn get(&self, field_index: usize) -> Value {
        self.values.get(field_index).copied().unwrap_or(Value::Null)
    }

    pub fn has(&self, field_index: usize) -> bool {
        self.get(field_index).has_value()
    }

    /// Value by field name. Fails with [`Error::DetachedRecord`] if this
    /// record has no schema, or [`Error::UnknownField`] if the name is not
    /// in the schema.
    pub fn get_by_name(&self, name: &str) -> Result<Value, Error> {
        let schema = self.schema.as_ref().ok_or(Error::DetachedRecord)?;
        let field = schema
            .field_by_name(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        Ok(self.get(field.index() as usize))
    }

    /// Set the value at a positional field index, growing the backing
    /// vector with nulls if needed.
    pub fn set(&mut self, field_index: usize, value: Value) {
        if field_index >= self.values.len() {
            self.values.resize(field_index + 1, Value::Null);
        }
        self.values[field_index] = value;
    }

    /// Set a value by field name. Fails with [`Error::DetachedRecord`] if
    /// this record has no schema, or [`Error::UnknownField`] if the name is
    /// not in the schema.
    pub fn set_by_name(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let schema = self.schema.as_ref().ok_or(Error::DetachedRecord)?;
        let field = schema
            .field_by_name(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        self.set(field.index() as usize, value);
        Ok(())
    }

    /// Widen `values` to exactly `field_count` entries, padding with
    /// `Value::Null`. Used when a table accepts a short detached record on
    /// its first write.
    pub(crate) fn widen_to(&mut self, field_count: usize) {
        if self.values.len() < field_count {
            self.values.resize(field_count, Value::Null);
        }
    }

    pub(crate) fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }
}
