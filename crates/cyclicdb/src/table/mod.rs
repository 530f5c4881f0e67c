//! The table engine: capacity, counters, position arithmetic, the append
//! state machine, and the operations built on top of them.
//!
//! The engine itself (this module) never touches raw storage directly; it
//! delegates byte-level slot access to a [`Backend`] and shares every other
//! piece of logic (state classification, index/position arithmetic, the
//! append machine, iteration) between both concrete backends.

pub mod field;
pub mod file;
mod iter;
pub mod memory;

pub use field::{Field, Schema};
pub use file::FileTable;
pub use iter::Iter;
pub use memory::MemoryTable;

use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::position::{self, Counters, ABSOLUTE_MAX_INDEX, INVALID};
use crate::record::Record;
use crate::value::Value;

/// Construction-time configuration for a table: schema, fixed capacity, and
/// optional time-indexing parameters. There is no other configuration
/// surface.
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: Schema,
    pub record_capacity: u32,
    pub origin: i64,
    pub duration: i64,
}

impl Config {
    /// Time support disabled (`duration == 0`).
    pub fn new(schema: Schema, record_capacity: u32) -> Result<Self, Error> {
        Self::with_time(schema, record_capacity, 0, 0)
    }

    pub fn with_time(
        schema: Schema,
        record_capacity: u32,
        origin: i64,
        duration: i64,
    ) -> Result<Self, Error> {
        if record_capacity == 0 {
            return Err(Error::InvalidArgument(
                "record_capacity cannot be 0".to_string(),
            ));
        }
        if record_capacity == INVALID {
            return Err(Error::InvalidArgument(
                "record_capacity cannot equal the invalid-index sentinel".to_string(),
            ));
        }
        Ok(Config {
            schema,
            record_capacity,
            origin,
            duration,
        })
    }
}

/// Low-level, record_size-addressed slot storage shared by both backends.
/// Everything above this trait (position arithmetic, the append machine,
/// the value codec) is backend-agnostic.
pub(crate) trait Backend {
    fn schema(&self) -> &Arc<Schema>;
    fn capacity(&self) -> u32;
    fn origin(&self) -> i64;
    fn duration(&self) -> i64;

    /// Read exactly `record_size()` bytes (bitmap followed by payload) for
    /// the slot at `pos`.
    fn read_slot(&self, pos: u32, buf: &mut [u8]) -> Result<(), Error>;

    /// Write exactly `record_size()` bytes for the slot at `pos`.
    fn write_slot(&self, pos: u32, buf: &[u8]) -> Result<(), Error>;

    /// Rewrite the on-disk content index. No-op for the memory backend.
    fn persist_content_index(&self, counters: &Counters) -> Result<(), Error>;

    fn record_size(&self) -> usize {
        self.schema().record_size()
    }
}

/// The public table contract. Implemented once, generically, for any
/// `Table<B: Backend>` (the memory and file backends differ only in how
/// they store and retrieve raw slot bytes).
pub trait TableOps {
    fn field_count(&self) -> usize;
    fn field(&self, index: usize) -> Option<&Field>;
    fn field_by_name(&self, name: &str) -> Option<&Field>;
    fn record_capacity(&self) -> u32;
    fn record_count(&self) -> u32;
    fn min_index(&self) -> Option<u32>;
    fn max_index(&self) -> Option<u32>;
    fn record_origin(&self) -> i64;
    fn record_duration(&self) -> i64;

    fn index_for(&self, time: i64) -> Result<u32, Error>;
    fn time_for(&self, index: u32) -> Result<i64, Error>;

    fn new_record(&self) -> Record;
    fn get(&self, index: u32) -> Result<Option<Record>, Error>;
    fn get_by_time(&self, time: i64) -> Result<Option<Record>, Error>;

    fn set(&self, index: u32, record: &Record) -> Result<(), Error>;
    fn update(&self, index: u32, record: &Record) -> Result<(), Error>;
    fn append(&self, index: Option<u32>, record: &Record) -> Result<u32, Error>;
    fn insert(&self, index: u32, record: &Record) -> Result<u32, Error>;
}

/// Shared table engine, generic over its backend.
pub struct Table<B: Backend> {
    backend: B,
    counters: Mutex<Counters>,
}

impl<B: Backend> Table<B> {
    pub(crate) fn new(backend: B, counters: Counters) -> Self {
        Table {
            backend,
            counters: Mutex::new(counters),
        }
    }

    fn schema(&self) -> &Arc<Schema> {
        self.backend.schema()
    }

    /// Encode a record's values into a `record_size()`-byte slot buffer:
    /// the presence bitmap followed by each field's little-endian bytes.
    /// Fields absent from `record` (shorter than the schema, or explicitly
    /// `Value::Null`) are left unset in the bitmap and zeroed in the
    /// payload.
    fn encode(&self, record: &Record) -> Vec<u8> {
        let schema = self.schema();
        let mut buf = vec![0u8; schema.record_size()];
        let bitmap_bytes = schema.bitmap_bytes();
        for field in schema.fields() {
            let value = record.get(field.index() as usize);
            if !value.has_value() {
                continue;
            }
            let byte = field.index() as usize / 8;
            let bit = 1u8 << (field.index() as usize % 8);
            buf[byte] |= bit;
            let start = bitmap_bytes + field.byte_offset();
            let end = start + field.byte_size();
            write_value_le(&mut buf[start..end], field.data_type(), value);
        }
        buf
    }

    /// Decode a `record_size()`-byte slot buffer into an attached record.
    fn decode(&self, buf: &[u8], index: u32) -> Record {
        let schema = self.schema();
        let bitmap_bytes = schema.bitmap_bytes();
        let mut values = Vec::with_capacity(schema.field_count());
        for field in schema.fields() {
            let byte = field.index() as usize / 8;
            let bit = 1u8 << (field.index() as usize % 8);
            let present = buf[byte] & bit != 0;
            if !present {
                values.push(Value::Null);
                continue;
            }
            let start = bitmap_bytes + field.byte_offset();
            let end = start + field.byte_size();
            values.push(read_value_le(&buf[start..end], field.data_type()));
        }
        let time = if self.backend.duration() != 0 {
            Some(self.backend.origin() + i64::from(index) * self.backend.duration())
        } else {
            None
        };
        Record::attached(schema.clone(), index, time, values)
    }

    fn read_record_at(&self, pos: u32, index: u32) -> Result<Record, Error> {
        let mut buf = vec![0u8; self.backend.record_size()];
        self.backend.read_slot(pos, &mut buf)?;
        Ok(self.decode(&buf, index))
    }

    /// Write an all-null (every bit clear) slot, the value stored for
    /// intermediate appended indices.
    fn write_empty_slot(&self, pos: u32) -> Result<(), Error> {
        let buf = vec![0u8; self.backend.record_size()];
        self.backend.write_slot(pos, &buf)
    }

    fn write_record_at(&self, pos: u32, record: &Record) -> Result<(), Error> {
        let buf = self.encode(record);
        self.backend.write_slot(pos, &buf)
    }

    /// One "append empty slot" step of the twelve-state machine, mutating
    /// `counters` and writing an all-null slot at the new `max_position`.
    /// Persisting the content index is the caller's responsibility, done
    /// once after the whole append completes.
    fn append_empty_step(&self, counters: &mut Counters) -> Result<(), Error> {
        position::append_step(counters, self.backend.capacity());
        self.write_empty_slot(counters.max_position)
    }
}

fn write_value_le(dst: &mut [u8], ty: crate::value::DataType, value: Value) {
    use crate::value::DataType as T;
    match ty {
        T::Void => {}
        T::Bool => dst[0] = if value.get::<bool>().unwrap_or(false) { 1 } else { 0 },
        T::I8 => dst[0] = value.get::<i8>().unwrap_or(0) as u8,
        T::U8 => dst[0] = value.get::<u8>().unwrap_or(0),
        T::I16 => dst.copy_from_slice(&value.get::<i16>().unwrap_or(0).to_le_bytes()),
        T::U16 => dst.copy_from_slice(&value.get::<u16>().unwrap_or(0).to_le_bytes()),
        T::I32 => dst.copy_from_slice(&value.get::<i32>().unwrap_or(0).to_le_bytes()),
        T::U32 => dst.copy_from_slice(&value.get::<u32>().unwrap_or(0).to_le_bytes()),
        T::I64 => dst.copy_from_slice(&value.get::<i64>().unwrap_or(0).to_le_bytes()),
        T::U64 => dst.copy_from_slice(&value.get::<u64>().unwrap_or(0).to_le_bytes()),
        T::F32 => dst.copy_from_slice(&value.get::<f32>().unwrap_or(0.0).to_le_bytes()),
        T::F64 => dst.copy_from_slice(&value.get::<f64>().unwrap_or(0.0).to_le_bytes()),
    }
}

fn read_value_le(src: &[u8], ty: crate::value::DataType) -> Value {
    use crate::value::DataType as T;
    match ty {
        T::Void => Value::Null,
        T::Bool => Value::Bool(src[0] != 0),
        T::I8 => Value::I8(src[0] as i8),
        T::U8 => Value::U8(src[0]),
        T::I16 => Value::I16(i16::from_le_bytes(src.try_into().unwrap())),
        T::U16 => Value::U16(u16::from_le_bytes(src.try_into().unwrap())),
        T::I32 => Value::I32(i32::from_le_bytes(src.try_into().unwrap())),
        T::U32 => Value::U32(u32::from_le_bytes(src.try_into().unwrap())),
        T::I64 => Value::I64(i64::from_le_bytes(src.try_into().unwrap())),
        T::U64 => Value::U64(u64::from_le_bytes(src.try_into().unwrap())),
        T::F32 => Value::F32(f32::from_le_bytes(src.try_into().unwrap())),
        T::F64 => Value::F64(f64::from_le_bytes(src.try_into().unwrap())),
    }
}

impl<B: Backend> TableOps for Table<B> {
    fn field_count(&self) -> usize {
        self.schema().field_count()
    }

    fn field(&self, index: usize) -> Option<&Field> {
        self.schema().field_at(index)
    }

    fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.schema().field_by_name(name)
    }

    fn record_capacity(&self) -> u32 {
        self.backend.capacity()
    }

    fn record_count(&self) -> u32 {
        self.counters.lock().unwrap().record_count()
    }

    fn min_index(&self) -> Option<u32> {
        let c = self.counters.lock().unwrap();
        (!c.is_empty()).then_some(c.min_index)
    }

    fn max_index(&self) -> Option<u32> {
        let c = self.counters.lock().unwrap();
        (!c.is_empty()).then_some(c.max_index)
    }

    fn record_origin(&self) -> i64 {
        self.backend.origin()
    }

    fn record_duration(&self) -> i64 {
        self.backend.duration()
    }

    fn index_for(&self, time: i64) -> Result<u32, Error> {
        let duration = self.backend.duration();
        if duration == 0 {
            return Err(Error::TimeNotSupported);
        }
        if time < self.backend.origin() {
            return Err(Error::OutOfRange(
                "time is before the table's origin".to_string(),
            ));
        }
        let index = (time - self.backend.origin()) / duration;
        if index > i64::from(ABSOLUTE_MAX_INDEX) {
            return Err(Error::OutOfRange(
                "time resolves past the absolute maximum index".to_string(),
            ));
        }
        Ok(index as u32)
    }

    fn time_for(&self, index: u32) -> Result<i64, Error> {
        let duration = self.backend.duration();
        if duration == 0 {
            return Err(Error::TimeNotSupported);
        }
        Ok(self.backend.origin() + i64::from(index) * duration)
    }

    fn new_record(&self) -> Record {
        Record::attached_empty(self.schema().clone())
    }

    fn get(&self, index: u32) -> Result<Option<Record>, Error> {
        let counters = self.counters.lock().unwrap();
        let pos = position::index_to_position(&counters, index);
        if pos == INVALID {
            return Ok(None);
        }
        // Held across the slot read: a concurrent append must not be able
        // to evict this index between the lookup and the read.
        Ok(Some(self.read_record_at(pos, index)?))
    }

    fn get_by_time(&self, time: i64) -> Result<Option<Record>, Error> {
        let index = self.index_for(time)?;
        self.get(index)
    }

    fn set(&self, index: u32, record: &Record) -> Result<(), Error> {
        let counters = self.counters.lock().unwrap();
        self.set_locked(&counters, index, record)
    }

    fn update(&self, index: u32, record: &Record) -> Result<(), Error> {
        let counters = self.counters.lock().unwrap();
        self.update_locked(&counters, index, record)
    }

    fn append(&self, index: Option<u32>, record: &Record) -> Result<u32, Error> {
        let mut counters = self.counters.lock().unwrap();
        self.append_locked(&mut counters, index, record)
    }

    fn insert(&self, index: u32, record: &Record) -> Result<u32, Error> {
        let mut counters = self.counters.lock().unwrap();
        if index < counters.min_index {
            return Err(Error::OutOfRange(
                "cannot insert a record before the beginning of the table".to_string(),
            ));
        }
        if !counters.is_empty() && index <= counters.max_index {
            self.set_locked(&counters, index, record)?;
            Ok(index)
        } else {
            self.append_locked(&mut counters, Some(index), record)
        }
    }
}

impl<B: Backend> Table<B> {
    /// Core of `set`, taking an already-locked counters snapshot so
    /// `insert` can call it without re-acquiring the (non-re-entrant)
    /// mutex.
    fn set_locked(&self, counters: &Counters, index: u32, record: &Record) -> Result<(), Error> {
        if index == INVALID {
            return Err(Error::InvalidArgument(
                "index cannot be the invalid-index sentinel".to_string(),
            ));
        }
        if counters.is_empty() {
            return Err(Error::LogicError(
                "cannot set a record on an empty table".to_string(),
            ));
        }
        if index < counters.min_index || index > counters.max_index {
            return Err(Error::OutOfRange(
                "cannot set a record at an out-of-range index".to_string(),
            ));
        }
        let pos = position::index_to_position(counters, index);
        if pos == INVALID {
            return Err(Error::RangeError(
                "in-range index failed to resolve to a position".to_string(),
            ));
        }
        let mut widened = record.clone();
        widened.widen_to(self.field_count());
        self.write_record_at(pos, &widened)
    }

    fn update_locked(&self, counters: &Counters, index: u32, record: &Record) -> Result<(), Error> {
        if index == INVALID {
            return Err(Error::InvalidArgument(
                "index cannot be the invalid-index sentinel".to_string(),
            ));
        }
        if counters.is_empty() {
            return Err(Error::LogicError(
                "cannot update a record on an empty table".to_string(),
            ));
        }
        if index < counters.min_index || index > counters.max_index {
            return Err(Error::OutOfRange(
                "cannot update a record at an out-of-range index".to_string(),
            ));
        }
        let pos = position::index_to_position(counters, index);
        if pos == INVALID {
            return Err(Error::RangeError(
                "in-range index failed to resolve to a position".to_string(),
            ));
        }
        let mut merged = self.read_record_at(pos, index)?;
        for (i, value) in record.values().iter().enumerate() {
            if value.has_value() {
                merged.set(i, *value);
            }
        }
        self.write_record_at(pos, &merged)
    }

    /// Core of `append`: resolve the target index, classify and drive the
    /// state machine once per intermediate slot, then write the caller's
    /// record at the final position.
    ///
    /// Preserves a quirk of the source this is grounded on: because
    /// `ABSOLUTE_MAX_INDEX` and the "unset" sentinel share one value, an
    /// empty table's `max_index` already reads as `ABSOLUTE_MAX_INDEX`, so
    /// appending a non-zero explicit index to an empty table reports
    /// `TableIsFull` rather than filling the gap from zero. Appending with
    /// no explicit index (or index 0) on an empty table is unaffected.
    fn append_locked(
        &self,
        counters: &mut Counters,
        index: Option<u32>,
        record: &Record,
    ) -> Result<u32, Error> {
        let target = match index {
            Some(i) if i != INVALID => i,
            _ => {
                if counters.is_empty() {
                    0
                } else {
                    counters.max_index + 1
                }
            }
        };

        if !counters.is_empty() && target <= counters.max_index {
            return Err(Error::OutOfRange(
                "cannot append a record before the end of the table".to_string(),
            ));
        }
        if counters.is_empty() && target == 0 {
            self.append_empty_step(counters)?;
        } else {
            if counters.max_index == ABSOLUTE_MAX_INDEX {
                return Err(Error::TableIsFull);
            }
            while counters.max_index < target - 1 {
                self.append_empty_step(counters)?;
            }
            self.append_empty_step(counters)?;
        }
        let mut widened = record.clone();
        widened.widen_to(self.field_count());
        self.write_record_at(counters.max_position, &widened)?;
        self.backend.persist_content_index(counters)?;
        Ok(counters.max_index)
    }
}
