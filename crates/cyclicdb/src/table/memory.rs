//! The in-memory backend: a single growable byte buffer holding `capacity`
//! fixed-size slots. No persistence hook.

use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::position::Counters;
use crate::table::field::Schema;

use super::{Backend, Config, Table};

/// `Table<MemoryBackend>`, the in-memory variant of the engine.
pub type MemoryTable = Table<MemoryBackend>;

/// Holds every slot's bytes behind one mutex; `Table`'s own counters mutex
/// already serialises every public operation, so this lock is never
/// contended except by a buggy caller bypassing `TableOps`.
pub struct MemoryBackend {
    schema: Arc<Schema>,
    capacity: u32,
    origin: i64,
    duration: i64,
    slots: Mutex<Vec<u8>>,
}

impl MemoryBackend {
    fn new(schema: Arc<Schema>, capacity: u32, origin: i64, duration: i64) -> Self {
        let record_size = schema.record_size();
        let slots = vec![0u8; record_size * capacity as usize];
        MemoryBackend {
            schema,
            capacity,
            origin,
            duration,
            slots: Mutex::new(slots),
        }
    }
}

impl Backend for MemoryBackend {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn origin(&self) -> i64 {
        self.origin
    }

    fn duration(&self) -> i64 {
        self.duration
    }

    fn read_slot(&self, pos: u32, buf: &mut [u8]) -> Result<(), Error> {
        let record_size = self.schema.record_size();
        let start = pos as usize * record_size;
        let slots = self.slots.lock().unwrap();
        buf.copy_from_slice(&slots[start..start + record_size]);
        Ok(())
    }

    fn write_slot(&self, pos: u32, buf: &[u8]) -> Result<(), Error> {
        let record_size = self.schema.record_size();
        let start = pos as usize * record_size;
        let mut slots = self.slots.lock().unwrap();
        slots[start..start + record_size].copy_from_slice(buf);
        Ok(())
    }

    fn persist_content_index(&self, _counters: &Counters) -> Result<(), Error> {
        Ok(())
    }
}

impl MemoryTable {
    /// Build a fresh, empty in-memory table from `config`.
    pub fn create(config: Config) -> Result<Self, Error> {
        let schema = Arc::new(config.schema);
        let backend = MemoryBackend::new(schema, config.record_capacity, config.origin, config.duration);
        Ok(Table::new(backend, Counters::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::table::TableOps;
    use crate::value::{DataType, Value};

    fn schema() -> Schema {
        Schema::new([
            ("a".to_string(), DataType::I32),
            ("b".to_string(), DataType::F64),
        ])
        .unwrap()
    }

    #[test]
    fn append_and_get_round_trips() {
        let table = MemoryTable::create(Config::new(schema(), 4).unwrap()).unwrap();
        let mut rec = table.new_record();
        rec.set(0, Value::I32(42));
        rec.set(1, Value::F64(1.5));
        let idx = table.append(None, &rec).unwrap();
        assert_eq!(idx, 0);
        let got = table.get(0).unwrap().unwrap();
        assert_eq!(got.get(0), Value::I32(42));
        assert_eq!(got.get(1), Value::F64(1.5));
    }

    #[test]
    fn wraparound_evicts_oldest_record() {
        let table = MemoryTable::create(Config::new(schema(), 3).unwrap()).unwrap();
        for i in 0..5 {
            let mut rec = table.new_record();
            rec.set(0, Value::I32(i));
            table.append(None, &rec).unwrap();
        }
        assert_eq!(table.min_index(), Some(2));
        assert_eq!(table.max_index(), Some(4));
        assert_eq!(table.record_count(), 3);
        assert!(table.get(0).unwrap().is_none());
        assert_eq!(table.get(4).unwrap().unwrap().get(0), Value::I32(4));
    }

    #[test]
    fn set_replaces_and_update_merges() {
        let table = MemoryTable::create(Config::new(schema(), 4).unwrap()).unwrap();
        let mut rec = table.new_record();
        rec.set(0, Value::I32(1));
        rec.set(1, Value::F64(1.0));
        table.append(None, &rec).unwrap();

        let mut replacement = Record::detached(vec![Value::I32(2)]);
        table.set(0, &replacement).unwrap();
        let after_set = table.get(0).unwrap().unwrap();
        assert_eq!(after_set.get(0), Value::I32(2));
        assert_eq!(after_set.get(1), Value::Null);

        replacement.set(1, Value::F64(9.0));
        table.update(0, &replacement).unwrap();
        let after_update = table.get(0).unwrap().unwrap();
        assert_eq!(after_update.get(0), Value::I32(2));
        assert_eq!(after_update.get(1), Value::F64(9.0));
    }

    #[test]
    fn insert_dispatches_to_set_or_append() {
        let table = MemoryTable::create(Config::new(schema(), 4).unwrap()).unwrap();
        let mut rec = table.new_record();
        rec.set(0, Value::I32(1));
        table.append(None, &rec).unwrap();

        let mut other = table.new_record();
        other.set(0, Value::I32(99));
        assert_eq!(table.insert(0, &other).unwrap(), 0);
        assert_eq!(table.get(0).unwrap().unwrap().get(0), Value::I32(99));

        assert_eq!(table.insert(1, &other).unwrap(), 1);
        assert_eq!(table.get(1).unwrap().unwrap().get(0), Value::I32(99));
    }
}
