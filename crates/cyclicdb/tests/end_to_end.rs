//! End-to-end table engine scenarios: create/append/reopen, wraparound,
//! gap-filling appends, merge-on-update, out-of-range rejection, and time
//! indexing.

use cyclicdb::table::file::FileTable;
use cyclicdb::table::memory::MemoryTable;
use cyclicdb::table::Config;
use cyclicdb::{DataType, Error, Record, Schema, TableOps, Value};

fn wide_schema() -> Schema {
    Schema::new([
        ("b".to_string(), DataType::Bool),
        ("i8".to_string(), DataType::I8),
        ("u8".to_string(), DataType::U8),
        ("i16".to_string(), DataType::I16),
        ("u16".to_string(), DataType::U16),
        ("i32".to_string(), DataType::I32),
        ("u32".to_string(), DataType::U32),
        ("i64".to_string(), DataType::I64),
        ("u64".to_string(), DataType::U64),
        ("f32".to_string(), DataType::F32),
        ("f64".to_string(), DataType::F64),
    ])
    .unwrap()
}

#[test]
fn create_append_eight_rows_reopen_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eight_rows.cydb");

    {
        let table = FileTable::create(&path, Config::new(wide_schema(), 20).unwrap()).unwrap();
        for i in 0..8u64 {
            let mut rec = table.new_record();
            rec.set(0, Value::Bool(i % 2 == 0));
            rec.set(1, Value::I8(i as i8));
            rec.set(2, Value::U8(i as u8));
            rec.set(3, Value::I16(i as i16));
            rec.set(4, Value::U16(i as u16));
            rec.set(5, Value::I32(i as i32));
            rec.set(6, Value::U32(i as u32));
            rec.set(7, Value::I64(i as i64));
            rec.set(8, Value::U64(i));
            if i == 7 {
                rec.set(9, Value::F32(f32::INFINITY));
                rec.set(10, Value::F64(f64::NAN));
            } else {
                rec.set(9, Value::F32(i as f32));
                rec.set(10, Value::F64(i as f64));
            }
            table.append(None, &rec).unwrap();
        }
    }

    let reopened = FileTable::open(&path).unwrap();
    assert_eq!(reopened.record_count(), 8);
    let last = reopened.get(7).unwrap().unwrap();
    let f32_value = last.get(9).get::<f32>().unwrap();
    assert!(f32_value.is_infinite() && f32_value.is_sign_positive());
    let f64_value = last.get(10).get::<f64>().unwrap();
    assert!(f64_value.is_nan());
}

#[test]
fn wraparound_evicts_down_to_the_newest_capacity_rows() {
    let table = MemoryTable::create(Config::new(wide_schema(), 20).unwrap()).unwrap();
    for i in 0..25u32 {
        let mut rec = table.new_record();
        rec.set(5, Value::I32(i as i32));
        table.append(None, &rec).unwrap();
    }
    assert_eq!(table.min_index(), Some(5));
    assert_eq!(table.max_index(), Some(24));
    assert_eq!(table.record_count(), 20);
}

#[test]
fn insert_at_gap_fills_skipped_indices_as_null() {
    let table = MemoryTable::create(Config::new(wide_schema(), 20).unwrap()).unwrap();
    let mut rec0 = table.new_record();
    rec0.set(5, Value::I32(100));
    table.append(Some(0), &rec0).unwrap();

    let mut rec2 = table.new_record();
    rec2.set(5, Value::I32(102));
    table.append(Some(2), &rec2).unwrap();

    let mut rec3 = table.new_record();
    rec3.set(5, Value::I32(103));
    table.append(None, &rec3).unwrap();

    assert_eq!(table.min_index(), Some(0));
    assert_eq!(table.max_index(), Some(3));
    let gap = table.get(1).unwrap().unwrap();
    assert!(!gap.has(5));
    assert_eq!(table.get(0).unwrap().unwrap().get(5), Value::I32(100));
    assert_eq!(table.get(2).unwrap().unwrap().get(5), Value::I32(102));
    assert_eq!(table.get(3).unwrap().unwrap().get(5), Value::I32(103));
}

#[test]
fn update_merges_non_null_fields_over_existing_record() {
    let table = MemoryTable::create(Config::new(wide_schema(), 25).unwrap()).unwrap();
    for i in 0..23u32 {
        let mut rec = table.new_record();
        rec.set(5, Value::I32(i as i32));
        table.append(None, &rec).unwrap();
    }

    let mut patch = Record::detached(vec![Value::Null; 11]);
    patch.set(1, Value::I8(42));
    patch.set(3, Value::I16(42));
    table.update(22, &patch).unwrap();

    let updated = table.get(22).unwrap().unwrap();
    assert!(updated.has(1));
    assert!(!updated.has(2));
    assert!(updated.has(3));
    assert!(!updated.has(4));
}

#[test]
fn out_of_range_append_fails_and_leaves_state_unchanged() {
    let table = MemoryTable::create(Config::new(wide_schema(), 25).unwrap()).unwrap();
    for i in 0..25u32 {
        let mut rec = table.new_record();
        rec.set(5, Value::I32(i as i32));
        table.append(None, &rec).unwrap();
    }
    assert_eq!(table.max_index(), Some(24));

    let rec = table.new_record();
    let err = table.append(Some(10), &rec).unwrap_err();
    assert!(matches!(err, Error::OutOfRange(_)));
    assert_eq!(table.max_index(), Some(24));
    assert_eq!(table.record_count(), 25);
}

#[test]
fn time_indexing_resolves_both_directions() {
    let table =
        MemoryTable::create(Config::with_time(wide_schema(), 20, 1000, 10).unwrap()).unwrap();

    assert_eq!(table.index_for(1025).unwrap(), 2);
    assert_eq!(table.time_for(3).unwrap(), 1030);
    assert!(matches!(table.index_for(999), Err(Error::OutOfRange(_))));
}
