//! The file backend: a single-file, fixed-layout store implementing the
//! "CYDB 01" wire format.
//!
//! Every integer on disk is little-endian, independent of the host's native
//! byte order. This format does not aim to be portable across architectures
//! that disagree on endianness; the encoding itself is simply pinned
//! regardless of host.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::io::{read_exact_at, write_all_at};
use crate::position::Counters;
use crate::table::field::{Field, Schema};
use crate::value::DataType;

use super::{Backend, Config, Table};

const MAGIC: [u8; 4] = *b"CYDB";
const VERSION: [u8; 2] = *b"01";

const STORAGE_OFFSET: u64 = 8;
const CONTENT_INDEX_OFFSET: u64 = 48;
const CONTENT_INDEX_SIZE: u64 = 32;
const FIELD_DESCRIPTORS_OFFSET: u64 = 80;

/// `Table<FileBackend>`, the single-file variant of the engine.
pub type FileTable = Table<FileBackend>;

pub struct FileBackend {
    file: File,
    schema: Arc<Schema>,
    capacity: u32,
    origin: i64,
    duration: i64,
    header_size: u64,
    record_size: u64,
}

impl Backend for FileBackend {
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
        let offset = self.header_size + pos as u64 * self.record_size;
        read_exact_at(&self.file, buf, offset, "read record slot")
    }

    fn write_slot(&self, pos: u32, buf: &[u8]) -> Result<(), Error> {
        let offset = self.header_size + pos as u64 * self.record_size;
        write_all_at(&self.file, buf, offset, "write record slot")
    }

    fn persist_content_index(&self, counters: &Counters) -> Result<(), Error> {
        let mut buf = [0u8; CONTENT_INDEX_SIZE as usize];
        buf[0..4].copy_from_slice(&counters.first_index.to_le_bytes());
        // 4..8 reserved, left zero.
        buf[8..12].copy_from_slice(&counters.min_index.to_le_bytes());
        buf[12..16].copy_from_slice(&counters.min_position.to_le_bytes());
        buf[16..20].copy_from_slice(&counters.max_index.to_le_bytes());
        buf[20..24].copy_from_slice(&counters.max_position.to_le_bytes());
        write_all_at(&self.file, &buf, CONTENT_INDEX_OFFSET, "write content index")
    }
}

fn field_descriptor_size(field: &Field) -> u64 {
    9 + field.name().len() as u64
}

fn encode_field_descriptor(field: &Field) -> Vec<u8> {
    let name = field.name().as_bytes();
    let mut buf = Vec::with_capacity(9 + name.len());
    buf.extend_from_slice(&field.data_type().code().to_le_bytes());
    buf.extend_from_slice(&(field.byte_size() as u16).to_le_bytes());
    buf.extend_from_slice(&(field.byte_offset() as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // options, unused
    buf.push(name.len() as u8);
    buf.extend_from_slice(name);
    buf
}

impl FileTable {
    /// Create a brand-new file at `path`: writes the full header, then
    /// `capacity` zero-filled record slots, then fsyncs.
    pub fn create<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Error> {
        let schema = Arc::new(config.schema);
        let field_count = schema.field_count();
        let descriptor_bytes: u64 = schema.fields().iter().map(field_descriptor_size).sum();
        let header_size = FIELD_DESCRIPTORS_OFFSET + descriptor_bytes;
        let record_size = schema.record_size() as u64;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::io("create file", e))?;

        let mut header = vec![0u8; header_size as usize];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION);
        header[6..8].copy_from_slice(&0u16.to_le_bytes());

        header[8..12].copy_from_slice(&(header_size as u32).to_le_bytes());
        header[12..16].copy_from_slice(&0u32.to_le_bytes());
        header[16..20].copy_from_slice(&config.record_capacity.to_le_bytes());
        header[20..22].copy_from_slice(&(field_count as u16).to_le_bytes());
        header[22..24].copy_from_slice(&0u16.to_le_bytes());
        header[24..32].copy_from_slice(&config.origin.to_le_bytes());
        header[32..40].copy_from_slice(&config.duration.to_le_bytes());
        header[40..44].copy_from_slice(&(schema.bitmap_bytes() as u32).to_le_bytes());
        header[44..48].copy_from_slice(&(record_size as u32).to_le_bytes());

        // Content index (offset 48..80) left zero: an empty table has every
        // counter at the `INVALID` sentinel, which is `u32::MAX - 1`, not
        // zero, written explicitly below once the backend exists.

        let mut descriptor_offset = FIELD_DESCRIPTORS_OFFSET as usize;
        for field in schema.fields() {
            let encoded = encode_field_descriptor(field);
            header[descriptor_offset..descriptor_offset + encoded.len()].copy_from_slice(&encoded);
            descriptor_offset += encoded.len();
        }

        write_all_at(&file, &header, 0, "write file header")?;

        let empty_slot = vec![0u8; record_size as usize];
        for pos in 0..config.record_capacity {
            let offset = header_size + pos as u64 * record_size;
            write_all_at(&file, &empty_slot, offset, "write empty record slot")?;
        }
        file.sync_all().map_err(|e| Error::io("fsync new file", e))?;

        let backend = FileBackend {
            file,
            schema,
            capacity: config.record_capacity,
            origin: config.origin,
            duration: config.duration,
            header_size,
            record_size,
        };
        let counters = Counters::empty();
        backend.persist_content_index(&counters)?;
        Ok(Table::new(backend, counters))
    }

    /// Open an existing "CYDB 01" file, reconstructing the schema and
    /// counters from its header and trusting the on-disk content index.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::io("open file", e))?;

        let mut header = [0u8; 80];
        read_exact_at(&file, &mut header, 0, "read file header")?;

        if header[0..4] != MAGIC {
            return Err(Error::BadFormat("bad magic".to_string()));
        }
        if header[4..6] != VERSION {
            return Err(Error::BadFormat(format!(
                "unsupported version {:?}",
                &header[4..6]
            )));
        }

        let header_size = u32::from_le_bytes(header[8..12].try_into().unwrap()) as u64;
        let capacity = u32::from_le_bytes(header[16..20].try_into().unwrap());
        let field_count = u16::from_le_bytes(header[20..22].try_into().unwrap()) as usize;
        let origin = i64::from_le_bytes(header[24..32].try_into().unwrap());
        let duration = i64::from_le_bytes(header[32..40].try_into().unwrap());
        let record_size = u32::from_le_bytes(header[44..48].try_into().unwrap()) as u64;

        let first_index = u32::from_le_bytes(header[48..52].try_into().unwrap());
        let min_index = u32::from_le_bytes(header[56..60].try_into().unwrap());
        let min_position = u32::from_le_bytes(header[60..64].try_into().unwrap());
        let max_index = u32::from_le_bytes(header[64..68].try_into().unwrap());
        let max_position = u32::from_le_bytes(header[68..72].try_into().unwrap());

        let descriptor_bytes = header_size - FIELD_DESCRIPTORS_OFFSET;
        let mut descriptors = vec![0u8; descriptor_bytes as usize];
        read_exact_at(
            &file,
            &mut descriptors,
            FIELD_DESCRIPTORS_OFFSET,
            "read field descriptors",
        )?;

        let mut fields = Vec::with_capacity(field_count);
        let mut cursor = 0usize;
        for _ in 0..field_count {
            if cursor + 9 > descriptors.len() {
                return Err(Error::BadFormat("truncated field descriptor".to_string()));
            }
            let type_code = i16::from_le_bytes(descriptors[cursor..cursor + 2].try_into().unwrap());
            let name_len = descriptors[cursor + 8] as usize;
            let name_start = cursor + 9;
            let name_end = name_start + name_len;
            if name_end > descriptors.len() {
                return Err(Error::BadFormat("truncated field name".to_string()));
            }
            let name = String::from_utf8_lossy(&descriptors[name_start..name_end]).into_owned();
            let data_type = DataType::from_code(type_code)
                .ok_or_else(|| Error::BadFormat(format!("unknown type code {type_code}")))?;
            fields.push((name, data_type));
            cursor = name_end;
        }

        let schema = Arc::new(Schema::new(fields)?);
        if schema.record_size() as u64 != record_size {
            return Err(Error::BadFormat(
                "record size does not match schema".to_string(),
            ));
        }

        let backend = FileBackend {
            file,
            schema,
            capacity,
            origin,
            duration,
            header_size,
            record_size,
        };
        let counters = Counters {
            first_index,
            min_index,
            min_position,
            max_index,
            max_position,
        };
        Ok(Table::new(backend, counters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableOps;
    use crate::value::Value;

    fn schema() -> Schema {
        Schema::new([
            ("a".to_string(), DataType::I32),
            ("b".to_string(), DataType::F64),
        ])
        .unwrap()
    }

    #[test]
    #[ntest::timeout(5000)]
    fn create_append_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.cydb");

        {
            let table = FileTable::create(&path, Config::new(schema(), 4).unwrap()).unwrap();
            let mut rec = table.new_record();
            rec.set(0, Value::I32(7));
            rec.set(1, Value::F64(f64::NAN));
            table.append(None, &rec).unwrap();
            let mut rec2 = table.new_record();
            rec2.set(0, Value::I32(8));
            rec2.set(1, Value::F64(f64::INFINITY));
            table.append(None, &rec2).unwrap();
        }

        let reopened = FileTable::open(&path).unwrap();
        assert_eq!(reopened.min_index(), Some(0));
        assert_eq!(reopened.max_index(), Some(1));
        let got0 = reopened.get(0).unwrap().unwrap();
        assert_eq!(got0.get(0), Value::I32(7));
        assert!(matches!(got0.get(1), Value::F64(x) if x.is_nan()));
        let got1 = reopened.get(1).unwrap().unwrap();
        assert_eq!(got1.get(0), Value::I32(8));
        assert_eq!(got1.get(1), Value::F64(f64::INFINITY));
    }

    #[test]
    fn open_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.cydb");
        std::fs::write(&path, vec![0u8; 200]).unwrap();
        assert!(matches!(FileTable::open(&path), Err(Error::BadFormat(_))));
    }

    #[test]
    fn wraparound_persists_content_index_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.cydb");
        {
            let table = FileTable::create(&path, Config::new(schema(), 3).unwrap()).unwrap();
            for i in 0..5 {
                let mut rec = table.new_record();
                rec.set(0, Value::I32(i));
                table.append(None, &rec).unwrap();
            }
        }
        let reopened = FileTable::open(&path).unwrap();
        assert_eq!(reopened.min_index(), Some(2));
        assert_eq!(reopened.max_index(), Some(4));
        assert_eq!(reopened.get(4).unwrap().unwrap().get(0), Value::I32(4));
        assert!(reopened.get(0).unwrap().is_none());
    }
}
