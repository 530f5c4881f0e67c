//! Field definitions and the schema that orders them.

use crate::error::Error;
use crate::value::DataType;

/// A single typed column of a table's schema.
///
/// `byte_size` and `byte_offset` are derived once, at schema construction
/// time, from the field's position and type; they never change for the
/// lifetime of the table since the schema is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    index: u16,
    name: String,
    data_type: DataType,
    byte_size: usize,
    byte_offset: usize,
}

impl Field {
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Size, in bytes, this field occupies in the record payload.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Offset, in bytes, from the start of the record payload (i.e. after
    /// the presence bitmap).
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }
}

/// The ordered, fixed field list of a table.
///
/// A schema is immutable once built: every byte offset it reports is fixed
/// for the lifetime of any table built from it, which is what lets the file
/// backend compute `record_size` once and never revisit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    payload_size: usize,
}

impl Schema {
    /// Build a schema from an ordered `(name, type)` list, deriving byte
    /// size and offset for each field in declaration order.
    ///
    /// Fails with [`Error::InvalidArgument`] if the list is empty, any name
    /// exceeds 255 bytes, or there are more than `u16::MAX` fields.
    pub fn new(fields: impl IntoIterator<Item = (String, DataType)>) -> Result<Self, Error> {
        let mut built = Vec::new();
        let mut offset = 0usize;
        for (i, (name, data_type)) in fields.into_iter().enumerate() {
            if name.len() > 255 {
                return Err(Error::InvalidArgument(format!(
                    "field name '{name}' exceeds 255 bytes"
                )));
            }
            let index = u16::try_from(i).map_err(|_| {
                Error::InvalidArgument("schema has more than 65535 fields".to_string())
            })?;
            let byte_size = data_type.byte_size();
            built.push(Field {
                index,
                name,
                data_type,
                byte_size,
                byte_offset: offset,
            });
            offset += byte_size;
        }
        if built.is_empty() {
            return Err(Error::InvalidArgument("schema has no fields".to_string()));
        }
        Ok(Schema {
            fields: built,
            payload_size: offset,
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_at(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// First field whose name matches, per the "name-based lookups return
    /// the first match" rule.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bytes needed for the per-record presence bitmap: `ceil(field_count / 8)`.
    pub fn bitmap_bytes(&self) -> usize {
        self.field_count().div_ceil(8)
    }

    /// Total size in bytes of a field payload (sum of each field's size,
    /// excluding the presence bitmap).
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Total on-disk/in-memory size of one record slot: bitmap plus payload.
    pub fn record_size(&self) -> usize {
        self.bitmap_bytes() + self.payload_size
    }
}
